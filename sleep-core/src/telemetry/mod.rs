//! Transition history recorded by the wake scheduler.
//!
//! Every decision the scheduler takes lands in a fixed-size ring so hosts can
//! show recent activity (the console's `events` command) and tests can assert
//! on what happened without scraping log output.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::controls::CancelReason;
use crate::deployable::{DeployState, UniversalTime};

/// Identifier assigned to each recorded event.
pub type EventId = u32;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 32;

/// Discriminated scheduler events.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SleepEventKind {
    /// Startup found no actuator; the machine is disabled for good.
    ActuatorMissing,
    SleepStarted { wake_at: UniversalTime },
    WakeCommanded,
    /// Timer fired but the actuator needed no command.
    WakeSkipped(DeployState),
    /// Timer fired while the actuator could not move.
    WakeDeferred,
    SleepCanceled(CancelReason),
    ControlsRederived,
}

impl fmt::Display for SleepEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SleepEventKind::ActuatorMissing => f.write_str("actuator-missing"),
            SleepEventKind::SleepStarted { wake_at } => {
                write!(f, "sleep-started wake-at={wake_at:.1}")
            }
            SleepEventKind::WakeCommanded => f.write_str("wake-commanded"),
            SleepEventKind::WakeSkipped(state) => write!(f, "wake-skipped {state}"),
            SleepEventKind::WakeDeferred => f.write_str("wake-deferred"),
            SleepEventKind::SleepCanceled(reason) => write!(f, "sleep-canceled {reason}"),
            SleepEventKind::ControlsRederived => f.write_str("controls-rederived"),
        }
    }
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TelemetryRecord {
    pub id: EventId,
    pub timestamp: UniversalTime,
    pub event: SleepEventKind,
}

/// Records scheduler events into a fixed-size ring buffer.
pub struct TelemetryRecorder<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: HistoryBuf<TelemetryRecord, CAPACITY>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Records an event and returns its identifier.
    pub fn record(&mut self, event: SleepEventKind, timestamp: UniversalTime) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
        });

        id
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    #[must_use]
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    #[must_use]
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    /// Counts retained records matching `predicate`.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&SleepEventKind) -> bool) -> usize {
        self.ring
            .oldest_ordered()
            .filter(|record| predicate(&record.event))
            .count()
    }

    /// Returns the number of records currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no telemetry records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}
