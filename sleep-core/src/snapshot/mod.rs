//! Point-in-time view of every fact the scheduler reacts to.
//!
//! A [`Snapshot`] is a plain value; the scheduler keeps exactly two of them in
//! a [`SnapshotPair`] and alternates which slot is "current" every tick.

use core::fmt;

use crate::deployable::{Actuator, DeployState, ExecutionContext, UniversalTime};
use crate::scheduler::WakeTimer;

/// Observable facts captured at a single instant.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Snapshot {
    pub has_actuator: bool,
    pub can_move: bool,
    pub is_editor: bool,
    pub is_flight: bool,
    pub is_sleeping: bool,
    pub is_overdue: bool,
    pub deploy_state: DeployState,
}

impl Snapshot {
    /// Reads the actuator, context, and timer at `now`.
    ///
    /// A missing actuator reads as immobile and [`DeployState::Broken`].
    pub fn capture<A: Actuator>(
        actuator: Option<&A>,
        context: ExecutionContext,
        timer: WakeTimer,
        now: UniversalTime,
    ) -> Self {
        Self {
            has_actuator: actuator.is_some(),
            can_move: actuator.is_some_and(|actuator| actuator.can_move()),
            is_editor: context.is_editor(),
            is_flight: context.is_flight(),
            is_sleeping: timer.is_armed(),
            is_overdue: timer.is_overdue(now),
            deploy_state: actuator.map_or(DeployState::Broken, |actuator| actuator.deploy_state()),
        }
    }

    /// Overdue flag cached at capture time.
    #[must_use]
    pub const fn is_overdue(&self) -> bool {
        self.is_overdue
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "has-actuator={} can-move={} editor={} flight={} sleeping={} overdue={} deploy={}",
            self.has_actuator,
            self.can_move,
            self.is_editor,
            self.is_flight,
            self.is_sleeping,
            self.is_overdue,
            self.deploy_state
        )
    }
}

/// Two snapshot slots with an explicit index for the current one.
#[derive(Copy, Clone, Debug)]
pub struct SnapshotPair {
    slots: [Snapshot; 2],
    current: usize,
}

impl SnapshotPair {
    /// Seeds both slots with the same capture.
    #[must_use]
    pub const fn new(initial: Snapshot) -> Self {
        Self {
            slots: [initial, initial],
            current: 0,
        }
    }

    /// Overwrites the current slot and returns the refreshed value.
    pub fn refresh(&mut self, snapshot: Snapshot) -> Snapshot {
        self.slots[self.current] = snapshot;
        snapshot
    }

    #[must_use]
    pub const fn current(&self) -> &Snapshot {
        &self.slots[self.current]
    }

    #[must_use]
    pub const fn previous(&self) -> &Snapshot {
        &self.slots[self.current ^ 1]
    }

    /// Returns `true` when current and previous disagree on any field.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.current() != self.previous()
    }

    /// Exchanges the current/previous roles.
    pub fn swap(&mut self) {
        self.current ^= 1;
    }
}
