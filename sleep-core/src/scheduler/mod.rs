//! Wake scheduler state machine.
//!
//! [`WakeScheduler`] owns the wake timer and the per-tick snapshot pair. Hosts
//! drive it from their per-frame hook through [`WakeScheduler::tick`] and from
//! user input through [`WakeScheduler::initiate_sleep`].
//!
//! The timer is the only stored state. Everything else (the control flags, the
//! countdown text, the `Awake`/`Asleep` mode) is re-derived from the actuator,
//! the execution context, and the timer whenever an observed fact changes.

use core::fmt;

use log::{debug, error, info, warn};

use crate::controls::{self, ControlSurface, TimerDirective, VisibilityInputs};
use crate::countdown::CountdownDisplay;
use crate::deployable::{
    Actuator, Clock, ContextSource, DeployState, ExecutionContext, UniversalTime,
};
use crate::settings::{PersistedState, SleepMinutes};
use crate::snapshot::{Snapshot, SnapshotPair};
use crate::telemetry::{SleepEventKind, TelemetryRecorder};

/// Log target used by every scheduler message.
pub const LOG_TARGET: &str = "deploy_sleep";

/// Absolute wake deadline; zero means "not sleeping".
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct WakeTimer(UniversalTime);

impl WakeTimer {
    /// Raw value stored while no sleep is armed.
    pub const NOT_SLEEPING: UniversalTime = 0.0;

    #[must_use]
    pub const fn idle() -> Self {
        Self(Self::NOT_SLEEPING)
    }

    /// Arms the timer at `wake_at`. Non-positive or non-finite deadlines
    /// produce an idle timer.
    #[must_use]
    pub fn armed_at(wake_at: UniversalTime) -> Self {
        if wake_at.is_finite() && wake_at > 0.0 {
            Self(wake_at)
        } else {
            Self::idle()
        }
    }

    #[must_use]
    pub fn is_armed(self) -> bool {
        self.0 > 0.0
    }

    /// Deadline of an armed timer.
    #[must_use]
    pub fn deadline(self) -> Option<UniversalTime> {
        self.is_armed().then_some(self.0)
    }

    /// Returns `true` once an armed timer's deadline has been reached.
    #[must_use]
    pub fn is_overdue(self, now: UniversalTime) -> bool {
        self.is_armed() && now >= self.0
    }

    /// Stored value, [`WakeTimer::NOT_SLEEPING`] when idle.
    #[must_use]
    pub const fn wake_time(self) -> UniversalTime {
        self.0
    }
}

/// Derived mode of the machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Mode {
    /// No actuator bound; permanent for the lifetime of the scheduler.
    Disabled,
    Editor,
    Awake,
    Asleep,
    /// Neither editor nor flight; controls are hidden.
    Inactive,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Disabled => "disabled",
            Mode::Editor => "editor",
            Mode::Awake => "awake",
            Mode::Asleep => "asleep",
            Mode::Inactive => "inactive",
        })
    }
}

/// Errors surfaced by [`WakeScheduler::initiate_sleep`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SleepError {
    NoActuator,
}

impl fmt::Display for SleepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SleepError::NoActuator => f.write_str("no actuator bound"),
        }
    }
}

/// Result of a wake attempt.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WakeOutcome {
    /// Timer idle or deadline in the future.
    NotDue,
    Disabled,
    /// Actuator cannot move; the timer stays armed.
    Deferred,
    /// Extend was commanded.
    Extended,
    /// Timer cleared without a command because the actuator was not retracted.
    Skipped(DeployState),
}

/// What a tick did.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TickAction {
    Idle,
    Rederived,
    Wake(WakeOutcome),
}

/// Tick summary handed back to the host.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TickReport {
    pub action: TickAction,
    /// The countdown text moved to a new whole second.
    pub countdown_changed: bool,
}

/// Sleep/wake state machine for one actuator.
pub struct WakeScheduler<A> {
    actuator: Option<A>,
    timer: WakeTimer,
    sleep_minutes: SleepMinutes,
    context: ExecutionContext,
    snapshots: SnapshotPair,
    surface: ControlSurface,
    countdown: CountdownDisplay,
    telemetry: TelemetryRecorder,
    wake_deferred: bool,
}

impl<A> WakeScheduler<A>
where
    A: Actuator,
{
    /// Binds the scheduler to `actuator` and restores persisted state.
    ///
    /// A missing actuator is logged once and leaves the machine disabled with
    /// every control hidden.
    #[must_use]
    pub fn start(
        actuator: Option<A>,
        persisted: PersistedState,
        context: ExecutionContext,
        now: UniversalTime,
    ) -> Self {
        let timer = WakeTimer::armed_at(persisted.wake_time);
        let initial = Snapshot::capture(actuator.as_ref(), context, timer, now);

        let mut scheduler = Self {
            actuator,
            timer,
            sleep_minutes: persisted.sleep_minutes,
            context,
            snapshots: SnapshotPair::new(initial),
            surface: ControlSurface::HIDDEN,
            countdown: CountdownDisplay::new(),
            telemetry: TelemetryRecorder::new(),
            wake_deferred: false,
        };

        if scheduler.actuator.is_none() {
            error!(target: LOG_TARGET, "no actuator bound; sleep controls disabled");
            scheduler
                .telemetry
                .record(SleepEventKind::ActuatorMissing, now);
        } else if let Some(wake_at) = timer.deadline() {
            info!(target: LOG_TARGET, "resuming sleep, wake at {wake_at:.1}");
        }

        scheduler.derive_visibility(now);
        scheduler
    }

    /// Runs one per-frame evaluation.
    ///
    /// An overdue timer triggers a wake attempt; otherwise controls are
    /// re-derived only when some observed fact differs from the last tick.
    pub fn tick(&mut self, now: UniversalTime, context: ExecutionContext) -> TickReport {
        self.context = context;
        let snapshot = self.capture(now);
        self.snapshots.refresh(snapshot);

        let action = if snapshot.is_overdue() {
            TickAction::Wake(self.attempt_wake(now))
        } else if self.snapshots.changed() {
            info!(target: LOG_TARGET, "state changed, updating controls");
            debug!(target: LOG_TARGET, "{snapshot}");
            self.telemetry
                .record(SleepEventKind::ControlsRederived, now);
            self.derive_visibility(now);
            TickAction::Rederived
        } else {
            TickAction::Idle
        };

        self.snapshots.swap();
        let countdown_changed = self.countdown.refresh(self.timer, now).is_some();

        TickReport {
            action,
            countdown_changed,
        }
    }

    /// [`WakeScheduler::tick`] driven by host hooks.
    pub fn poll<C, S>(&mut self, clock: &C, context: &S) -> TickReport
    where
        C: Clock,
        S: ContextSource,
    {
        self.tick(clock.now(), context.current_context())
    }

    /// Arms the timer for the configured duration and commands a retract.
    ///
    /// Returns the absolute wake deadline. The retract is issued regardless of
    /// the current deploy state; the actuator decides what it means.
    ///
    /// # Errors
    ///
    /// [`SleepError::NoActuator`] when the machine is disabled.
    pub fn initiate_sleep(&mut self, now: UniversalTime) -> Result<UniversalTime, SleepError> {
        let Some(actuator) = self.actuator.as_mut() else {
            return Err(SleepError::NoActuator);
        };

        let wake_at = now + self.sleep_minutes.as_seconds();
        info!(
            target: LOG_TARGET,
            "sleeping for {} minutes, wake at {wake_at:.1}",
            self.sleep_minutes
        );
        actuator.retract();
        self.timer = WakeTimer::armed_at(wake_at);
        self.wake_deferred = false;

        self.telemetry
            .record(SleepEventKind::SleepStarted { wake_at }, now);
        self.derive_visibility(now);
        Ok(wake_at)
    }

    /// Wakes the actuator if the deadline has passed.
    ///
    /// An immobile actuator defers the wake and leaves the timer armed; the
    /// attempt repeats on every later tick. Controls are re-derived after
    /// every attempt that reaches the actuator.
    pub fn attempt_wake(&mut self, now: UniversalTime) -> WakeOutcome {
        if !self.timer.is_overdue(now) {
            return WakeOutcome::NotDue;
        }
        let Some(actuator) = self.actuator.as_mut() else {
            return WakeOutcome::Disabled;
        };

        if !actuator.can_move() {
            if !self.wake_deferred {
                warn!(target: LOG_TARGET, "cannot wake, actuator unable to move");
                self.telemetry.record(SleepEventKind::WakeDeferred, now);
                self.wake_deferred = true;
            }
            self.derive_visibility(now);
            return WakeOutcome::Deferred;
        }

        let state = actuator.deploy_state();
        let outcome = if state == DeployState::Retracted {
            info!(target: LOG_TARGET, "waking");
            actuator.extend();
            self.telemetry.record(SleepEventKind::WakeCommanded, now);
            WakeOutcome::Extended
        } else {
            info!(target: LOG_TARGET, "cannot wake, already {state}");
            self.telemetry
                .record(SleepEventKind::WakeSkipped(state), now);
            WakeOutcome::Skipped(state)
        };

        self.clear_timer();
        self.derive_visibility(now);
        outcome
    }

    /// Recomputes control flags and applies the timer policy.
    pub fn derive_visibility(&mut self, now: UniversalTime) -> ControlSurface {
        let visibility = controls::derive_visibility(VisibilityInputs {
            context: self.context,
            deploy_state: self.actuator.as_ref().map(Actuator::deploy_state),
            sleeping: self.timer.is_armed(),
        });

        if let TimerDirective::Clear(reason) = visibility.timer
            && self.timer.is_armed()
        {
            debug!(target: LOG_TARGET, "canceling sleep: {reason}");
            self.telemetry
                .record(SleepEventKind::SleepCanceled(reason), now);
            self.clear_timer();
        }

        self.surface = visibility.surface;
        self.surface
    }

    /// Updates the duration used by the next sleep.
    pub fn set_sleep_minutes(&mut self, minutes: SleepMinutes) {
        debug!(target: LOG_TARGET, "sleep minutes set to {minutes}");
        self.sleep_minutes = minutes;
    }

    #[must_use]
    pub const fn sleep_minutes(&self) -> SleepMinutes {
        self.sleep_minutes
    }

    #[must_use]
    pub const fn timer(&self) -> WakeTimer {
        self.timer
    }

    #[must_use]
    pub fn is_asleep(&self) -> bool {
        self.timer.is_armed()
    }

    /// Derived mode for the current context and timer.
    #[must_use]
    pub fn mode(&self) -> Mode {
        if self.actuator.is_none() {
            return Mode::Disabled;
        }
        match self.context {
            ExecutionContext::Editor => Mode::Editor,
            ExecutionContext::Flight if self.is_asleep() => Mode::Asleep,
            ExecutionContext::Flight => Mode::Awake,
            ExecutionContext::Other => Mode::Inactive,
        }
    }

    /// Control flags from the last derivation.
    #[must_use]
    pub const fn controls(&self) -> ControlSurface {
        self.surface
    }

    /// Countdown text, present only while the countdown control is shown.
    #[must_use]
    pub fn countdown_text(&self) -> Option<&str> {
        (self.surface.countdown && self.is_asleep()).then(|| self.countdown.text())
    }

    #[must_use]
    pub const fn context(&self) -> ExecutionContext {
        self.context
    }

    #[must_use]
    pub const fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }

    #[must_use]
    pub const fn actuator(&self) -> Option<&A> {
        self.actuator.as_ref()
    }

    pub fn actuator_mut(&mut self) -> Option<&mut A> {
        self.actuator.as_mut()
    }

    /// Values to save so a restart resumes where this run left off.
    #[must_use]
    pub const fn persisted(&self) -> PersistedState {
        PersistedState {
            wake_time: self.timer.wake_time(),
            sleep_minutes: self.sleep_minutes,
        }
    }

    fn capture(&self, now: UniversalTime) -> Snapshot {
        Snapshot::capture(self.actuator.as_ref(), self.context, self.timer, now)
    }

    fn clear_timer(&mut self) {
        self.timer = WakeTimer::idle();
        self.wake_deferred = false;
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    struct Stub {
        state: DeployState,
        mobile: bool,
        extends: u32,
        retracts: u32,
    }

    impl Stub {
        fn new(state: DeployState) -> Self {
            Self {
                state,
                mobile: true,
                extends: 0,
                retracts: 0,
            }
        }
    }

    impl Actuator for Stub {
        fn deploy_state(&self) -> DeployState {
            self.state
        }

        fn can_move(&self) -> bool {
            self.mobile
        }

        fn retract(&mut self) {
            self.retracts += 1;
            self.state = DeployState::Retracting;
        }

        fn extend(&mut self) {
            self.extends += 1;
            self.state = DeployState::Extending;
        }
    }

    fn flight(stub: Stub) -> WakeScheduler<Stub> {
        WakeScheduler::start(
            Some(stub),
            PersistedState::fresh(),
            ExecutionContext::Flight,
            0.0,
        )
    }

    #[test]
    fn timer_treats_non_positive_deadlines_as_idle() {
        assert!(!WakeTimer::armed_at(0.0).is_armed());
        assert!(!WakeTimer::armed_at(-3.0).is_armed());
        assert!(!WakeTimer::armed_at(f64::NAN).is_armed());
        assert_eq!(WakeTimer::armed_at(12.0).deadline(), Some(12.0));
    }

    #[test]
    fn overdue_includes_the_exact_deadline() {
        let timer = WakeTimer::armed_at(10.0);
        assert!(!timer.is_overdue(9.99));
        assert!(timer.is_overdue(10.0));
        assert!(!WakeTimer::idle().is_overdue(1_000.0));
    }

    #[test]
    fn sleep_arms_timer_and_retracts() {
        let mut scheduler = flight(Stub::new(DeployState::Extended));
        let wake_at = scheduler.initiate_sleep(100.0).expect("sleep");

        assert_eq!(wake_at, 400.0);
        assert_eq!(scheduler.timer().deadline(), Some(400.0));
        assert_eq!(scheduler.actuator().map(|stub| stub.retracts), Some(1));
        assert_eq!(scheduler.mode(), Mode::Asleep);
    }

    #[test]
    fn sleep_without_actuator_is_rejected() {
        let mut scheduler = WakeScheduler::<Stub>::start(
            None,
            PersistedState::fresh(),
            ExecutionContext::Flight,
            0.0,
        );
        assert_eq!(scheduler.initiate_sleep(0.0), Err(SleepError::NoActuator));
        assert_eq!(scheduler.mode(), Mode::Disabled);
        assert_eq!(scheduler.controls(), ControlSurface::HIDDEN);
    }

    #[test]
    fn wake_before_deadline_does_nothing() {
        let mut scheduler = flight(Stub::new(DeployState::Extended));
        scheduler.initiate_sleep(0.0).expect("sleep");

        assert_eq!(scheduler.attempt_wake(299.0), WakeOutcome::NotDue);
        assert!(scheduler.is_asleep());
    }

    #[test]
    fn deferred_wake_is_reported_once() {
        let mut stub = Stub::new(DeployState::Retracted);
        stub.mobile = false;
        let mut scheduler = WakeScheduler::start(
            Some(stub),
            PersistedState {
                wake_time: 10.0,
                sleep_minutes: SleepMinutes::DEFAULT,
            },
            ExecutionContext::Flight,
            0.0,
        );

        assert_eq!(scheduler.attempt_wake(11.0), WakeOutcome::Deferred);
        assert_eq!(scheduler.attempt_wake(12.0), WakeOutcome::Deferred);
        assert_eq!(
            scheduler
                .telemetry()
                .count(|event| *event == SleepEventKind::WakeDeferred),
            1
        );
        assert!(scheduler.is_asleep());
    }

    #[test]
    fn persisted_state_tracks_timer() {
        let mut scheduler = flight(Stub::new(DeployState::Extended));
        scheduler.set_sleep_minutes(SleepMinutes::new(1.5).expect("valid"));
        scheduler.initiate_sleep(10.0).expect("sleep");

        let persisted = scheduler.persisted();
        assert_eq!(persisted.wake_time, 100.0);
        assert_eq!(persisted.sleep_minutes.minutes(), 1.5);
    }
}
