//! Shared status surface for the console.
//!
//! [`StatusSnapshot`] captures what the `status` command reports and
//! [`StatusFormatter`] renders it, so every front-end prints the same lines.

use core::fmt;

use crate::controls::ControlSurface;
use crate::countdown::{remaining_seconds, write_countdown};
use crate::deployable::{Actuator, DeployState, ExecutionContext, UniversalTime};
use crate::scheduler::{Mode, WakeScheduler};
use crate::settings::SleepMinutes;

/// Values reported by the `status` command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatusSnapshot {
    pub mode: Mode,
    /// Wake deadline of an armed timer.
    pub wake_at: Option<UniversalTime>,
    pub now: UniversalTime,
    /// `None` when no actuator is bound.
    pub deploy_state: Option<DeployState>,
    pub can_move: bool,
    pub context: ExecutionContext,
    pub controls: ControlSurface,
    pub sleep_minutes: SleepMinutes,
}

impl StatusSnapshot {
    /// Captures the scheduler's current state.
    pub fn capture<A: Actuator>(scheduler: &WakeScheduler<A>, now: UniversalTime) -> Self {
        let actuator = scheduler.actuator();
        Self {
            mode: scheduler.mode(),
            wake_at: scheduler.timer().deadline(),
            now,
            deploy_state: actuator.map(Actuator::deploy_state),
            can_move: actuator.is_some_and(Actuator::can_move),
            context: scheduler.context(),
            controls: scheduler.controls(),
            sleep_minutes: scheduler.sleep_minutes(),
        }
    }
}

/// Renders a [`StatusSnapshot`] into human-readable lines.
#[derive(Clone, Copy, Debug)]
pub struct StatusFormatter<'a> {
    snapshot: &'a StatusSnapshot,
}

impl<'a> StatusFormatter<'a> {
    #[must_use]
    pub const fn new(snapshot: &'a StatusSnapshot) -> Self {
        Self { snapshot }
    }

    /// Writes the timer line (e.g. `timer mode=asleep armed=true wake-at=300.0 remaining=4:10`).
    pub fn write_timer_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(writer, "timer mode={}", self.snapshot.mode)?;
        match self.snapshot.wake_at {
            Some(wake_at) => {
                write!(writer, " armed=true wake-at={wake_at:.1} remaining=")?;
                write_countdown(writer, remaining_seconds(wake_at, self.snapshot.now))
            }
            None => writer.write_str(" armed=false wake-at=n/a remaining=n/a"),
        }
    }

    /// Writes the actuator line (e.g. `actuator present=true state=retracted mobile=true context=flight`).
    pub fn write_actuator_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        match self.snapshot.deploy_state {
            Some(state) => write!(writer, "actuator present=true state={state}")?,
            None => writer.write_str("actuator present=false state=n/a")?,
        }
        write!(
            writer,
            " mobile={} context={}",
            self.snapshot.can_move, self.snapshot.context
        )
    }

    /// Writes the controls line (e.g. `controls sleep-button=shown ... countdown=hidden`).
    pub fn write_controls_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let controls = self.snapshot.controls;
        write!(
            writer,
            "controls sleep-button={} sleep-action={} minutes={}({}) countdown={}",
            shown(controls.sleep_button),
            if controls.sleep_action {
                "enabled"
            } else {
                "disabled"
            },
            self.snapshot.sleep_minutes,
            shown(controls.duration_control),
            shown(controls.countdown),
        )
    }
}

const fn shown(visible: bool) -> &'static str {
    if visible { "shown" } else { "hidden" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::String;

    fn snapshot() -> StatusSnapshot {
        StatusSnapshot {
            mode: Mode::Asleep,
            wake_at: Some(300.0),
            now: 49.5,
            deploy_state: Some(DeployState::Retracted),
            can_move: true,
            context: ExecutionContext::Flight,
            controls: ControlSurface {
                sleep_button: false,
                sleep_action: true,
                duration_control: false,
                countdown: true,
            },
            sleep_minutes: SleepMinutes::DEFAULT,
        }
    }

    #[test]
    fn renders_armed_timer() {
        let snapshot = snapshot();
        let mut line = String::<96>::new();
        StatusFormatter::new(&snapshot)
            .write_timer_line(&mut line)
            .expect("fits");
        assert_eq!(
            line.as_str(),
            "timer mode=asleep armed=true wake-at=300.0 remaining=4:11"
        );
    }

    #[test]
    fn renders_missing_actuator() {
        let snapshot = StatusSnapshot {
            mode: Mode::Disabled,
            wake_at: None,
            deploy_state: None,
            can_move: false,
            ..snapshot()
        };
        let formatter = StatusFormatter::new(&snapshot);

        let mut line = String::<96>::new();
        formatter.write_timer_line(&mut line).expect("fits");
        assert_eq!(
            line.as_str(),
            "timer mode=disabled armed=false wake-at=n/a remaining=n/a"
        );

        line.clear();
        formatter.write_actuator_line(&mut line).expect("fits");
        assert_eq!(
            line.as_str(),
            "actuator present=false state=n/a mobile=false context=flight"
        );
    }

    #[test]
    fn renders_control_flags() {
        let snapshot = snapshot();
        let mut line = String::<128>::new();
        StatusFormatter::new(&snapshot)
            .write_controls_line(&mut line)
            .expect("fits");
        assert_eq!(
            line.as_str(),
            "controls sleep-button=hidden sleep-action=enabled minutes=5.0(hidden) countdown=shown"
        );
    }
}
