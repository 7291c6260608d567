//! Console command dispatcher.
//!
//! Operator commands go through the same visibility gates the host applies to
//! its on-screen controls: `sleep` only works while the sleep button is shown,
//! `action sleep` while the bindable action is enabled, and `minutes` only
//! while the duration slider is. Everything else (status,
//! help, and the rig commands that drive the simulated surroundings) is handed
//! back to the host as a [`CommandOutcome`] to render or apply.

use core::fmt;

use crate::controls::ControlSurface;
use crate::deployable::{Actuator, ExecutionContext, UniversalTime};
use crate::scheduler::{SleepError, WakeScheduler};
use crate::settings::{SettingError, SleepMinutes};

use super::grammar::{self, Command, RigCommand};

/// Command execution successes.
#[derive(Clone, Debug, PartialEq)]
pub enum CommandOutcome<'a> {
    SleepStarted { wake_at: UniversalTime },
    MinutesSet(SleepMinutes),
    Status,
    Events,
    Help { topic: Option<&'a str> },
    Rig(RigCommand),
}

/// Errors surfaced while executing a command.
#[derive(Clone, Debug, PartialEq)]
pub enum CommandError<'a> {
    Parse(grammar::ParseError<'a>),
    /// The control backing the command is not currently shown.
    Hidden(&'static str),
    /// Bound actions are only assignable, not fired, outside flight.
    NotInFlight,
    Setting(SettingError),
    Sleep(SleepError),
}

impl fmt::Display for CommandError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Parse(error) => error.fmt(f),
            CommandError::Hidden(control) => write!(f, "{control} is not available"),
            CommandError::NotInFlight => f.write_str("actions only fire in flight"),
            CommandError::Setting(error) => error.fmt(f),
            CommandError::Sleep(error) => error.fmt(f),
        }
    }
}

impl<'a> From<grammar::ParseError<'a>> for CommandError<'a> {
    fn from(error: grammar::ParseError<'a>) -> Self {
        Self::Parse(error)
    }
}

impl From<SettingError> for CommandError<'_> {
    fn from(error: SettingError) -> Self {
        Self::Setting(error)
    }
}

impl From<SleepError> for CommandError<'_> {
    fn from(error: SleepError) -> Self {
        Self::Sleep(error)
    }
}

/// Operations the dispatcher needs from the state machine.
pub trait SleepControls {
    fn controls(&self) -> ControlSurface;

    fn context(&self) -> ExecutionContext;

    fn initiate_sleep(&mut self, now: UniversalTime) -> Result<UniversalTime, SleepError>;

    fn set_sleep_minutes(&mut self, minutes: SleepMinutes);
}

impl<A> SleepControls for WakeScheduler<A>
where
    A: Actuator,
{
    fn controls(&self) -> ControlSurface {
        WakeScheduler::controls(self)
    }

    fn context(&self) -> ExecutionContext {
        WakeScheduler::context(self)
    }

    fn initiate_sleep(&mut self, now: UniversalTime) -> Result<UniversalTime, SleepError> {
        WakeScheduler::initiate_sleep(self, now)
    }

    fn set_sleep_minutes(&mut self, minutes: SleepMinutes) {
        WakeScheduler::set_sleep_minutes(self, minutes);
    }
}

/// Dispatches console commands into a [`SleepControls`] implementation.
pub struct CommandExecutor<S> {
    machine: S,
}

impl<S> CommandExecutor<S> {
    pub const fn new(machine: S) -> Self {
        Self { machine }
    }

    pub fn machine(&self) -> &S {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut S {
        &mut self.machine
    }

    pub fn into_inner(self) -> S {
        self.machine
    }
}

impl<S> CommandExecutor<S>
where
    S: SleepControls,
{
    /// Parses and executes a console command.
    ///
    /// # Errors
    ///
    /// Parse failures, hidden controls, and rejected values are returned
    /// without touching the state machine.
    pub fn execute<'a>(
        &mut self,
        line: &'a str,
        now: UniversalTime,
    ) -> Result<CommandOutcome<'a>, CommandError<'a>> {
        let command = grammar::parse(line)?;
        self.dispatch(command, now)
    }

    fn dispatch<'a>(
        &mut self,
        command: Command<'a>,
        now: UniversalTime,
    ) -> Result<CommandOutcome<'a>, CommandError<'a>> {
        match command {
            Command::Sleep => {
                if !self.machine.controls().sleep_button {
                    return Err(CommandError::Hidden("sleep button"));
                }
                let wake_at = self.machine.initiate_sleep(now)?;
                Ok(CommandOutcome::SleepStarted { wake_at })
            }
            Command::SleepAction => {
                if !self.machine.controls().sleep_action {
                    return Err(CommandError::Hidden("sleep action"));
                }
                if self.machine.context() != ExecutionContext::Flight {
                    return Err(CommandError::NotInFlight);
                }
                let wake_at = self.machine.initiate_sleep(now)?;
                Ok(CommandOutcome::SleepStarted { wake_at })
            }
            Command::Minutes(value) => {
                if !self.machine.controls().duration_control {
                    return Err(CommandError::Hidden("sleep duration"));
                }
                let minutes = SleepMinutes::new(value)?;
                self.machine.set_sleep_minutes(minutes);
                Ok(CommandOutcome::MinutesSet(minutes))
            }
            Command::Status => Ok(CommandOutcome::Status),
            Command::Events => Ok(CommandOutcome::Events),
            Command::Help(help) => Ok(CommandOutcome::Help { topic: help.topic }),
            Command::Rig(rig) => Ok(CommandOutcome::Rig(rig)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MockControls {
        surface: ControlSurface,
        editor: bool,
        minutes: Option<SleepMinutes>,
        sleeps: u32,
    }

    impl SleepControls for MockControls {
        fn controls(&self) -> ControlSurface {
            self.surface
        }

        fn context(&self) -> ExecutionContext {
            if self.editor {
                ExecutionContext::Editor
            } else {
                ExecutionContext::Flight
            }
        }

        fn initiate_sleep(&mut self, now: UniversalTime) -> Result<UniversalTime, SleepError> {
            self.sleeps += 1;
            Ok(now + 60.0)
        }

        fn set_sleep_minutes(&mut self, minutes: SleepMinutes) {
            self.minutes = Some(minutes);
        }
    }

    fn awake() -> CommandExecutor<MockControls> {
        CommandExecutor::new(MockControls {
            surface: ControlSurface {
                sleep_button: true,
                sleep_action: true,
                duration_control: true,
                countdown: false,
            },
            ..MockControls::default()
        })
    }

    #[test]
    fn sleep_requires_visible_button() {
        let mut executor = CommandExecutor::new(MockControls::default());
        assert_eq!(
            executor.execute("sleep", 0.0),
            Err(CommandError::Hidden("sleep button"))
        );
        assert_eq!(executor.machine().sleeps, 0);

        let mut executor = awake();
        assert_eq!(
            executor.execute("sleep", 10.0),
            Ok(CommandOutcome::SleepStarted { wake_at: 70.0 })
        );
        assert_eq!(executor.machine().sleeps, 1);
    }

    #[test]
    fn sleep_action_follows_its_own_flag() {
        let mut executor = CommandExecutor::new(MockControls {
            surface: ControlSurface {
                sleep_action: true,
                ..ControlSurface::HIDDEN
            },
            ..MockControls::default()
        });
        assert_eq!(
            executor.execute("sleep", 0.0),
            Err(CommandError::Hidden("sleep button"))
        );
        assert_eq!(
            executor.execute("action sleep", 5.0),
            Ok(CommandOutcome::SleepStarted { wake_at: 65.0 })
        );
        assert_eq!(executor.machine().sleeps, 1);

        let mut executor = CommandExecutor::new(MockControls::default());
        assert_eq!(
            executor.execute("action sleep", 0.0),
            Err(CommandError::Hidden("sleep action"))
        );
        assert_eq!(executor.machine().sleeps, 0);

        let mut executor = CommandExecutor::new(MockControls {
            surface: ControlSurface {
                sleep_action: true,
                ..ControlSurface::HIDDEN
            },
            editor: true,
            ..MockControls::default()
        });
        assert_eq!(
            executor.execute("action sleep", 0.0),
            Err(CommandError::NotInFlight)
        );
        assert_eq!(executor.machine().sleeps, 0);
    }

    #[test]
    fn minutes_are_validated_before_applying() {
        let mut executor = awake();
        assert!(matches!(
            executor.execute("minutes 0.7", 0.0),
            Err(CommandError::Setting(SettingError::OffStep(_)))
        ));
        assert!(executor.machine().minutes.is_none());

        let outcome = executor.execute("minutes 7.5", 0.0).expect("valid minutes");
        let expected = SleepMinutes::new(7.5).expect("valid");
        assert_eq!(outcome, CommandOutcome::MinutesSet(expected));
        assert_eq!(executor.machine().minutes, Some(expected));
    }

    #[test]
    fn minutes_require_visible_slider() {
        let mut executor = CommandExecutor::new(MockControls::default());
        assert_eq!(
            executor.execute("minutes 2", 0.0),
            Err(CommandError::Hidden("sleep duration"))
        );
    }

    #[test]
    fn host_commands_pass_through() {
        let mut executor = CommandExecutor::new(MockControls::default());
        assert_eq!(executor.execute("status", 0.0), Ok(CommandOutcome::Status));
        assert_eq!(
            executor.execute("help sleep", 0.0),
            Ok(CommandOutcome::Help {
                topic: Some("sleep")
            })
        );
        assert_eq!(
            executor.execute("break", 0.0),
            Ok(CommandOutcome::Rig(RigCommand::Break))
        );
    }

    #[test]
    fn parse_errors_are_wrapped() {
        let mut executor = awake();
        assert!(matches!(
            executor.execute("sleep 5", 0.0),
            Err(CommandError::Parse(_))
        ));
        assert_eq!(executor.machine().sleeps, 0);
    }
}
