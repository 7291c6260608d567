use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use sleep_core::repl::catalog::{self, Audience, CommandSpec};
use sleep_core::repl::commands::{CommandError, CommandExecutor, CommandOutcome};
use sleep_core::repl::grammar::RigCommand;
use sleep_core::repl::status::{StatusFormatter, StatusSnapshot};
use sleep_core::deployable::FixedClock;
use sleep_core::{
    Actuator, ExecutionContext, PersistedState, TickAction, UniversalTime, WakeOutcome,
    WakeScheduler,
};
use tracing::{debug, info};

use crate::actuator::SimActuator;

/// Simulated time covered by one scheduler tick during `advance`.
const TICK_SECONDS: f64 = 1.0;

pub struct Session {
    executor: CommandExecutor<WakeScheduler<SimActuator>>,
    now: UniversalTime,
    context: ExecutionContext,
    transcript: Option<TranscriptLogger>,
    wake_deferred: bool,
}

impl Session {
    pub fn new(
        actuator: Option<SimActuator>,
        persisted: PersistedState,
        context: ExecutionContext,
        now: UniversalTime,
        transcript: Option<TranscriptLogger>,
    ) -> Self {
        let scheduler = WakeScheduler::start(actuator, persisted, context, now);
        Self {
            executor: CommandExecutor::new(scheduler),
            now,
            context,
            transcript,
            wake_deferred: false,
        }
    }

    pub fn now(&self) -> UniversalTime {
        self.now
    }

    pub fn persisted(&self) -> PersistedState {
        self.executor.machine().persisted()
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        self.record(TranscriptRole::Host, &[trimmed.to_string()])?;

        let now = self.now;
        let mut lines = Vec::new();
        match self.executor.execute(trimmed, now) {
            Ok(CommandOutcome::SleepStarted { wake_at }) => {
                lines.push(format!("OK sleep wake-at={wake_at:.1}"));
                self.tick(0.0, &mut lines);
            }
            Ok(CommandOutcome::MinutesSet(minutes)) => {
                lines.push(format!("OK minutes {minutes}"));
            }
            Ok(CommandOutcome::Status) => self.status(&mut lines),
            Ok(CommandOutcome::Events) => self.events(&mut lines),
            Ok(CommandOutcome::Help { topic }) => help(topic, &mut lines),
            Ok(CommandOutcome::Rig(command)) => self.rig(command, &mut lines),
            Err(CommandError::Parse(err)) => lines.push(format!("ERR syntax {err}")),
            Err(err) => lines.push(format!("ERR {err}")),
        }

        self.record(TranscriptRole::Emulator, &lines)?;
        Ok(lines)
    }

    fn rig(&mut self, command: RigCommand, lines: &mut Vec<String>) {
        match command {
            RigCommand::Advance(duration) => {
                self.advance(duration, lines);
                lines.push(format!("OK clock={:.1}", self.now));
                return;
            }
            RigCommand::Context(context) => {
                self.context = context;
                lines.push(format!("OK context {context}"));
            }
            RigCommand::Extend | RigCommand::Retract => {
                let Some(actuator) = self.executor.machine_mut().actuator_mut() else {
                    lines.push("ERR no actuator bound".to_string());
                    return;
                };
                if command == RigCommand::Extend {
                    actuator.extend();
                } else {
                    actuator.retract();
                }
                lines.push(format!("OK actuator {}", actuator.deploy_state()));
            }
            RigCommand::Mobility(mobile) => {
                let Some(actuator) = self.executor.machine_mut().actuator_mut() else {
                    lines.push("ERR no actuator bound".to_string());
                    return;
                };
                actuator.set_mobile(mobile);
                lines.push(format!("OK mobile={mobile}"));
            }
            RigCommand::Break => {
                let Some(actuator) = self.executor.machine_mut().actuator_mut() else {
                    lines.push("ERR no actuator bound".to_string());
                    return;
                };
                actuator.break_down();
                lines.push("OK actuator broken".to_string());
            }
            RigCommand::Repair => {
                let Some(actuator) = self.executor.machine_mut().actuator_mut() else {
                    lines.push("ERR no actuator bound".to_string());
                    return;
                };
                if actuator.repair() {
                    lines.push("OK actuator retracted".to_string());
                } else {
                    lines.push("ERR actuator is not broken".to_string());
                    return;
                }
            }
        }

        self.tick(0.0, lines);
    }

    /// Moves the clock forward in whole-second ticks plus any remainder.
    ///
    /// Once no later tick can change anything, the rest of the span is
    /// covered by a single tick.
    fn advance(&mut self, duration: Duration, lines: &mut Vec<String>) {
        let mut left = duration.as_secs_f64();
        debug!(seconds = left, from = self.now, "advancing clock");
        while left > 0.0 {
            let step = if self.is_quiescent() {
                left
            } else {
                left.min(TICK_SECONDS)
            };
            left -= step;
            self.tick(step, lines);
        }
    }

    /// No transit is running and the timer is either idle or waiting on an
    /// actuator that cannot move.
    fn is_quiescent(&self) -> bool {
        let scheduler = self.executor.machine();
        let actuator = scheduler.actuator();
        if actuator.is_some_and(SimActuator::is_moving) {
            return false;
        }
        let stuck = scheduler.timer().is_overdue(self.now)
            && !actuator.is_some_and(Actuator::can_move);
        !scheduler.is_asleep() || stuck
    }

    fn tick(&mut self, step: f64, lines: &mut Vec<String>) {
        self.now += step;
        let settled = self
            .executor
            .machine_mut()
            .actuator_mut()
            .and_then(|actuator| actuator.advance(step));
        if let Some(state) = settled {
            lines.push(format!("t={:.1} actuator {state}", self.now));
        }

        let scheduler = self.executor.machine_mut();
        let report = scheduler.poll(&FixedClock(self.now), &self.context);
        let deferred = report.action == TickAction::Wake(WakeOutcome::Deferred);

        match report.action {
            TickAction::Wake(WakeOutcome::Extended) => {
                lines.push(format!("t={:.1} wake: extending", self.now));
            }
            TickAction::Wake(WakeOutcome::Skipped(state)) => {
                lines.push(format!("t={:.1} wake: skipped, actuator {state}", self.now));
            }
            TickAction::Wake(WakeOutcome::Deferred) if !self.wake_deferred => {
                lines.push(format!("t={:.1} wake: deferred, actuator cannot move", self.now));
            }
            TickAction::Rederived => {
                let snapshot = StatusSnapshot::capture(scheduler, self.now);
                let mut line = format!("t={:.1} ", self.now);
                let _ = StatusFormatter::new(&snapshot).write_controls_line(&mut line);
                lines.push(line);
            }
            _ => {}
        }
        self.wake_deferred = deferred;

        if report.countdown_changed
            && let Some(text) = scheduler.countdown_text()
        {
            lines.push(format!("wake in {text}"));
        }
    }

    fn status(&self, lines: &mut Vec<String>) {
        let snapshot = StatusSnapshot::capture(self.executor.machine(), self.now);
        let formatter = StatusFormatter::new(&snapshot);
        let mut timer = String::new();
        let mut actuator = String::new();
        let mut controls = String::new();
        // Formatting into a `String` cannot fail.
        let _ = formatter.write_timer_line(&mut timer);
        let _ = formatter.write_actuator_line(&mut actuator);
        let _ = formatter.write_controls_line(&mut controls);
        lines.extend([timer, actuator, controls]);
    }

    fn events(&self, lines: &mut Vec<String>) {
        let telemetry = self.executor.machine().telemetry();
        if telemetry.is_empty() {
            lines.push("no events recorded".to_string());
            return;
        }
        for record in telemetry.oldest_first() {
            lines.push(format!(
                "#{} t={:.1} {}",
                record.id, record.timestamp, record.event
            ));
        }
    }

    fn record(&mut self, role: TranscriptRole, lines: &[String]) -> io::Result<()> {
        if let Some(transcript) = self.transcript.as_mut() {
            for line in lines {
                transcript.append_line(self.now, role, line)?;
            }
        }
        Ok(())
    }
}

fn help(topic: Option<&str>, lines: &mut Vec<String>) {
    match topic {
        Some(name) => match catalog::find(name) {
            Some(spec) => lines.push(describe(spec)),
            None => {
                lines.push(format!("No help available for `{name}`."));
                let mut names = String::new();
                for (index, spec) in catalog::commands().iter().enumerate() {
                    if index > 0 {
                        names.push_str(", ");
                    }
                    names.push_str(spec.name);
                }
                lines.push(format!("Available topics: {names}"));
            }
        },
        None => {
            for (heading, audience) in [("Commands:", Audience::Operator), ("Rig:", Audience::Rig)]
            {
                lines.push(heading.to_string());
                for spec in catalog::commands()
                    .iter()
                    .filter(|spec| spec.audience == audience)
                {
                    lines.push(format!("  {}", describe(spec)));
                }
            }
            lines.push("Type `help <command>` for a specific command.".to_string());
        }
    }
}

fn describe(spec: &CommandSpec) -> String {
    format!("{:<30} - {}", spec.usage, spec.summary)
}

/// Appends the console exchange to a file, stamped with the virtual clock.
pub struct TranscriptLogger {
    writer: BufWriter<File>,
}

impl TranscriptLogger {
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        info!(path = %path.display(), "recording transcript");

        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        writeln!(logger.writer, "# Deploy sleep emulator transcript")?;
        writeln!(logger.writer, "# Timestamps are virtual clock seconds")?;
        writeln!(logger.writer)?;
        logger.writer.flush()?;
        Ok(logger)
    }

    fn append_line(
        &mut self,
        now: UniversalTime,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(self.writer, "[{now:>8.1} s] {} {line}", role.prefix())?;
        self.writer.flush()
    }
}

#[derive(Clone, Copy)]
enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use sleep_core::DeployState;

    fn session(transit: f64) -> Session {
        Session::new(
            Some(SimActuator::new(DeployState::Extended, transit)),
            PersistedState::fresh(),
            ExecutionContext::Flight,
            0.0,
            None,
        )
    }

    fn run(session: &mut Session, line: &str) -> Vec<String> {
        session.handle_command(line).expect("in-memory session")
    }

    #[test]
    fn sleep_cycle_prints_countdown_and_wakes() {
        let mut session = session(2.0);
        assert_eq!(run(&mut session, "minutes 1")[0], "OK minutes 1.0");

        let lines = run(&mut session, "sleep");
        assert_eq!(lines[0], "OK sleep wake-at=60.0");

        let lines = run(&mut session, "advance 30s");
        assert!(lines.iter().any(|line| line == "t=2.0 actuator retracted"));
        assert!(lines.iter().any(|line| line == "wake in 0:30"));

        let lines = run(&mut session, "advance 30s");
        assert!(lines.iter().any(|line| line == "t=60.0 wake: extending"));
        assert_eq!(session.persisted().wake_time, 0.0);
    }

    #[test]
    fn deferred_wake_is_printed_once() {
        let mut session = session(0.0);
        run(&mut session, "minutes 0.5");
        run(&mut session, "sleep");
        run(&mut session, "mobile off");

        let lines = run(&mut session, "advance 35s");
        let deferred = lines
            .iter()
            .filter(|line| line.contains("wake: deferred"))
            .count();
        assert_eq!(deferred, 1);
        assert!(session.persisted().wake_time > 0.0);

        run(&mut session, "mobile on");
        assert_eq!(session.persisted().wake_time, 0.0);
    }

    #[test]
    fn long_advance_finishes_with_bounded_output() {
        let mut session = session(2.0);
        let lines = run(&mut session, "advance 99999999m");
        assert_eq!(lines, vec!["OK clock=5999999940.0".to_string()]);

        run(&mut session, "sleep");
        let lines = run(&mut session, "advance 99999999m");
        assert!(lines.len() < 320, "{} lines", lines.len());
        assert!(lines.iter().any(|line| line.ends_with("wake: extending")));
        assert_eq!(lines.last().map(String::as_str), Some("OK clock=11999999880.0"));
    }

    #[test]
    fn deferred_wake_does_not_step_every_second() {
        let mut session = session(0.0);
        run(&mut session, "minutes 0.5");
        run(&mut session, "sleep");
        run(&mut session, "mobile off");

        let lines = run(&mut session, "advance 99999999m");
        assert!(lines.len() < 40, "{} lines", lines.len());
        assert!(session.persisted().wake_time > 0.0);
    }

    #[test]
    fn hidden_controls_are_rejected() {
        let mut session = session(0.0);
        run(&mut session, "context other");
        assert_eq!(
            run(&mut session, "sleep"),
            vec!["ERR sleep button is not available".to_string()]
        );
    }

    #[test]
    fn status_renders_three_lines() {
        let mut session = session(0.0);
        let lines = run(&mut session, "status");
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timer mode=awake armed=false"));
        assert!(lines[1].starts_with("actuator present=true state=extended"));
        assert!(lines[2].starts_with("controls sleep-button=shown"));
    }

    #[test]
    fn help_lists_both_audiences() {
        let mut session = session(0.0);
        let lines = run(&mut session, "help");
        assert!(lines.contains(&"Commands:".to_string()));
        assert!(lines.contains(&"Rig:".to_string()));
        assert!(run(&mut session, "help warp")[0].contains("No help"));
    }
}
