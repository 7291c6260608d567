use heapless::String;
use sleep_core::repl::commands::{CommandError, CommandExecutor, CommandOutcome};
use sleep_core::repl::grammar::RigCommand;
use sleep_core::repl::status::{StatusFormatter, StatusSnapshot};
use sleep_core::settings::SettingError;
use sleep_core::{Actuator, DeployState, ExecutionContext, PersistedState, WakeScheduler};

struct Arm {
    state: DeployState,
    retracts: u32,
}

impl Actuator for Arm {
    fn deploy_state(&self) -> DeployState {
        self.state
    }

    fn can_move(&self) -> bool {
        true
    }

    fn retract(&mut self) {
        self.retracts += 1;
        self.state = DeployState::Retracting;
    }

    fn extend(&mut self) {
        self.state = DeployState::Extending;
    }
}

fn executor(state: DeployState) -> CommandExecutor<WakeScheduler<Arm>> {
    CommandExecutor::new(WakeScheduler::start(
        Some(Arm { state, retracts: 0 }),
        PersistedState::fresh(),
        ExecutionContext::Flight,
        0.0,
    ))
}

#[test]
fn console_sleep_uses_configured_minutes() {
    let mut executor = executor(DeployState::Extended);

    executor.execute("minutes 2", 0.0).expect("minutes accepted");
    let outcome = executor.execute("SLEEP", 10.0).expect("sleep accepted");
    assert_eq!(outcome, CommandOutcome::SleepStarted { wake_at: 130.0 });

    let scheduler = executor.machine();
    assert!(scheduler.is_asleep());
    assert_eq!(scheduler.actuator().map(|arm| arm.retracts), Some(1));
}

#[test]
fn console_respects_hidden_controls() {
    let mut executor = executor(DeployState::Extended);
    executor.execute("sleep", 0.0).expect("first sleep");

    assert_eq!(
        executor.execute("sleep", 1.0),
        Err(CommandError::Hidden("sleep button"))
    );
    assert_eq!(
        executor.execute("minutes 3", 1.0),
        Err(CommandError::Hidden("sleep duration"))
    );

    let mut retracted = executor(DeployState::Retracted);
    assert_eq!(
        retracted.execute("sleep", 0.0),
        Err(CommandError::Hidden("sleep button"))
    );
}

#[test]
fn sleep_action_works_while_the_button_is_hidden() {
    let mut executor = executor(DeployState::Retracted);
    let controls = executor.machine().controls();
    assert!(controls.sleep_action);
    assert!(!controls.sleep_button);

    let outcome = executor.execute("action sleep", 20.0).expect("action enabled");
    assert_eq!(outcome, CommandOutcome::SleepStarted { wake_at: 320.0 });
    let scheduler = executor.machine();
    assert!(scheduler.is_asleep());
    assert!(scheduler.controls().countdown);
    assert_eq!(scheduler.actuator().map(|arm| arm.retracts), Some(1));
}

fn executor_in(context: ExecutionContext) -> CommandExecutor<WakeScheduler<Arm>> {
    CommandExecutor::new(WakeScheduler::start(
        Some(Arm {
            state: DeployState::Extended,
            retracts: 0,
        }),
        PersistedState::fresh(),
        context,
        0.0,
    ))
}

#[test]
fn sleep_action_only_fires_in_flight() {
    let mut other = executor_in(ExecutionContext::Other);
    assert_eq!(
        other.execute("action sleep", 0.0),
        Err(CommandError::Hidden("sleep action"))
    );

    let mut editor = executor_in(ExecutionContext::Editor);
    assert!(editor.machine().controls().sleep_action);
    assert_eq!(
        editor.execute("action sleep", 0.0),
        Err(CommandError::NotInFlight)
    );
    assert!(!editor.machine().is_asleep());
    assert_eq!(editor.machine().actuator().map(|arm| arm.retracts), Some(0));
}

#[test]
fn console_rejects_out_of_range_minutes() {
    let mut executor = executor(DeployState::Extended);
    assert!(matches!(
        executor.execute("minutes 25", 0.0),
        Err(CommandError::Setting(SettingError::OutOfRange(_)))
    ));
    assert_eq!(
        executor.machine().sleep_minutes(),
        sleep_core::SleepMinutes::DEFAULT
    );
}

#[test]
fn rig_commands_are_returned_to_the_host() {
    let mut executor = executor(DeployState::Extended);
    assert_eq!(
        executor.execute("context editor", 0.0),
        Ok(CommandOutcome::Rig(RigCommand::Context(ExecutionContext::Editor)))
    );
    assert_eq!(executor.machine().context(), ExecutionContext::Flight);
}

#[test]
fn status_reflects_a_sleeping_machine() {
    let mut executor = executor(DeployState::Extended);
    executor.execute("sleep", 0.0).expect("sleep");

    let snapshot = StatusSnapshot::capture(executor.machine(), 60.0);
    let formatter = StatusFormatter::new(&snapshot);
    let mut line = String::<128>::new();

    formatter.write_timer_line(&mut line).expect("fits");
    assert_eq!(
        line.as_str(),
        "timer mode=asleep armed=true wake-at=300.0 remaining=4:00"
    );

    line.clear();
    formatter.write_actuator_line(&mut line).expect("fits");
    assert_eq!(
        line.as_str(),
        "actuator present=true state=retracting mobile=true context=flight"
    );

    line.clear();
    formatter.write_controls_line(&mut line).expect("fits");
    assert_eq!(
        line.as_str(),
        "controls sleep-button=hidden sleep-action=enabled minutes=5.0(hidden) countdown=shown"
    );
}
