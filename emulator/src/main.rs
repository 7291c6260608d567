mod actuator;
mod session;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use sleep_core::settings::{self, PersistedState, SleepMinutes};
use sleep_core::{DeployState, ExecutionContext};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use actuator::SimActuator;
use session::{Session, TranscriptLogger};

/// Interactive rig for the deployable sleep/wake state machine.
#[derive(Parser)]
#[command(name = "sleep-emulator", version)]
struct Cli {
    /// Sleep duration in minutes, overriding any persisted value. Snapped to
    /// the slider's range and half-minute steps.
    #[arg(long)]
    minutes: Option<f32>,

    /// Execution context at startup
    #[arg(long, value_enum, default_value_t = ContextArg::Flight)]
    context: ContextArg,

    /// Deploy state of the simulated actuator at startup
    #[arg(long, value_enum, default_value_t = StateArg::Extended)]
    deploy_state: StateArg,

    /// Run without an actuator bound
    #[arg(long)]
    no_actuator: bool,

    /// File holding persisted state, loaded at startup and written on exit
    #[arg(long)]
    state: Option<PathBuf>,

    /// Seconds the simulated actuator needs to extend or retract
    #[arg(long, default_value_t = 5.0)]
    transit: f64,

    /// Initial virtual clock reading in seconds
    #[arg(long, default_value_t = 0.0)]
    clock: f64,

    /// Write the console exchange to this file
    #[arg(long)]
    transcript: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ContextArg {
    Editor,
    Flight,
    Other,
}

impl From<ContextArg> for ExecutionContext {
    fn from(arg: ContextArg) -> Self {
        match arg {
            ContextArg::Editor => ExecutionContext::Editor,
            ContextArg::Flight => ExecutionContext::Flight,
            ContextArg::Other => ExecutionContext::Other,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StateArg {
    Retracted,
    Retracting,
    Extended,
    Extending,
    Broken,
}

impl From<StateArg> for DeployState {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Retracted => DeployState::Retracted,
            StateArg::Retracting => DeployState::Retracting,
            StateArg::Extended => DeployState::Extended,
            StateArg::Extending => DeployState::Extending,
            StateArg::Broken => DeployState::Broken,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut persisted = match cli.state.as_deref() {
        Some(path) => load_state(path)?,
        None => PersistedState::fresh(),
    };
    if let Some(minutes) = cli.minutes {
        persisted.sleep_minutes = slider_minutes(minutes);
    }

    let actuator =
        (!cli.no_actuator).then(|| SimActuator::new(cli.deploy_state.into(), cli.transit));
    let transcript = cli
        .transcript
        .as_deref()
        .map(TranscriptLogger::create)
        .transpose()
        .context("failed to open transcript")?;

    let mut session = Session::new(
        actuator,
        persisted,
        cli.context.into(),
        cli.clock,
        transcript,
    );
    run_console(&mut session)?;

    if let Some(path) = cli.state.as_deref() {
        save_state(path, &session.persisted())?;
    }
    Ok(())
}

fn run_console(session: &mut Session) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut line = String::new();

    writeln!(
        writer,
        "Deploy sleep emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed at t={:.1}.", session.now())?;
            break;
        }

        for response in session.handle_command(trimmed)? {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(())
}

/// Positions the duration slider at `requested`, as the host UI would.
fn slider_minutes(requested: f32) -> SleepMinutes {
    let minutes = SleepMinutes::snapped(requested);
    if SleepMinutes::new(requested) != Ok(minutes) {
        warn!(requested, snapped = %minutes, "--minutes adjusted to the slider");
    }
    minutes
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn load_state(path: &Path) -> anyhow::Result<PersistedState> {
    if !path.exists() {
        warn!(path = %path.display(), "no persisted state, starting fresh");
        return Ok(PersistedState::fresh());
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let state = settings::decode(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    info!(
        path = %path.display(),
        wake_time = state.wake_time,
        minutes = %state.sleep_minutes,
        "loaded persisted state"
    );
    Ok(state)
}

fn save_state(path: &Path, state: &PersistedState) -> anyhow::Result<()> {
    fs::write(path, settings::encode_to_string(state))
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), wake_time = state.wake_time, "saved persisted state");
    Ok(())
}
