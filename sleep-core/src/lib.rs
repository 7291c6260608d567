#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

// Sleep/wake state machine for a deployable actuator.
//
// The crate stays free of the Rust standard library so the same logic can be
// embedded in a game host, driven by the emulator, or exercised in tests.

pub mod controls;
pub mod countdown;
pub mod deployable;
pub mod repl;
pub mod scheduler;
pub mod settings;
pub mod snapshot;
pub mod telemetry;

pub use deployable::{Actuator, Clock, ContextSource, DeployState, ExecutionContext, UniversalTime};
pub use scheduler::{Mode, TickAction, TickReport, WakeOutcome, WakeScheduler, WakeTimer};
pub use settings::{PersistedState, SleepMinutes};
