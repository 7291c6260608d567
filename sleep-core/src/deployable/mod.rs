//! Collaborator seams for the governed actuator and its host.
//!
//! The scheduler never owns the physical mechanism. It reaches the actuator,
//! the clock, and the execution context through the small traits in this
//! module so the same state machine runs inside a game host, the emulator, or
//! a unit test harness.

use core::fmt;

/// Absolute time in seconds, in the same units the host clock reports.
pub type UniversalTime = f64;

/// Deploy state reported by the actuator.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DeployState {
    Retracted,
    Retracting,
    Extended,
    Extending,
    Broken,
}

impl DeployState {
    /// All states in declaration order.
    pub const ALL: [DeployState; 5] = [
        DeployState::Retracted,
        DeployState::Retracting,
        DeployState::Extended,
        DeployState::Extending,
        DeployState::Broken,
    ];

    /// Lower-case label used by logs and the console.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            DeployState::Retracted => "retracted",
            DeployState::Retracting => "retracting",
            DeployState::Extended => "extended",
            DeployState::Extending => "extending",
            DeployState::Broken => "broken",
        }
    }

    /// Returns `true` while the actuator is stowed or on its way there.
    #[must_use]
    pub const fn is_stowing(self) -> bool {
        matches!(self, DeployState::Retracted | DeployState::Retracting)
    }

    /// Returns `true` for states that make an armed sleep meaningless.
    #[must_use]
    pub const fn cancels_sleep(self) -> bool {
        matches!(
            self,
            DeployState::Broken | DeployState::Extended | DeployState::Extending
        )
    }
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Host scene the machine is evaluated in.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExecutionContext {
    Editor,
    Flight,
    Other,
}

impl ExecutionContext {
    /// Lower-case label used by logs and the console.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            ExecutionContext::Editor => "editor",
            ExecutionContext::Flight => "flight",
            ExecutionContext::Other => "other",
        }
    }

    #[must_use]
    pub const fn is_editor(self) -> bool {
        matches!(self, ExecutionContext::Editor)
    }

    #[must_use]
    pub const fn is_flight(self) -> bool {
        matches!(self, ExecutionContext::Flight)
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Abstraction over the deployable mechanism.
///
/// Commands are fire-and-forget: the scheduler never waits for them and
/// observes the resulting [`DeployState`] on a later tick.
pub trait Actuator {
    /// Reports the current deploy state.
    fn deploy_state(&self) -> DeployState;

    /// Returns `true` when a transition can currently be initiated.
    fn can_move(&self) -> bool;

    /// Starts retracting the mechanism.
    fn retract(&mut self);

    /// Starts extending the mechanism.
    fn extend(&mut self);
}

/// Monotonic source of [`UniversalTime`].
pub trait Clock {
    fn now(&self) -> UniversalTime;
}

/// Host hook reporting the active [`ExecutionContext`].
pub trait ContextSource {
    fn current_context(&self) -> ExecutionContext;
}

/// Clock frozen at a fixed instant.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FixedClock(pub UniversalTime);

impl Clock for FixedClock {
    fn now(&self) -> UniversalTime {
        self.0
    }
}

impl ContextSource for ExecutionContext {
    fn current_context(&self) -> ExecutionContext {
        *self
    }
}
