//! Control surface visibility derived from the machine's current mode.
//!
//! [`derive_visibility`] is a pure function: the scheduler feeds it the
//! context, actuator binding, deploy state, and sleep flag and applies the
//! returned [`TimerDirective`] itself.

use core::fmt;

use crate::deployable::{DeployState, ExecutionContext};

/// Flags the host renders for the sleep controls.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ControlSurface {
    /// In-flight menu button that starts a sleep.
    pub sleep_button: bool,
    /// Bindable sleep command (action groups, keybinds).
    pub sleep_action: bool,
    /// Sleep-duration slider.
    pub duration_control: bool,
    /// "Wake in" countdown field.
    pub countdown: bool,
}

impl ControlSurface {
    /// Every control hidden and disabled.
    pub const HIDDEN: Self = Self {
        sleep_button: false,
        sleep_action: false,
        duration_control: false,
        countdown: false,
    };
}

/// Inputs to [`derive_visibility`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VisibilityInputs {
    pub context: ExecutionContext,
    /// `None` when no actuator is bound.
    pub deploy_state: Option<DeployState>,
    pub sleeping: bool,
}

/// Why an armed timer must be dropped.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CancelReason {
    /// No actuator is bound.
    Disabled,
    /// Sleep has no meaning outside flight.
    Editor,
    /// The actuator reached a state that contradicts sleeping.
    Incompatible(DeployState),
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Disabled => f.write_str("disabled"),
            CancelReason::Editor => f.write_str("editor"),
            CancelReason::Incompatible(state) => write!(f, "already-{state}"),
        }
    }
}

/// What the scheduler must do with the wake timer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimerDirective {
    Keep,
    Clear(CancelReason),
}

/// Result of [`derive_visibility`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Visibility {
    pub surface: ControlSurface,
    pub timer: TimerDirective,
}

/// Computes control flags and the timer policy for the supplied inputs.
///
/// Flags are computed against the post-directive sleep flag so a cancelled
/// sleep never leaves sleep-only controls showing.
#[must_use]
pub fn derive_visibility(inputs: VisibilityInputs) -> Visibility {
    let Some(state) = inputs.deploy_state else {
        return Visibility {
            surface: ControlSurface::HIDDEN,
            timer: TimerDirective::Clear(CancelReason::Disabled),
        };
    };

    match inputs.context {
        ExecutionContext::Editor => Visibility {
            surface: ControlSurface {
                sleep_button: false,
                sleep_action: true,
                duration_control: true,
                countdown: false,
            },
            timer: TimerDirective::Clear(CancelReason::Editor),
        },
        ExecutionContext::Flight => {
            let timer = if inputs.sleeping && state.cancels_sleep() {
                TimerDirective::Clear(CancelReason::Incompatible(state))
            } else {
                TimerDirective::Keep
            };
            let sleeping = inputs.sleeping && timer == TimerDirective::Keep;
            let offer_sleep = !sleeping && state == DeployState::Extended;

            Visibility {
                surface: ControlSurface {
                    sleep_button: offer_sleep,
                    sleep_action: true,
                    duration_control: offer_sleep,
                    countdown: sleeping && state.is_stowing(),
                },
                timer,
            }
        }
        ExecutionContext::Other => Visibility {
            surface: ControlSurface::HIDDEN,
            timer: TimerDirective::Keep,
        },
    }
}
