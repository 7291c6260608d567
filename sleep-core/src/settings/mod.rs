//! User-tunable sleep duration and the state that survives a restart.

use core::fmt;

use crate::deployable::UniversalTime;

pub mod persist;

pub use persist::{PersistError, decode, encode};
#[cfg(feature = "alloc")]
pub use persist::encode_to_string;

/// Sleep duration in minutes, constrained to the slider the host renders.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct SleepMinutes(f32);

impl SleepMinutes {
    pub const MIN: f32 = 0.5;
    pub const MAX: f32 = 20.0;
    pub const STEP: f32 = 0.5;
    pub const DEFAULT: Self = Self(5.0);

    /// Validates an exact slider value.
    ///
    /// # Errors
    ///
    /// Rejects non-finite, out-of-range, and off-step values.
    #[allow(clippy::float_cmp)]
    pub fn new(minutes: f32) -> Result<Self, SettingError> {
        if !minutes.is_finite() {
            return Err(SettingError::NotFinite);
        }
        if !(Self::MIN..=Self::MAX).contains(&minutes) {
            return Err(SettingError::OutOfRange(minutes));
        }
        if snap_to_step(minutes) != minutes {
            return Err(SettingError::OffStep(minutes));
        }
        Ok(Self(minutes))
    }

    /// Clamps into range and rounds to the nearest step.
    ///
    /// Non-finite input falls back to [`SleepMinutes::DEFAULT`].
    #[must_use]
    pub fn snapped(minutes: f32) -> Self {
        if minutes.is_nan() {
            return Self::DEFAULT;
        }
        Self(snap_to_step(minutes.clamp(Self::MIN, Self::MAX)))
    }

    #[must_use]
    pub const fn minutes(self) -> f32 {
        self.0
    }

    /// Sleep length in seconds.
    #[must_use]
    pub fn as_seconds(self) -> UniversalTime {
        60.0 * f64::from(self.0)
    }
}

impl Default for SleepMinutes {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for SleepMinutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn snap_to_step(minutes: f32) -> f32 {
    // Only called with values already known to be positive and bounded.
    let steps = (minutes / SleepMinutes::STEP + 0.5) as u32;
    steps as f32 * SleepMinutes::STEP
}

/// Rejected sleep duration values.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SettingError {
    NotFinite,
    OutOfRange(f32),
    OffStep(f32),
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingError::NotFinite => f.write_str("sleep minutes must be a finite number"),
            SettingError::OutOfRange(value) => write!(
                f,
                "sleep minutes {value} outside {}..={}",
                SleepMinutes::MIN,
                SleepMinutes::MAX
            ),
            SettingError::OffStep(value) => write!(
                f,
                "sleep minutes {value} is not a multiple of {}",
                SleepMinutes::STEP
            ),
        }
    }
}

impl core::error::Error for SettingError {}

/// The two scalars needed to resume a machine after a restart.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PersistedState {
    /// Absolute wake deadline, `0.0` when not sleeping.
    pub wake_time: UniversalTime,
    pub sleep_minutes: SleepMinutes,
}

impl PersistedState {
    /// State of a machine that has never slept.
    #[must_use]
    pub const fn fresh() -> Self {
        Self {
            wake_time: 0.0,
            sleep_minutes: SleepMinutes::DEFAULT,
        }
    }
}

impl Default for PersistedState {
    fn default() -> Self {
        Self::fresh()
    }
}
