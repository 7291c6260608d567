//! "Wake in" text shown while the actuator sleeps.

use core::fmt;

use heapless::String;

use crate::deployable::UniversalTime;
use crate::scheduler::WakeTimer;

/// Fits `u32::MAX` seconds rendered as `m:ss`.
pub const COUNTDOWN_TEXT_CAPACITY: usize = 16;

/// Whole seconds left before `wake_at`, rounded up and clamped at zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn remaining_seconds(wake_at: UniversalTime, now: UniversalTime) -> u32 {
    let remaining = wake_at - now;
    if remaining.is_nan() || remaining <= 0.0 {
        return 0;
    }
    if remaining >= f64::from(u32::MAX) {
        return u32::MAX;
    }

    let whole = remaining as u32;
    if f64::from(whole) < remaining {
        whole + 1
    } else {
        whole
    }
}

/// Writes `seconds` as `m:ss`.
pub fn write_countdown<W: fmt::Write>(writer: &mut W, seconds: u32) -> fmt::Result {
    write!(writer, "{}:{:02}", seconds / 60, seconds % 60)
}

/// Throttled countdown text that only reformats when the second changes.
#[derive(Clone, Debug, Default)]
pub struct CountdownDisplay {
    last_seconds: Option<u32>,
    text: String<COUNTDOWN_TEXT_CAPACITY>,
}

impl CountdownDisplay {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_seconds: None,
            text: String::new(),
        }
    }

    /// Recomputes the text for an armed timer.
    ///
    /// Returns the freshly published text when the whole-second value moved,
    /// `None` when the timer is idle or the value is unchanged. An idle timer
    /// forgets the last value so the next sleep always publishes.
    pub fn refresh(&mut self, timer: WakeTimer, now: UniversalTime) -> Option<&str> {
        let Some(wake_at) = timer.deadline() else {
            self.last_seconds = None;
            return None;
        };
        let seconds = remaining_seconds(wake_at, now);
        if self.last_seconds == Some(seconds) {
            return None;
        }

        self.last_seconds = Some(seconds);
        self.text.clear();
        // Capacity covers the widest u32 rendering.
        let _ = write_countdown(&mut self.text, seconds);
        Some(self.text.as_str())
    }

    /// Last published text.
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_str()
    }
}
