//! Text codec for [`PersistedState`].
//!
//! The host stores the two resumable scalars as config-node lines:
//!
//! ```text
//! wakeTime = 300
//! sleepMinutes = 5
//! ```
//!
//! Blank lines and `//` comments are skipped, unknown keys are ignored, and
//! missing keys keep their defaults.

use core::fmt;

use winnow::ascii::{space0, till_line_ending};
use winnow::combinator::{opt, preceded};
use winnow::prelude::*;
use winnow::token::take_while;

use super::{PersistedState, SettingError, SleepMinutes};

const WAKE_TIME_KEY: &str = "wakeTime";
const SLEEP_MINUTES_KEY: &str = "sleepMinutes";

/// Failures while decoding persisted state. Line numbers are 1-based.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PersistError {
    Syntax { line: usize },
    InvalidNumber { line: usize },
    InvalidMinutes { line: usize, error: SettingError },
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Syntax { line } => write!(f, "line {line}: expected `key = value`"),
            PersistError::InvalidNumber { line } => write!(f, "line {line}: invalid number"),
            PersistError::InvalidMinutes { line, error } => write!(f, "line {line}: {error}"),
        }
    }
}

impl core::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            PersistError::InvalidMinutes { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Writes `state` as config-node lines.
pub fn encode<W: fmt::Write>(state: &PersistedState, writer: &mut W) -> fmt::Result {
    writeln!(writer, "{WAKE_TIME_KEY} = {}", state.wake_time)?;
    writeln!(
        writer,
        "{SLEEP_MINUTES_KEY} = {}",
        state.sleep_minutes.minutes()
    )
}

/// Encodes `state` into an owned string.
#[cfg(feature = "alloc")]
#[must_use]
pub fn encode_to_string(state: &PersistedState) -> alloc::string::String {
    let mut text = alloc::string::String::new();
    // Writing into a `String` cannot fail.
    let _ = encode(state, &mut text);
    text
}

/// Parses config-node lines back into a [`PersistedState`].
///
/// A non-positive or non-finite `wakeTime` decodes as "not sleeping".
///
/// # Errors
///
/// Returns the first malformed line, unparsable number, or invalid duration.
pub fn decode(text: &str) -> Result<PersistedState, PersistError> {
    let mut state = PersistedState::fresh();

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let Some((key, value)) = line
            .parse(raw)
            .map_err(|_| PersistError::Syntax { line: line_no })?
        else {
            continue;
        };

        match key {
            WAKE_TIME_KEY => {
                let wake_time = value
                    .parse::<f64>()
                    .map_err(|_| PersistError::InvalidNumber { line: line_no })?;
                state.wake_time = if wake_time.is_finite() && wake_time > 0.0 {
                    wake_time
                } else {
                    0.0
                };
            }
            SLEEP_MINUTES_KEY => {
                let minutes = value
                    .parse::<f32>()
                    .map_err(|_| PersistError::InvalidNumber { line: line_no })?;
                state.sleep_minutes =
                    SleepMinutes::new(minutes).map_err(|error| PersistError::InvalidMinutes {
                        line: line_no,
                        error,
                    })?;
            }
            _ => {}
        }
    }

    Ok(state)
}

fn line<'s>(input: &mut &'s str) -> ModalResult<Option<(&'s str, &'s str)>> {
    let _ = space0.parse_next(input)?;
    let entry = opt(entry).parse_next(input)?;
    let _ = (space0, opt(comment)).parse_next(input)?;
    Ok(entry)
}

fn entry<'s>(input: &mut &'s str) -> ModalResult<(&'s str, &'s str)> {
    (key, space0, '=', space0, number)
        .map(|(key, _, _, _, value)| (key, value))
        .parse_next(input)
}

fn key<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)
}

fn number<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., |c: char| {
        c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')
    })
    .parse_next(input)
}

fn comment<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    preceded("//", till_line_ending).parse_next(input)
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn decodes_both_fields() {
        let state = decode("wakeTime = 300\nsleepMinutes = 2.5\n").expect("decode");
        assert_eq!(state.wake_time, 300.0);
        assert_eq!(state.sleep_minutes.minutes(), 2.5);
    }

    #[test]
    fn missing_fields_keep_defaults() {
        let state = decode("// nothing persisted yet\n\n").expect("decode");
        assert_eq!(state, PersistedState::fresh());
    }

    #[test]
    fn unknown_keys_and_trailing_comments_are_ignored() {
        let text = "  wakeTime=42.5 // armed\nisEnabled = 1\n";
        let state = decode(text).expect("decode");
        assert_eq!(state.wake_time, 42.5);
        assert_eq!(state.sleep_minutes, SleepMinutes::DEFAULT);
    }

    #[test]
    fn negative_wake_time_means_not_sleeping() {
        let state = decode("wakeTime = -12").expect("decode");
        assert_eq!(state.wake_time, 0.0);
    }

    #[test]
    fn reports_line_of_bad_input() {
        assert_eq!(
            decode("wakeTime = 1\nsleepMinutes 3"),
            Err(PersistError::Syntax { line: 2 })
        );
        assert_eq!(
            decode("wakeTime = 1.2.3"),
            Err(PersistError::InvalidNumber { line: 1 })
        );
        assert!(matches!(
            decode("sleepMinutes = 45"),
            Err(PersistError::InvalidMinutes {
                line: 1,
                error: SettingError::OutOfRange(_)
            })
        ));
    }

    #[test]
    fn encoded_state_decodes_to_the_same_values() {
        let state = PersistedState {
            wake_time: 1_234.75,
            sleep_minutes: SleepMinutes::new(7.5).expect("valid"),
        };
        let mut text = heapless::String::<64>::new();
        encode(&state, &mut text).expect("buffer large enough");
        assert_eq!(text.as_str(), "wakeTime = 1234.75\nsleepMinutes = 7.5\n");
        assert_eq!(decode(&text), Ok(state));
    }
}
