//! Message severity levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidatorError;

/// The severity of a validator message.
///
/// Levels are totally ordered, from least to most severe:
/// `Debug < Info < Success < Warn < Error < Fatal`. The ordering drives both the
/// minimum-severity threshold of a run and the grouping key of the message
/// clusterer.
///
/// # Examples
///
/// ```rust
/// use mzid_guard::core::MessageLevel;
///
/// assert!(MessageLevel::Fatal > MessageLevel::Error);
/// assert!(MessageLevel::Warn.is_at_least(MessageLevel::Info));
/// assert_eq!("warn".parse::<MessageLevel>().unwrap(), MessageLevel::Warn);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageLevel {
    /// Diagnostic output useful only while developing rules
    Debug = 0,
    /// Informational observation
    Info = 1,
    /// Positive confirmation that a check passed
    Success = 2,
    /// Something that should be reviewed but does not invalidate the document
    #[default]
    Warn = 3,
    /// The document violates a rule
    Error = 4,
    /// The document cannot be validated at all
    Fatal = 5,
}

impl MessageLevel {
    /// All levels in ascending order.
    pub const ALL: [MessageLevel; 6] = [
        MessageLevel::Debug,
        MessageLevel::Info,
        MessageLevel::Success,
        MessageLevel::Warn,
        MessageLevel::Error,
        MessageLevel::Fatal,
    ];

    /// Returns the string representation of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageLevel::Debug => "DEBUG",
            MessageLevel::Info => "INFO",
            MessageLevel::Success => "SUCCESS",
            MessageLevel::Warn => "WARN",
            MessageLevel::Error => "ERROR",
            MessageLevel::Fatal => "FATAL",
        }
    }

    /// Checks if this level is at least as severe as another level.
    pub fn is_at_least(&self, other: MessageLevel) -> bool {
        *self >= other
    }
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageLevel {
    type Err = ValidatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidatorError::Configuration(format!("unknown message level '{s}'")))
    }
}
