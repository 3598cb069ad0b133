//! Severity levels attached to structured records.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Severity of a structured record.
///
/// The textual form is always lowercase because it is emitted verbatim as
/// the `type="…"` attribute of a record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// Returned when a string does not name a known [`Level`].
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid log level: {0}")]
pub struct ParseLevelError(String);

impl Level {
    /// Lowercase name used on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(ParseLevelError(s.to_owned())),
        }
    }
}
