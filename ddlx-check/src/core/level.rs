//! Check severity levels and the per-check status derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The severity level of a check.
///
/// Levels are ordered by severity: Error > Warning > Info. Generated
/// column-level checks default to [`Level::Warning`].
///
/// # Examples
///
/// ```rust
/// use ddlx_check::core::Level;
///
/// assert!(Level::Error > Level::Warning);
/// assert_eq!(Level::default(), Level::Warning);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Informational level - Used for metrics and non-critical observations
    Info = 0,
    /// Warning level - Indicates potential issues that should be reviewed
    #[default]
    Warning = 1,
    /// Error level - Indicates critical data quality issues that must be addressed
    Error = 2,
}

impl Level {
    /// Returns the string representation of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate status of one verified group of constraints.
///
/// A group succeeds when none of its constraints failed. Otherwise its
/// status mirrors the level of the check it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Success,
    Warning,
    Error,
}

impl CheckStatus {
    /// Derives the status for a group evaluated at `level`.
    pub fn from_outcome(level: Level, any_failed: bool) -> Self {
        if !any_failed {
            return CheckStatus::Success;
        }
        match level {
            Level::Error => CheckStatus::Error,
            Level::Warning | Level::Info => CheckStatus::Warning,
        }
    }

    /// Returns the string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Success => "success",
            CheckStatus::Warning => "warning",
            CheckStatus::Error => "error",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Error > Level::Warning);
        assert!(Level::Warning > Level::Info);
    }

    #[test]
    fn test_level_serde() {
        let json = serde_json::to_string(&Level::Error).unwrap();
        assert_eq!(json, "\"error\"");

        let level: Level = serde_json::from_str("\"info\"").unwrap();
        assert_eq!(level, Level::Info);
    }

    #[test]
    fn test_check_status_from_outcome() {
        assert_eq!(
            CheckStatus::from_outcome(Level::Error, false),
            CheckStatus::Success
        );
        assert_eq!(
            CheckStatus::from_outcome(Level::Error, true),
            CheckStatus::Error
        );
        assert_eq!(
            CheckStatus::from_outcome(Level::Warning, true),
            CheckStatus::Warning
        );
        // Info-level groups never escalate past a warning
        assert_eq!(
            CheckStatus::from_outcome(Level::Info, true),
            CheckStatus::Warning
        );
    }
}
