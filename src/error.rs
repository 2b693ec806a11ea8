//! Error types for `memoseq`
//!
//! Configuration problems, game misconfiguration and I/O failures are
//! collected under [`MemoseqError`], which maps every variant to a
//! process exit code. Ignored taps and superseded chains are not errors
//! and never surface here.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `memoseq` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Game setup error (icon pool too small, zero tick)
    pub const GAME_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `memoseq` operations.
#[derive(Debug, Error)]
pub enum MemoseqError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Game construction error
    #[error(transparent)]
    Game(#[from] GameError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl MemoseqError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Game(_) => ExitCode::GAME_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Game Errors
// ============================================================================

/// Errors raised while constructing or driving a game.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    /// The icon pool cannot fill the grid without repeating an icon.
    ///
    /// Drawing a selection from such a pool would never terminate, so
    /// this is reported before any phase starts.
    #[error("icon pool has {distinct} distinct icons, at least {required} are required")]
    PoolTooSmall {
        /// Number of distinct icons supplied
        distinct: usize,
        /// Number of distinct icons the grid needs
        required: usize,
    },

    /// The timer period is zero, so the round clock could never tick.
    #[error("timer tick period must be non-zero")]
    ZeroTick,

    /// The machine was asked to run before `start()` was called.
    #[error("game has not been started")]
    NotStarted,
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}")]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// Environment variable referenced in configuration is not set
    #[error("environment variable '{var}' not set (referenced at {location})")]
    EnvVarNotSet {
        /// Name of the environment variable
        var: String,
        /// Message attached to the `${VAR:?message}` reference
        location: String,
    },
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "timings.tick")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - validation failure that prevents configuration from being used
    Error,
    /// Warning - potential issue that does not prevent configuration loading
    Warning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let config = MemoseqError::Config(ConfigError::MissingFile {
            path: PathBuf::from("game.yaml"),
        });
        assert_eq!(config.exit_code(), ExitCode::CONFIG_ERROR);

        let game = MemoseqError::Game(GameError::PoolTooSmall {
            distinct: 3,
            required: 6,
        });
        assert_eq!(game.exit_code(), ExitCode::GAME_ERROR);

        let io = MemoseqError::Io(std::io::Error::other("boom"));
        assert_eq!(io.exit_code(), ExitCode::IO_ERROR);
    }

    #[test]
    fn pool_too_small_message_names_counts() {
        let err = GameError::PoolTooSmall {
            distinct: 4,
            required: 6,
        };
        assert_eq!(
            err.to_string(),
            "icon pool has 4 distinct icons, at least 6 are required"
        );
    }

    #[test]
    fn validation_issue_display() {
        let issue = ValidationIssue {
            path: "icons".to_string(),
            message: "too few icons".to_string(),
            severity: Severity::Error,
        };
        assert_eq!(issue.to_string(), "error: too few icons at icons");
    }
}
