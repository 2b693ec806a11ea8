//! Configuration validation
//!
//! Runs on the fully deserialized `GameConfig` and collects every issue
//! rather than stopping at the first one.

use std::collections::HashSet;
use std::time::Duration;

use crate::config::schema::GameConfig;
use crate::error::{Severity, ValidationIssue};
use crate::icon::GRID_SIZE;

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns the result.
    pub fn validate(&mut self, config: &GameConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_icons(config);
        self.validate_timings(config);
        self.validate_titles(config);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Sections
    // ========================================================================

    fn validate_icons(&mut self, config: &GameConfig) {
        let mut seen = HashSet::new();
        for (i, name) in config.icons.iter().enumerate() {
            if name.trim().is_empty() {
                self.add_error(&format!("icons[{i}]"), "Icon name cannot be empty");
            } else if !seen.insert(name.as_str()) {
                self.add_warning(
                    &format!("icons[{i}]"),
                    &format!("Duplicate icon '{name}' is ignored when drawing the grid"),
                );
            }
        }

        let distinct = config
            .icons
            .iter()
            .filter(|name| !name.trim().is_empty())
            .collect::<HashSet<_>>()
            .len();
        if distinct < GRID_SIZE {
            self.add_error(
                "icons",
                &format!(
                    "At least {GRID_SIZE} distinct icons are required to fill the grid, found {distinct}"
                ),
            );
        }
    }

    fn validate_timings(&mut self, config: &GameConfig) {
        let timings = &config.timings;
        if timings.tick == Duration::ZERO {
            self.add_error("timings.tick", "Timer period must be greater than zero");
        }
        if timings.hold == Duration::ZERO {
            self.add_warning(
                "timings.hold",
                "Reveal hold of zero shows each icon only for its animation",
            );
        }
    }

    fn validate_titles(&mut self, config: &GameConfig) {
        let titles = [
            ("titles.idle", &config.titles.idle),
            ("titles.reveal", &config.titles.reveal),
            ("titles.input", &config.titles.input),
            ("titles.win", &config.titles.win),
        ];
        for (path, text) in titles {
            if text.trim().is_empty() {
                self.add_warning(path, "Title text is empty");
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(config: &GameConfig) -> ValidationResult {
        Validator::new().validate(config)
    }

    #[test]
    fn default_config_is_valid_without_warnings() {
        let result = validate(&GameConfig::default());
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn five_icons_is_an_error() {
        let config = GameConfig {
            icons: ["a", "b", "c", "d", "e"].map(String::from).to_vec(),
            ..GameConfig::default()
        };
        let result = validate(&config);
        assert!(result.has_errors());
        assert_eq!(result.errors[0].path, "icons");
    }

    #[test]
    fn duplicates_warn_and_do_not_count() {
        let config = GameConfig {
            icons: ["a", "b", "c", "d", "e", "a", "b"].map(String::from).to_vec(),
            ..GameConfig::default()
        };
        let result = validate(&config);
        assert_eq!(result.warnings.len(), 2);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn empty_icon_name_is_an_error() {
        let mut config = GameConfig::default();
        config.icons.push("  ".to_string());
        let result = validate(&config);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, "icons[10]");
    }

    #[test]
    fn collects_every_issue() {
        let mut config = GameConfig {
            icons: vec!["a".to_string()],
            ..GameConfig::default()
        };
        config.timings.tick = Duration::ZERO;
        config.timings.hold = Duration::ZERO;
        config.titles.win = String::new();

        let result = validate(&config);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.warnings.len(), 2);
    }
}
