//! Configuration loader
//!
//! Loading pipeline:
//! 1. Read the file and strip a UTF-8 BOM
//! 2. Environment variable expansion (pre-parse, on raw text)
//! 3. YAML parsing into `GameConfig`
//! 4. Validation
//! 5. Freeze with `Arc`

use std::path::Path;
use std::sync::Arc;

use crate::config::schema::GameConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;

// ============================================================================
// Public API
// ============================================================================

/// Largest configuration file accepted, in bytes.
pub const MAX_CONFIG_SIZE: u64 = 1024 * 1024;

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: Arc<GameConfig>,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Creates a new configuration loader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Loads and validates the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or exceeds [`MAX_CONFIG_SIZE`]
    /// - A required environment variable is unset
    /// - YAML parsing or deserialization fails
    /// - Validation reports errors
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        if metadata.len() > MAX_CONFIG_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{} bytes", metadata.len()),
                expected: format!("at most {MAX_CONFIG_SIZE} bytes"),
            });
        }

        let raw_content = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        self.load_str(&raw_content, path)
    }

    /// Loads and validates configuration text. `source` is only used in
    /// messages.
    ///
    /// # Errors
    ///
    /// See [`ConfigLoader::load`].
    pub fn load_str(&self, raw: &str, source: &Path) -> Result<LoadResult, ConfigError> {
        let mut warnings = Vec::new();
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

        let expanded = expand_env(raw, source)?;
        warnings.extend(expanded.warnings);
        let substituted = expanded.text;

        // An empty document means "all defaults".
        let config: GameConfig = if substituted.trim().is_empty() {
            GameConfig::default()
        } else {
            serde_yaml::from_str(&substituted).map_err(|e| ConfigError::ParseError {
                path: source.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?
        };

        let result = Validator::new().validate(&config);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: source.display().to_string(),
                errors: result.errors,
            });
        }

        for issue in result.warnings {
            warnings.push(LoadWarning {
                message: issue.message,
                location: Some(issue.path),
            });
        }

        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }

    /// Loads `path` when given, otherwise returns the defaults.
    ///
    /// # Errors
    ///
    /// See [`ConfigLoader::load`].
    pub fn load_or_default(&self, path: Option<&Path>) -> Result<LoadResult, ConfigError> {
        match path {
            Some(path) => self.load(path),
            None => Ok(LoadResult {
                config: Arc::new(GameConfig::default()),
                warnings: Vec::new(),
            }),
        }
    }
}

// ============================================================================
// Environment Variable Substitution
// ============================================================================

/// Raw text after environment expansion.
struct Expanded {
    text: String,
    warnings: Vec<LoadWarning>,
}

/// What to do when a referenced variable is unset.
enum Fallback<'a> {
    Empty,
    Default(&'a str),
    Required(&'a str),
}

/// Expands `${VAR}`, `${VAR:-default}`, `${VAR:?message}` and `$$` in
/// raw YAML text, before parsing. A reference must close on the line it
/// opens on.
fn expand_env(raw: &str, source: &Path) -> Result<Expanded, ConfigError> {
    let mut text = String::with_capacity(raw.len());
    let mut warnings = Vec::new();

    for (index, line) in raw.split_inclusive('\n').enumerate() {
        let line_no = index + 1;
        let mut rest = line;

        while let Some(pos) = rest.find('$') {
            text.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            if let Some(tail) = after.strip_prefix('$') {
                text.push('$');
                rest = tail;
                continue;
            }
            let Some(body) = after.strip_prefix('{') else {
                text.push('$');
                rest = after;
                continue;
            };

            let end = closing_brace(body).ok_or_else(|| ConfigError::ParseError {
                path: source.to_path_buf(),
                line: Some(line_no),
                message: format!(
                    "Unclosed environment variable reference: ${{{}",
                    body.trim_end()
                ),
            })?;
            let (name, fallback) = split_reference(&body[..end]);

            match (std::env::var(name), fallback) {
                (Ok(value), _) => text.push_str(&value),
                (Err(_), Fallback::Default(value)) => text.push_str(value),
                (Err(_), Fallback::Required(message)) => {
                    return Err(ConfigError::EnvVarNotSet {
                        var: name.to_string(),
                        location: message.to_string(),
                    });
                }
                (Err(_), Fallback::Empty) => warnings.push(LoadWarning {
                    message: format!("Environment variable '{name}' is not set, using empty string"),
                    location: Some(format!("{}:{line_no}", source.display())),
                }),
            }
            rest = &body[end + 1..];
        }
        text.push_str(rest);
    }

    Ok(Expanded { text, warnings })
}

/// Byte offset of the `}` that closes a reference body. Braces inside a
/// default nest.
fn closing_brace(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn split_reference(body: &str) -> (&str, Fallback<'_>) {
    for (i, _) in body.match_indices(':') {
        let (name, tail) = (&body[..i], &body[i + 1..]);
        if let Some(default) = tail.strip_prefix('-') {
            return (name, Fallback::Default(default));
        }
        if let Some(message) = tail.strip_prefix('?') {
            return (name, Fallback::Required(message));
        }
    }
    (body, Fallback::Empty)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn expand(raw: &str) -> Result<Expanded, ConfigError> {
        expand_env(raw, Path::new("test.yaml"))
    }

    #[test]
    fn expands_set_variable() {
        // PATH is always set
        let expanded = expand("path: ${PATH}").unwrap();
        assert!(!expanded.text.contains("${PATH}"));
        assert!(expanded.text.len() > "path: ".len());
        assert!(expanded.warnings.is_empty());
    }

    #[test]
    fn unset_variable_takes_default() {
        let expanded = expand("hold: ${MEMOSEQ_TEST_NONEXISTENT_VAR_XYZ123:-2s}").unwrap();
        assert_eq!(expanded.text, "hold: 2s");
    }

    #[test]
    fn default_may_contain_braces() {
        let expanded = expand("idle: ${MEMOSEQ_TEST_NONEXISTENT_VAR_XYZ123:-{ready}}!").unwrap();
        assert_eq!(expanded.text, "idle: {ready}!");
    }

    #[test]
    fn required_variable_missing() {
        match expand("hold: ${MEMOSEQ_TEST_REQUIRED_XYZ123:?must be set}") {
            Err(ConfigError::EnvVarNotSet { var, location }) => {
                assert_eq!(var, "MEMOSEQ_TEST_REQUIRED_XYZ123");
                assert_eq!(location, "must be set");
            }
            other => panic!("expected EnvVarNotSet, got {:?}", other.map(|e| e.text)),
        }
    }

    #[test]
    fn doubled_dollar_is_literal() {
        let expanded = expand("win: \"$$100 prize, $5 off\"").unwrap();
        assert_eq!(expanded.text, "win: \"$100 prize, $5 off\"");
    }

    #[test]
    fn unset_variable_warns_with_line() {
        let expanded = expand("icons: [a]\nidle: ${MEMOSEQ_TEST_WARN_XYZ123}\n").unwrap();
        assert_eq!(expanded.text, "icons: [a]\nidle: \n");
        assert_eq!(expanded.warnings.len(), 1);
        assert!(expanded.warnings[0].message.contains("MEMOSEQ_TEST_WARN_XYZ123"));
        assert_eq!(expanded.warnings[0].location.as_deref(), Some("test.yaml:2"));
    }

    #[test]
    fn unclosed_reference_reports_its_line() {
        match expand("icons: [a]\ntitles:\n  idle: ${OOPS\n  win: done\n") {
            Err(ConfigError::ParseError { line, message, .. }) => {
                assert_eq!(line, Some(3));
                assert!(message.contains("${OOPS"));
            }
            other => panic!("expected ParseError, got {:?}", other.map(|e| e.text)),
        }
    }

    #[test]
    fn load_str_applies_values_and_defaults() {
        let loaded = ConfigLoader::new()
            .load_str(
                "timings:\n  hold: ${MEMOSEQ_TEST_HOLD_XYZ123:-750ms}\n",
                Path::new("inline.yaml"),
            )
            .unwrap();
        assert_eq!(loaded.config.timings.hold, Duration::from_millis(750));
        assert_eq!(loaded.config.icons, GameConfig::default().icons);
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn load_str_empty_document_is_default() {
        let loaded = ConfigLoader::new()
            .load_str("\u{feff}\n", Path::new("empty.yaml"))
            .unwrap();
        assert_eq!(*loaded.config, GameConfig::default());
    }

    #[test]
    fn load_str_reports_validation_errors() {
        let err = ConfigLoader::new()
            .load_str("icons: [a, b, c]\n", Path::new("small.yaml"))
            .unwrap_err();
        match err {
            ConfigError::ValidationError { path, errors } => {
                assert_eq!(path, "small.yaml");
                assert_eq!(errors[0].path, "icons");
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn load_str_reports_parse_line() {
        let err = ConfigLoader::new()
            .load_str("icons: [a, b\ntimings: {", Path::new("broken.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn load_missing_file() {
        let err = ConfigLoader::new()
            .load(Path::new("/definitely/not/here.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn load_or_default_without_path() {
        let loaded = ConfigLoader::new().load_or_default(None).unwrap();
        assert_eq!(*loaded.config, GameConfig::default());
    }
}
