//! Configuration validation command.

use serde::Serialize;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::{ConfigLoader, LoadWarning};
use crate::error::{ConfigError, MemoseqError};

#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

/// Validate configuration files without playing.
///
/// Every file is checked and reported; the first failure is returned.
///
/// # Errors
///
/// Returns the config error of the first file that fails to load.
pub fn run(args: &ValidateArgs) -> Result<(), MemoseqError> {
    let loader = ConfigLoader::new();
    let mut reports = Vec::with_capacity(args.files.len());
    let mut first_error = None;

    for path in &args.files {
        tracing::info!(file = %path.display(), "validating configuration");
        let file = path.display().to_string();

        match loader.load(path) {
            Ok(load_result) => {
                tracing::info!(file = %path.display(), "configuration valid");
                reports.push(FileReport {
                    file,
                    valid: true,
                    errors: Vec::new(),
                    warnings: load_result.warnings.iter().map(describe_warning).collect(),
                });
            }
            Err(err) => {
                let errors = match &err {
                    ConfigError::ValidationError { errors, .. } => {
                        errors.iter().map(ToString::to_string).collect()
                    }
                    other => vec![other.to_string()],
                };
                reports.push(FileReport {
                    file,
                    valid: false,
                    errors,
                    warnings: Vec::new(),
                });
                first_error.get_or_insert(err);
            }
        }
    }

    match args.format {
        OutputFormat::Human => {
            for report in &reports {
                let status = if report.valid { "ok" } else { "FAILED" };
                println!("{status}: {}", report.file);
                for line in report.errors.iter().chain(&report.warnings) {
                    println!("  {line}");
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }

    first_error.map_or(Ok(()), |err| Err(err.into()))
}

fn describe_warning(warning: &LoadWarning) -> String {
    warning.location.as_deref().map_or_else(
        || format!("warning: {}", warning.message),
        |location| format!("warning: {} at {location}", warning.message),
    )
}
