//! Command layer for docsmith: the per-file documentation run, plus the
//! model-management helpers behind `--list` and `--install-model`.

use std::io::{self, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;

use regex::Regex;
use tracing::info;

use crate::diagnostics;
use crate::engine::{self, EngineOptions};
use crate::error::Error;
use crate::oracle::{OllamaOracle, Oracle};
use crate::rewriter::ConfirmAll;
use crate::types::Modes;

/// Everything one invocation needs to process its files.
pub struct RunSettings {
    /// Retry budget for each oracle generation or validation call.
    pub attempts: u32,
    /// Maximum qualified-path depth considered when walking a whole file.
    pub depth: u32,
    /// Decorated filenames: a path optionally followed by colon-separated
    /// qualified-path filters, as in `sample.py:foo:Config.validate`.
    pub files: Vec<String>,
    /// The requested docstring operations.
    pub modes: Modes,
    /// Write accepted modifications back to disk.
    pub modify: bool,
    /// Print the fully modified source text.
    pub preview: bool,
    /// Print per-unit reports and a diff of the planned edits.
    pub report: bool,
}

/// Ask on stdin whether the modifications to `filename` should be saved.
/// Anything other than a plain `y` declines.
///
/// # Errors
///
/// Returns `Error::Io` if stdout or stdin fails.
fn confirm_save(filename: &str) -> Result<bool, Error> {
    print!("\nDo you want to save these modifications to {filename}? (y/N) ");
    io::stdout().flush()?;
    let mut reply = String::new();
    io::stdin().read_line(&mut reply)?;
    return Ok(reply.trim().eq_ignore_ascii_case("y"));
}

/// Pull `name` onto the Ollama server.
///
/// # Errors
///
/// Returns an oracle error when the pull fails or reports anything other
/// than success.
pub fn install_model(oracle: &OllamaOracle, name: &str) -> Result<(), Error> {
    oracle.install_model(name)?;
    eprintln!("Installed model {name}");
    return Ok(());
}

/// Print the name of every model installed on the Ollama server.
///
/// # Errors
///
/// Returns an oracle error when the server cannot be reached.
pub fn list_models(oracle: &OllamaOracle) -> Result<(), Error> {
    for model in oracle.get_models()? {
        println!("{model}");
    }
    return Ok(());
}

/// Run the documentation engine over one decorated filename and handle the
/// report, preview, and save flow. Returns the number of failed validations.
///
/// # Errors
///
/// Returns an error when the filter syntax is invalid, the file is missing
/// or unparseable, the model is not installed, or a save fails.
fn process_file(
    decorated: &str,
    options: &EngineOptions,
    oracle: &dyn Oracle,
    settings: &RunSettings,
) -> Result<u32, Error> {
    let (filename, filters) = split_decorated(decorated)?;
    let path = PathBuf::from(&filename);
    let source = std::fs::read_to_string(&path)
        .map_err(|_err| return Error::FileNotFound { path: path.clone() })?;

    let outcome = engine::document_file(&path, &source, &filters, options, oracle, &ConfirmAll)?;

    if settings.report {
        println!("{}", "-".repeat(79));
        for report in &outcome.reports {
            println!("{report}");
        }
        if let Some(diff) = &outcome.diff {
            println!();
            print!("{diff}");
        }
    }

    if outcome.modified {
        if settings.preview {
            println!("{}", outcome.text);
        }
        if settings.modify {
            let mut save_file = !settings.preview;
            if settings.preview || settings.report {
                save_file = confirm_save(&filename)?;
            }
            if save_file {
                std::fs::write(&path, &outcome.text)?;
                println!("Updated {filename}");
            } else {
                println!("{filename} was NOT updated.");
            }
        }
    } else {
        info!("The file {filename} was not modified");
    }

    return Ok(outcome.failed_validations);
}

/// Process every decorated filename in `settings`. A failure in one file is
/// reported and never aborts the rest of the run.
pub fn run(settings: &RunSettings, oracle: &dyn Oracle) -> ExitCode {
    let options = EngineOptions {
        attempts: settings.attempts,
        depth: settings.depth,
        modes: settings.modes,
    };
    let validate_only = settings.modes.validate
        && !settings.modes.create
        && !settings.modes.strip
        && !settings.modes.update;

    let mut any_error = false;
    let mut failed_validations: u32 = 0;
    for decorated in &settings.files {
        match process_file(decorated, &options, oracle, settings) {
            Ok(failures) => {
                failed_validations = failed_validations.saturating_add(failures);
            }
            Err(err) => {
                diagnostics::print_error(&err);
                any_error = true;
            }
        }
    }

    // Exit code priority: fatal error (2) > failed validation (1) > clean (0).
    if any_error {
        return ExitCode::from(2);
    }
    if validate_only && failed_validations > 0 {
        return ExitCode::from(1);
    }
    return ExitCode::SUCCESS;
}

/// Split a decorated filename into the path and its qualified-path filters.
///
/// # Errors
///
/// Returns `Error::InvalidFilter` when a filter is not a dotted identifier
/// path.
fn split_decorated(decorated: &str) -> Result<(String, Vec<String>), Error> {
    let mut parts = decorated.split(':');
    let filename = parts.next().unwrap_or_default().to_string();
    let filters: Vec<String> = parts.map(str::to_string).collect();
    for filter in &filters {
        validate_filter(filter)?;
    }
    return Ok((filename, filters));
}

/// Check that `filter` is a dotted path of Python identifiers.
///
/// # Errors
///
/// Returns `Error::InvalidFilter` describing the syntax problem.
fn validate_filter(filter: &str) -> Result<(), Error> {
    if filter.is_empty() {
        return Err(Error::InvalidFilter {
            filter: filter.to_string(),
            reason: "empty filter".to_string(),
        });
    }
    let pattern =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("valid regex");
    if pattern.is_match(filter) {
        return Ok(());
    }
    return Err(Error::InvalidFilter {
        filter: filter.to_string(),
        reason: "filters are dotted paths of Python identifiers".to_string(),
    });
}
