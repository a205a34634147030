use crate::error::{Error, OracleError};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and how to fix it.
/// Designed to be readable by both humans and LLM agents.
pub fn render_error(e: &Error) -> String {
    match e {
        Error::InvalidFilter { filter, reason } => render_invalid_filter(filter, reason),
        Error::Oracle(oracle) => render_oracle(oracle),
        Error::RewriteConflict { file, reason } => {
            render_rewrite_conflict(&file.display().to_string(), reason)
        },
        Error::UnsupportedLanguage { ext } => render_unsupported_language(ext),
        Error::FileTooLarge { file, size_bytes, max_bytes } => {
            render_file_too_large(file, *size_bytes, *max_bytes)
        },
        _ => render_generic(e),
    }
}

fn render_generic(e: &Error) -> String {
    match e {
        Error::FileNotFound { path } => format!("\
# Error: File Not Found

`{}` does not exist.
", path.display()),

        Error::ParseFailed { file, reason } => format!("\
# Error: Parse Failed

Could not parse `{}`: {reason}

Nothing in this file was changed.
", file.display()),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}

## Fix

Correct the syntax in `.docsmith.toml`.
"),
        // Already handled in render_error, but need exhaustive match.
        _ => format!("\
# Error

{e}
"),
    }
}

fn render_file_too_large(file: &std::path::Path, size_bytes: u64, max_bytes: u64) -> String {
    format!("\
# Error: File Too Large

`{}` is {size_bytes} bytes; the limit is {max_bytes}.

Nothing in this file was changed.
", file.display())
}

fn render_invalid_filter(filter: &str, reason: &str) -> String {
    format!(
        "\
# Error: Invalid Filter

`{filter}` is not a valid qualified path: {reason}

## Fix

Decorate filenames with colon-separated dotted paths:

    docsmith sample.py:foo:Config.validate -c
"
    )
}

fn render_oracle(e: &OracleError) -> String {
    match e {
        OracleError::Exhausted { attempts, last } => format!("\
# Error: Attempts Exhausted

The oracle gave no usable reply after {attempts} attempt(s).
Last failure: {last}

## Fix

Raise the budget with `--attempts`, or try a different `--model`.
"),

        OracleError::MalformedReply { reason } => format!("\
# Error: Malformed Oracle Reply

{reason}
"),

        OracleError::ModelNotInstalled { model } => format!("\
# Error: Model Not Installed

Model `{model}` is not installed on the Ollama server.

## Fix

Install it, then rerun:

    docsmith --install-model {model}
"),

        OracleError::Status { status, url } => format!("\
# Error: Ollama Request Failed

`{url}` returned HTTP {status}.

## Fix

Check the server's logs, and that `--model` names a model it can run.
"),

        OracleError::Transport { source, url } => format!("\
# Error: Ollama Unreachable

Could not reach `{url}`: {source}

## Fix

Check that the Ollama server is running and that `--host` and `--port`
point at it:

    ollama serve
"),
    }
}

fn render_rewrite_conflict(file: &str, reason: &str) -> String {
    format!(
        "\
# Error: Rewrite Conflict

An edit in `{file}` no longer matches the text on disk: {reason}

The file was left untouched.

## Fix

The file changed while it was being processed. Rerun:

    docsmith {file}
"
    )
}

fn render_unsupported_language(ext: &str) -> String {
    format!(
        "\
# Error: Unsupported Language

No tree-sitter grammar for `.{ext}` files.

## Supported extensions

- `.py` — Python
"
    )
}
