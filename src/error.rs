/// Crate-level error types for docsmith diagnostics.
use std::path::PathBuf;

/// All errors in docsmith carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file, unit, or reason for failure.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced source file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Source file exceeds the configured size limit.
    #[error("file too large ({size_bytes} bytes, max {max_bytes}): {}", file.display())]
    FileTooLarge {
        /// File that exceeded the size limit.
        file: PathBuf,
        /// Maximum allowed file size in bytes.
        max_bytes: u64,
        /// Actual file size in bytes.
        size_bytes: u64,
    },

    /// A qualified-path filter has invalid syntax.
    #[error("invalid filter `{filter}`: {reason}")]
    InvalidFilter {
        /// The filter string as supplied on the command line.
        filter: String,
        /// Description of the syntax problem.
        reason: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// The generation/validation oracle failed.
    #[error(transparent)]
    Oracle(
        /// The wrapped oracle error.
        #[from]
        OracleError,
    ),

    /// Tree-sitter failed to parse a source file.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// An edit's span no longer matches the original text.
    #[error("rewrite conflict in {}: {reason}", file.display())]
    RewriteConflict {
        /// File whose rewrite was abandoned.
        file: PathBuf,
        /// Description of the mismatch.
        reason: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// No tree-sitter grammar registered for this file extension.
    #[error("no grammar for extension: .{ext}")]
    UnsupportedLanguage {
        /// File extension without the leading dot.
        ext: String,
    },
}

/// Failures from the Ollama generation/validation service. Wrapped into
/// `Error::Oracle` at the engine boundary; per-unit failures are retried
/// within the attempts budget before surfacing.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// Every attempt in the budget failed.
    #[error("oracle gave no usable reply after {attempts} attempt(s): {last}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Message from the final failed attempt.
        last: String,
    },

    /// The server replied, but not with anything usable.
    #[error("malformed oracle reply: {reason}")]
    MalformedReply {
        /// Description of what was wrong with the reply.
        reason: String,
    },

    /// The configured model is absent from the Ollama server.
    #[error("model `{model}` is not installed on the Ollama server")]
    ModelNotInstalled {
        /// Model name as configured.
        model: String,
    },

    /// Non-success HTTP status from the server.
    #[error("ollama returned HTTP {status} for {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request URL.
        url: String,
    },

    /// Network-level failure reaching the server.
    #[error("cannot reach ollama at {url}: {source}")]
    Transport {
        /// The wrapped transport error.
        #[source]
        source: reqwest::Error,
        /// Request URL.
        url: String,
    },
}
