use std::path::Path;

use crate::error::Error;

/// Oracle defaults loaded from `.docsmith.toml`. Every value is optional;
/// the CLI layer resolves flag > config file > built-in default.
pub struct Config {
    /// Default attempts budget.
    pub attempts: Option<u32>,
    /// Default Ollama host.
    pub host: Option<String>,
    /// Default model name.
    pub model: Option<String>,
    /// Default Ollama port.
    pub port: Option<u16>,
}

/// Raw TOML structure for `.docsmith.toml`.
#[derive(serde::Deserialize)]
struct DocsmithTomlConfig {
    /// The `[oracle]` table.
    #[serde(default)]
    oracle: OracleDefaults,
}

/// Contents of the `[oracle]` table.
#[derive(Default, serde::Deserialize)]
struct OracleDefaults {
    /// Default attempts budget.
    attempts: Option<u32>,
    /// Default Ollama host.
    host: Option<String>,
    /// Default model name.
    model: Option<String>,
    /// Default Ollama port.
    port: Option<u16>,
}

impl Config {
    /// Load config from `.docsmith.toml` in the given root directory.
    /// Returns an empty config if the file doesn't exist.
    /// Returns an error if the file exists but is malformed; it never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(".docsmith.toml");
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::no_overrides()),
            Err(e) => return Err(Error::Io(e)),
        };

        let raw: DocsmithTomlConfig = toml::from_str(&content)?;
        Ok(Self {
            attempts: raw.oracle.attempts,
            host: raw.oracle.host,
            model: raw.oracle.model,
            port: raw.oracle.port,
        })
    }

    /// Config with nothing set, so every value falls through to the built-in default.
    fn no_overrides() -> Self {
        Self {
            attempts: None,
            host: None,
            model: None,
            port: None,
        }
    }
}
