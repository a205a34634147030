//! The generation/validation oracle: a trait for the two questions the
//! engine asks, an implementation backed by a local Ollama server, and the
//! bounded retry loop wrapped around every call.

use crate::error::OracleError;
use crate::prompts;
use crate::types::Verdict;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Replies quoted in error messages are clipped to this many characters.
const SNIPPET_LEN: usize = 120;

/// Body of a `POST /api/generate` request.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    /// Model to prompt.
    model: &'a str,
    /// Full prompt text.
    prompt: &'a str,
    /// Always false; the reply arrives as a single JSON object.
    stream: bool,
}

/// Body of a `POST /api/generate` reply.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    /// The model's text reply.
    response: String,
}

/// One installed model in a `GET /api/tags` reply.
#[derive(Debug, Deserialize)]
struct ModelEntry {
    /// Full model name, e.g. `llama3:latest`.
    name: String,
}

/// Oracle backed by an Ollama server's HTTP API.
pub struct OllamaOracle {
    /// Blocking HTTP client, reused across calls.
    client: reqwest::blocking::Client,
    /// Hostname of the Ollama server.
    host: String,
    /// Model name sent with every generate call.
    model: String,
    /// TCP port of the Ollama server.
    port: u16,
}

impl OllamaOracle {
    /// Build a client for the server at `http://{host}:{port}`. The default
    /// request timeout is disabled: local model generation routinely takes
    /// longer than any reasonable fixed limit.
    pub fn new(host: &str, port: u16, model: &str) -> Result<Self, OracleError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|source| {
                return OracleError::Transport {
                    source,
                    url: format!("http://{host}:{port}"),
                };
            })?;
        return Ok(Self {
            client,
            host: host.to_string(),
            model: model.to_string(),
            port,
        });
    }

    /// Root URL of the configured server.
    fn base_url(&self) -> String {
        return format!("http://{}:{}", self.host, self.port);
    }

    /// Fail with `ModelNotInstalled` unless the configured model is present
    /// on the server. Matching is by colon-separated prefix, so a configured
    /// `llama3` accepts an installed `llama3:latest`.
    fn ensure_model_installed(&self) -> Result<(), OracleError> {
        let installed = self.get_models()?;
        if installed
            .iter()
            .any(|name| return model_matches(&self.model, name))
        {
            return Ok(());
        }
        return Err(OracleError::ModelNotInstalled {
            model: self.model.clone(),
        });
    }

    /// List the models installed on the server, in the server's order.
    pub fn get_models(&self) -> Result<Vec<String>, OracleError> {
        let url = format!("{}/api/tags", self.base_url());
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|source| return OracleError::Transport { source, url: url.clone() })?;
        let parsed: TagsResponse = decode(response, &url)?;
        return Ok(parsed.models.into_iter().map(|m| return m.name).collect());
    }

    /// Ask the server to pull `name` from its registry. Blocks until the
    /// pull completes or fails.
    pub fn install_model(&self, name: &str) -> Result<(), OracleError> {
        let url = format!("{}/api/pull", self.base_url());
        let request = PullRequest {
            name,
            stream: false,
        };
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|source| return OracleError::Transport { source, url: url.clone() })?;
        let parsed: PullResponse = decode(response, &url)?;
        if parsed.status != "success" {
            return Err(OracleError::MalformedReply {
                reason: format!("pull of `{name}` did not succeed: {}", parsed.status),
            });
        }
        return Ok(());
    }

    /// Send one prompt and return the model's raw text reply. Probes for
    /// the configured model first so a missing model fails with its own
    /// error instead of a generation failure.
    fn prompt_model(&self, prompt: &str) -> Result<String, OracleError> {
        self.ensure_model_installed()?;
        let url = format!("{}/api/generate", self.base_url());
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|source| return OracleError::Transport { source, url: url.clone() })?;
        let parsed: GenerateResponse = decode(response, &url)?;
        return Ok(parsed.response);
    }
}

impl Oracle for OllamaOracle {
    fn generate(&self, unit_source: &str, prior: Option<&str>) -> Result<String, OracleError> {
        let prompt = prompts::generation_prompt(unit_source, prior.is_some());
        let reply = self.prompt_model(&prompt)?;
        return prompts::sanitize_generated(&reply).ok_or_else(|| {
            return OracleError::MalformedReply {
                reason: format!(
                    "reply is empty or still contains a delimiter: {}",
                    snippet(&reply)
                ),
            };
        });
    }

    fn validate(&self, unit_source: &str, docstring: &str) -> Result<Verdict, OracleError> {
        debug!("existing docstring: {docstring}");
        let prompt = prompts::validation_prompt(unit_source);
        let reply = self.prompt_model(&prompt)?;
        return parse_verdict(&reply);
    }
}

/// The two questions the engine asks of the outside world. One
/// implementation speaks to Ollama; tests script their own.
pub trait Oracle {
    /// Produce docstring text for one unit. `prior` carries the existing
    /// docstring when the unit is being re-documented; the unit source
    /// already contains it.
    fn generate(&self, unit_source: &str, prior: Option<&str>) -> Result<String, OracleError>;

    /// Judge the docstring embedded in `unit_source` against the code.
    fn validate(&self, unit_source: &str, docstring: &str) -> Result<Verdict, OracleError>;
}

/// Body of a `POST /api/pull` request.
#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    /// Model name to pull.
    name: &'a str,
    /// Always false; progress streaming is not consumed.
    stream: bool,
}

/// Body of a `POST /api/pull` reply.
#[derive(Debug, Deserialize)]
struct PullResponse {
    /// `success` when the pull completed.
    status: String,
}

/// Body of a `GET /api/tags` reply.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    /// Installed models.
    models: Vec<ModelEntry>,
}

/// Run `call` up to `attempts` times, returning the first success. A
/// missing model is not retried; nothing about repeating the call can fix
/// it. Exhausting the budget reports the final failure.
pub fn call_with_attempts<T>(
    attempts: u32,
    mut call: impl FnMut() -> Result<T, OracleError>,
) -> Result<T, OracleError> {
    let budget = attempts.max(1);
    let mut last = String::new();
    for attempt in 1..=budget {
        match call() {
            Ok(value) => return Ok(value),
            Err(OracleError::ModelNotInstalled { model }) => {
                return Err(OracleError::ModelNotInstalled { model });
            }
            Err(err) => {
                debug!("attempt {attempt}/{budget} failed: {err}");
                last = err.to_string();
            }
        }
    }
    return Err(OracleError::Exhausted {
        attempts: budget,
        last,
    });
}

/// Check the HTTP status and decode a JSON body, quoting a snippet of the
/// body when it is not the expected shape.
fn decode<T: DeserializeOwned>(
    response: reqwest::blocking::Response,
    url: &str,
) -> Result<T, OracleError> {
    let status = response.status();
    if !status.is_success() {
        return Err(OracleError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    let body = response.text().map_err(|err| {
        return OracleError::MalformedReply {
            reason: format!("unreadable reply from {url}: {err}"),
        };
    })?;
    return serde_json::from_str(&body).map_err(|err| {
        return OracleError::MalformedReply {
            reason: format!("invalid JSON from {url}: {err}: {}", snippet(&body)),
        };
    });
}

/// True when the configured model name matches an installed one by
/// colon-separated prefix: `llama3` matches `llama3:latest`, but
/// `llama3:latest` does not match a bare `llama3`.
fn model_matches(target: &str, installed: &str) -> bool {
    let target_parts: Vec<&str> = target.split(':').collect();
    let installed_parts: Vec<&str> = installed.split(':').collect();
    if target_parts.len() > installed_parts.len() {
        return false;
    }
    return target_parts
        .iter()
        .zip(installed_parts.iter())
        .all(|(a, b)| return a == b);
}

/// Parse the validation reply protocol: `correct`, or `incorrect:` followed
/// by an explanation. Anything else is malformed and the attempt is retried.
fn parse_verdict(reply: &str) -> Result<Verdict, OracleError> {
    let trimmed = reply.trim();
    let lowered = trimmed.to_lowercase();
    if lowered.starts_with("correct") {
        return Ok(Verdict::Valid {
            assessment: trimmed.to_string(),
        });
    }
    if lowered.starts_with("incorrect") {
        let assessment = trimmed
            .split_once(':')
            .map_or(trimmed, |(_, rest)| return rest.trim())
            .to_string();
        return Ok(Verdict::Invalid { assessment });
    }
    return Err(OracleError::MalformedReply {
        reason: format!("expected `correct` or `incorrect: ...`, got: {}", snippet(trimmed)),
    });
}

/// Clip a reply for quoting in an error message.
fn snippet(reply: &str) -> String {
    let trimmed = reply.trim();
    if trimmed.chars().count() <= SNIPPET_LEN {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(SNIPPET_LEN).collect();
    return format!("{head}...");
}
