use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::PromptError;

/// Generation service used when no endpoint is configured.
pub const DEFAULT_ENDPOINT: &str = "https://backend-cold-snowflake-4736.fly.dev/api/shader";

/// Source of raw generated text for a prompt.
///
/// Implementations return the service's `shader` payload untouched; fence
/// extraction happens in [`crate::PromptPipeline`].
pub trait ShaderGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, PromptError>;
}

#[derive(Debug, Clone)]
pub struct PromptConfig {
    pub endpoint: Url,
    /// Whole-request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl PromptConfig {
    pub fn new(endpoint: &str) -> Result<Self, PromptError> {
        let trimmed = endpoint.trim();
        let url = Url::parse(trimmed).map_err(|err| PromptError::InvalidEndpoint {
            endpoint: trimmed.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PromptError::InvalidEndpoint {
                endpoint: trimmed.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Ok(Self {
            endpoint: url,
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct PromptClient {
    http: Client,
    config: PromptConfig,
}

impl PromptClient {
    pub fn new(config: PromptConfig) -> Result<Self, PromptError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, config })
    }

    pub fn endpoint(&self) -> &Url {
        &self.config.endpoint
    }

    /// POSTs `{ "prompt": ... }` and returns the `shader` field of the reply.
    pub fn request_shader(&self, prompt: &str) -> Result<String, PromptError> {
        let url = self.config.endpoint.clone();
        debug!(%url, chars = prompt.len(), "requesting generated shader");
        let response = self
            .http
            .post(url)
            .json(&GenerateRequest { prompt })
            .send()?;
        let status = response.status();
        let body = response.text()?;
        debug!(%status, bytes = body.len(), "generation service responded");
        decode_response(status, &body)
    }
}

impl ShaderGenerator for PromptClient {
    fn generate(&self, prompt: &str) -> Result<String, PromptError> {
        self.request_shader(prompt)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    shader: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Maps a service reply onto shader text or a typed error.
///
/// A non-empty `error` field takes precedence over everything else, including
/// a `shader` field in the same body.
fn decode_response(status: StatusCode, body: &str) -> Result<String, PromptError> {
    let parsed = serde_json::from_str::<GenerateResponse>(body);
    match parsed {
        Ok(GenerateResponse {
            error: Some(message),
            ..
        }) if !message.is_empty() => Err(PromptError::Remote { message }),
        _ if !status.is_success() => Err(PromptError::Remote {
            message: format!("generation service responded with {status}"),
        }),
        Ok(GenerateResponse {
            shader: Some(shader),
            ..
        }) => Ok(shader),
        Ok(_) => Err(PromptError::MalformedResponse {
            reason: "response contains neither 'shader' nor 'error'".to_string(),
        }),
        Err(err) => {
            let snippet = body.chars().take(200).collect::<String>();
            Err(PromptError::MalformedResponse {
                reason: format!("{err}; first 200 bytes: {snippet}"),
            })
        }
    }
}
