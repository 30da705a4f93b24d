//! Prompt-to-GLSL plumbing.
//!
//! A free-text prompt travels to a remote generation service through
//! [`PromptClient`]; the reply is unwrapped by [`extract_glsl_code`] and handed
//! back by [`PromptPipeline`], which also keeps a single request in flight at
//! a time. Compiling the result is the renderer's business, so nothing here
//! knows about GPUs.

mod client;
mod extract;
mod pipeline;

pub use client::{PromptClient, PromptConfig, ShaderGenerator, DEFAULT_ENDPOINT};
pub use extract::{declares_entry_point, extract_glsl_code};
pub use pipeline::{GeneratedShader, PromptPipeline};

/// Failures surfaced while turning a prompt into shader source.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// The service answered with an explicit error or a non-success status.
    #[error("{message}")]
    Remote { message: String },
    #[error("backend error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response from generation service: {reason}")]
    MalformedResponse { reason: String },
    #[error("invalid generation endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("a shader generation is already in progress")]
    Busy,
    #[error("generated text does not declare a `void main` entry point")]
    NotShaderCode,
}

impl PromptError {
    /// True for errors that originate from the remote service or the network.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Remote { .. } | Self::Transport(_) | Self::MalformedResponse { .. }
        )
    }
}
