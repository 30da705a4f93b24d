use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use renderer::DEFAULT_SURFACE_SIZE;
use serde::Deserialize;
use shaderprompt::DEFAULT_ENDPOINT;

use crate::cli::ShaderArgs;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Optional `config.toml` in the config directory.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
    pub require_main: Option<bool>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl FileConfig {
    /// Reads the file at `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }
}

/// Effective settings for the `shader` command: flags, then file, then defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSettings {
    pub endpoint: String,
    pub timeout: Option<Duration>,
    pub require_main: bool,
    pub surface_size: (u32, u32),
}

impl ShaderSettings {
    pub fn resolve(args: &ShaderArgs, file: &FileConfig) -> Self {
        let endpoint = args
            .endpoint
            .clone()
            .or_else(|| file.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let timeout_secs = args
            .timeout
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));
        let require_main = args.require_main || file.require_main.unwrap_or(false);
        let surface_size = args.size.unwrap_or((
            file.width.unwrap_or(DEFAULT_SURFACE_SIZE.0),
            file.height.unwrap_or(DEFAULT_SURFACE_SIZE.1),
        ));
        Self {
            endpoint,
            timeout,
            require_main,
            surface_size,
        }
    }
}
