use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::client::ShaderGenerator;
use crate::extract::{declares_entry_point, extract_glsl_code};
use crate::PromptError;

/// Output of a successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedShader {
    pub prompt: String,
    /// Text exactly as the service returned it.
    pub raw: String,
    /// Fragment source after fence extraction.
    pub code: String,
}

/// Prompt → cleaned fragment source, one request at a time.
pub struct PromptPipeline<G> {
    generator: G,
    busy: AtomicBool,
    require_entry_point: bool,
}

impl<G: ShaderGenerator> PromptPipeline<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            busy: AtomicBool::new(false),
            require_entry_point: false,
        }
    }

    /// Refuse extracted text that does not declare `void main(`.
    pub fn require_entry_point(mut self, enabled: bool) -> Self {
        self.require_entry_point = enabled;
        self
    }

    /// True while a submission is waiting on the generator.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Sends `prompt` to the generator and extracts the fragment source.
    ///
    /// Blank prompts never reach the generator. A call made while another is
    /// in flight fails with [`PromptError::Busy`] instead of queueing.
    pub fn submit(&self, prompt: &str) -> Result<GeneratedShader, PromptError> {
        if prompt.trim().is_empty() {
            return Err(PromptError::EmptyPrompt);
        }
        let _guard = BusyGuard::acquire(&self.busy).ok_or(PromptError::Busy)?;

        info!(prompt, "generating shader");
        let raw = self.generator.generate(prompt)?;
        let code = extract_glsl_code(&raw);
        if self.require_entry_point && !declares_entry_point(&code) {
            warn!(chars = code.len(), "generated text has no entry point; refusing to build");
            return Err(PromptError::NotShaderCode);
        }

        Ok(GeneratedShader {
            prompt: prompt.to_string(),
            raw,
            code,
        })
    }
}

struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
