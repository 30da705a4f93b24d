use crate::backend::ShaderStage;

/// Failures that abort a program build.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("rendering context unavailable: {0}")]
    ContextUnavailable(String),
    #[error("{stage} shader failed to compile:\n{diagnostic}")]
    ShaderCompile {
        stage: ShaderStage,
        diagnostic: String,
    },
    #[error("shader program failed to link:\n{diagnostic}")]
    ProgramLink { diagnostic: String },
}

/// Failure inside a single frame. Always terminal for the render session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("graphics context lost: {reason}")]
    ContextLost { reason: String },
}
