use tracing::{debug, warn};

use crate::backend::{GraphicsBackend, ShaderStage};
use crate::error::RenderError;

/// Fixed vertex stage: passes the quad's clip-space corners straight through.
pub const VERTEX_SHADER_SOURCE: &str = r"#version 450
layout(location = 0) in vec2 a_position;

void main() {
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

/// A linked program together with the two shader objects it owns.
pub struct Program<B: GraphicsBackend> {
    raw: B::Program,
    vertex: B::Shader,
    fragment: B::Shader,
}

impl<B: GraphicsBackend> Program<B> {
    pub fn raw(&self) -> &B::Program {
        &self.raw
    }

    /// Returns the program and both shader objects to the backend.
    pub fn release(self, backend: &mut B) {
        backend.release_program(self.raw);
        backend.release_shader(self.vertex);
        backend.release_shader(self.fragment);
    }
}

/// Compiles the fixed vertex stage and `fragment_source`, then links them.
///
/// Any shader object created before a failure is released before the error
/// is returned.
pub fn build_program<B: GraphicsBackend>(
    backend: &mut B,
    fragment_source: &str,
) -> Result<Program<B>, RenderError> {
    let vertex = compile_stage(backend, ShaderStage::Vertex, VERTEX_SHADER_SOURCE)?;
    let fragment = match compile_stage(backend, ShaderStage::Fragment, fragment_source) {
        Ok(fragment) => fragment,
        Err(err) => {
            backend.release_shader(vertex);
            return Err(err);
        }
    };

    match backend.link_program(&vertex, &fragment) {
        Ok(raw) => {
            debug!(chars = fragment_source.len(), "linked shader program");
            Ok(Program {
                raw,
                vertex,
                fragment,
            })
        }
        Err(diagnostic) => {
            warn!(%diagnostic, "shader program failed to link");
            backend.release_shader(vertex);
            backend.release_shader(fragment);
            Err(RenderError::ProgramLink { diagnostic })
        }
    }
}

fn compile_stage<B: GraphicsBackend>(
    backend: &mut B,
    stage: ShaderStage,
    source: &str,
) -> Result<B::Shader, RenderError> {
    backend.compile_shader(stage, source).map_err(|diagnostic| {
        warn!(%stage, %diagnostic, "shader failed to compile");
        RenderError::ShaderCompile { stage, diagnostic }
    })
}
