use std::fmt;

use crate::error::FrameError;

/// Uniform carrying seconds elapsed since the render session started.
pub const TIME_UNIFORM: &str = "u_time";
/// Uniform carrying the viewport size in device pixels.
pub const RESOLUTION_UNIFORM: &str = "u_resolution";

/// Programmable pipeline stage a shader object belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Backend-specific handle to a uniform resolved after linking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// The slice of a real-time graphics API the shader canvas needs.
///
/// The shape follows the classic compile → link → bind → draw sequence so the
/// program builder and frame driver stay independent of the GPU library. All
/// calls happen on the thread that owns the backend.
pub trait GraphicsBackend {
    type Shader;
    type Program;
    type Buffer;

    /// Compiles one stage. On failure nothing stays allocated and the
    /// compiler's diagnostic text is returned.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<Self::Shader, String>;
    fn release_shader(&mut self, shader: Self::Shader);

    /// Links both stages into an executable program or returns the link log.
    fn link_program(
        &mut self,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> Result<Self::Program, String>;
    fn release_program(&mut self, program: Self::Program);

    /// Resolves a named uniform; `None` when the program does not expose it.
    fn uniform_location(&self, program: &Self::Program, name: &str) -> Option<UniformLocation>;

    fn create_vertex_buffer(&mut self, vertices: &[[f32; 2]]) -> Self::Buffer;
    fn release_buffer(&mut self, buffer: Self::Buffer);

    /// Current drawable size in device pixels.
    fn surface_size(&self) -> (u32, u32);
    fn viewport(&mut self, width: u32, height: u32);
    fn clear(&mut self, color: [f32; 4]);
    fn use_program(&mut self, program: &Self::Program);
    fn uniform_f32(&mut self, location: UniformLocation, value: f32);
    fn uniform_vec2(&mut self, location: UniformLocation, value: [f32; 2]);
    fn bind_vertex_buffer(&mut self, buffer: &Self::Buffer);
    fn draw_triangle_strip(&mut self, vertex_count: u32) -> Result<(), FrameError>;
}
