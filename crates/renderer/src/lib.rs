//! Shader canvas for promptshade.
//!
//! A fragment shader is compiled against a fixed pass-through vertex stage,
//! linked, and drawn over a full-surface quad once per display refresh with
//! `u_time` and `u_resolution` supplied each frame:
//!
//! ```text
//!   WindowRuntime::load_shader ──▶ ShaderCanvas::load_fragment
//!                                     │ stop previous loop, build program
//!                                     ▼
//!   RedrawRequested ──▶ FrameDriver::on_frame ──▶ GraphicsBackend (wgpu)
//!          ▲                          │
//!          └──── request_frame ◀──────┘
//! ```
//!
//! The canvas and driver only talk to [`GraphicsBackend`], so the whole
//! build/draw sequence is testable without a GPU. [`WgpuBackend`] wraps the
//! WebGL-flavoured fragment source into Vulkan-style GLSL before handing it to
//! `wgpu`.

mod backend;
mod canvas;
mod compile;
mod driver;
mod error;
mod gpu;
mod program;
mod quad;
mod runtime;
mod types;
mod window;

#[cfg(test)]
mod testing;

pub use backend::{GraphicsBackend, ShaderStage, UniformLocation, RESOLUTION_UNIFORM, TIME_UNIFORM};
pub use canvas::ShaderCanvas;
pub use driver::{
    DriverStatus, FrameDriver, FrameHandle, FrameHost, FrameOutcome, RenderSession,
    UniformBindings, CLEAR_COLOR,
};
pub use error::{FrameError, RenderError};
pub use gpu::{WgpuBackend, WgpuBuffer, WgpuProgram, WgpuShader};
pub use program::{build_program, Program, VERTEX_SHADER_SOURCE};
pub use quad::{upload_quad, QUAD_VERTEX_COUNT, QUAD_VERTICES};
pub use runtime::{BoxedTimeSource, SystemTimeSource, TimeSample, TimeSource};
pub use types::{RendererConfig, DEFAULT_SURFACE_SIZE};
pub use window::{WindowRuntime, WindowSignal};
