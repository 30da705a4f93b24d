//! `wgpu` implementation of the graphics backend.
//!
//! - `context` owns instance/device/surface wiring and reconfigures the
//!   swapchain when the window resizes.
//! - `uniforms` mirrors the injected `PromptshadeFrame` block.
//! - `backend` maps compile/link/draw calls onto shader modules, render
//!   pipelines and one render pass per frame.

mod backend;
mod context;
mod uniforms;

pub use backend::{WgpuBackend, WgpuBuffer, WgpuProgram, WgpuShader};
