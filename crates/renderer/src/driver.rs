//! Per-frame render loop modelled as an explicit `Stopped`/`Running` machine.
//!
//! The host (a window's redraw callback, a browser's animation frame, a test)
//! hands out [`FrameHandle`]s. The driver keeps at most one outstanding handle
//! and ignores callbacks carrying any other, so cancelling a handle takes
//! effect before the next invocation without preempting a frame in progress.

use std::mem;

use tracing::{debug, error, info, trace};

use crate::backend::{
    GraphicsBackend, UniformLocation, RESOLUTION_UNIFORM, TIME_UNIFORM,
};
use crate::error::FrameError;
use crate::program::Program;
use crate::quad::QUAD_VERTEX_COUNT;
use crate::runtime::BoxedTimeSource;

/// Opaque black drawn under every frame.
pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Identifier of a scheduled next-frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Schedules frame callbacks once per display refresh.
pub trait FrameHost {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Uniform locations resolved once after linking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UniformBindings {
    pub time: Option<UniformLocation>,
    pub resolution: Option<UniformLocation>,
}

impl UniformBindings {
    pub fn resolve<B: GraphicsBackend>(backend: &B, program: &B::Program) -> Self {
        Self {
            time: backend.uniform_location(program, TIME_UNIFORM),
            resolution: backend.uniform_location(program, RESOLUTION_UNIFORM),
        }
    }
}

/// GPU resources owned by one running loop.
pub struct RenderSession<B: GraphicsBackend> {
    program: Program<B>,
    geometry: B::Buffer,
    uniforms: UniformBindings,
}

impl<B: GraphicsBackend> RenderSession<B> {
    pub fn new(program: Program<B>, geometry: B::Buffer, uniforms: UniformBindings) -> Self {
        Self {
            program,
            geometry,
            uniforms,
        }
    }

    pub fn uniforms(&self) -> UniformBindings {
        self.uniforms
    }

    fn release(self, backend: &mut B) {
        self.program.release(backend);
        backend.release_buffer(self.geometry);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    Stopped,
    Running,
}

/// What happened when a frame callback reached the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The quad was drawn and the next frame requested.
    Rendered,
    /// The handle was stale or the driver is stopped; nothing was drawn.
    Ignored,
    /// The frame failed and the session has been torn down.
    Stopped(FrameError),
}

enum DriverState<B: GraphicsBackend> {
    Stopped,
    Running {
        session: RenderSession<B>,
        pending: Option<FrameHandle>,
    },
}

pub struct FrameDriver<B: GraphicsBackend> {
    state: DriverState<B>,
    clock: BoxedTimeSource,
    frames: u64,
}

impl<B: GraphicsBackend> FrameDriver<B> {
    pub fn new(clock: BoxedTimeSource) -> Self {
        Self {
            state: DriverState::Stopped,
            clock,
            frames: 0,
        }
    }

    pub fn status(&self) -> DriverStatus {
        match self.state {
            DriverState::Stopped => DriverStatus::Stopped,
            DriverState::Running { .. } => DriverStatus::Running,
        }
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        match &self.state {
            DriverState::Running { pending, .. } => *pending,
            DriverState::Stopped => None,
        }
    }

    /// Frames drawn by the current (or last) session.
    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// Stopped → Running. Any running session is stopped first.
    pub fn start(&mut self, backend: &mut B, session: RenderSession<B>, host: &mut impl FrameHost) {
        self.stop(backend, host);
        self.clock.reset();
        self.frames = 0;
        let handle = host.request_frame();
        debug!(handle = handle.id(), uniforms = ?session.uniforms(), "frame driver running");
        self.state = DriverState::Running {
            session,
            pending: Some(handle),
        };
    }

    /// Running → Stopped: cancels the outstanding frame and frees the session.
    ///
    /// Returns `false` when the driver was already stopped.
    pub fn stop(&mut self, backend: &mut B, host: &mut impl FrameHost) -> bool {
        match mem::replace(&mut self.state, DriverState::Stopped) {
            DriverState::Running { session, pending } => {
                if let Some(handle) = pending {
                    host.cancel_frame(handle);
                }
                session.release(backend);
                info!(frames = self.frames, "frame driver stopped");
                true
            }
            DriverState::Stopped => false,
        }
    }

    /// Handles a frame callback from the host.
    pub fn on_frame(
        &mut self,
        handle: FrameHandle,
        backend: &mut B,
        host: &mut impl FrameHost,
    ) -> FrameOutcome {
        let DriverState::Running { session, pending } = &mut self.state else {
            trace!(handle = handle.id(), "frame callback while stopped");
            return FrameOutcome::Ignored;
        };
        if *pending != Some(handle) {
            trace!(handle = handle.id(), "stale frame callback");
            return FrameOutcome::Ignored;
        }
        *pending = None;

        let sample = self.clock.sample();
        match draw_frame(backend, session, sample.seconds) {
            Ok(()) => {
                self.frames += 1;
                *pending = Some(host.request_frame());
                FrameOutcome::Rendered
            }
            Err(err) => {
                error!(error = %err, frames = self.frames, "frame failed; stopping render loop");
                if let DriverState::Running { session, .. } =
                    mem::replace(&mut self.state, DriverState::Stopped)
                {
                    session.release(backend);
                }
                FrameOutcome::Stopped(err)
            }
        }
    }
}

fn draw_frame<B: GraphicsBackend>(
    backend: &mut B,
    session: &RenderSession<B>,
    seconds: f32,
) -> Result<(), FrameError> {
    let (width, height) = backend.surface_size();
    backend.viewport(width, height);
    backend.clear(CLEAR_COLOR);
    backend.use_program(session.program.raw());
    if let Some(location) = session.uniforms.time {
        backend.uniform_f32(location, seconds);
    }
    if let Some(location) = session.uniforms.resolution {
        backend.uniform_vec2(location, [width as f32, height as f32]);
    }
    backend.bind_vertex_buffer(&session.geometry);
    backend.draw_triangle_strip(QUAD_VERTEX_COUNT)
}
