use tracing::{info, warn};

use crate::backend::GraphicsBackend;
use crate::driver::{
    DriverStatus, FrameDriver, FrameHandle, FrameHost, FrameOutcome, RenderSession,
    UniformBindings,
};
use crate::error::RenderError;
use crate::program::build_program;
use crate::quad::upload_quad;
use crate::runtime::BoxedTimeSource;

/// Owns a backend and renders one fragment shader at a time over a full-surface quad.
///
/// Loading a new fragment always stops the previous loop first, so there is
/// never more than one scheduled frame and only the newest program is drawn.
pub struct ShaderCanvas<B: GraphicsBackend> {
    backend: B,
    driver: FrameDriver<B>,
    source: Option<String>,
}

impl<B: GraphicsBackend> ShaderCanvas<B> {
    pub fn new(backend: B, clock: BoxedTimeSource) -> Self {
        Self {
            backend,
            driver: FrameDriver::new(clock),
            source: None,
        }
    }

    /// Compiles, links and starts rendering `fragment_source`.
    ///
    /// On failure the canvas is left stopped with nothing scheduled; the
    /// previous program is not resurrected.
    pub fn load_fragment(
        &mut self,
        fragment_source: &str,
        host: &mut impl FrameHost,
    ) -> Result<(), RenderError> {
        self.driver.stop(&mut self.backend, host);
        self.source = None;

        let program = build_program(&mut self.backend, fragment_source)?;
        let uniforms = UniformBindings::resolve(&self.backend, program.raw());
        let geometry = upload_quad(&mut self.backend);
        self.driver.start(
            &mut self.backend,
            RenderSession::new(program, geometry, uniforms),
            host,
        );
        self.source = Some(fragment_source.to_string());
        info!(chars = fragment_source.len(), "shader loaded");
        Ok(())
    }

    pub fn on_frame(&mut self, handle: FrameHandle, host: &mut impl FrameHost) -> FrameOutcome {
        let outcome = self.driver.on_frame(handle, &mut self.backend, host);
        if let FrameOutcome::Stopped(err) = &outcome {
            warn!(error = %err, "render loop halted");
            self.source = None;
        }
        outcome
    }

    /// Stops the loop and frees every GPU resource the canvas holds.
    pub fn teardown(&mut self, host: &mut impl FrameHost) {
        if self.driver.stop(&mut self.backend, host) {
            info!("shader canvas torn down");
        }
        self.source = None;
    }

    pub fn status(&self) -> DriverStatus {
        self.driver.status()
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.driver.pending_frame()
    }

    /// Source of the fragment currently on screen.
    pub fn fragment_source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ShaderStage;
    use crate::error::FrameError;
    use crate::testing::{Call, FakeBackend, FakeHost, ManualClock};

    const RED: &str = "void main(){gl_FragColor=vec4(1,0,0,1);}";
    const BLUE: &str = "void main(){gl_FragColor=vec4(0,0,1,1);}";
    const PULSE: &str = "precision mediump float;\nuniform float u_time;\nvoid main(){gl_FragColor=vec4(sin(u_time));}";

    fn canvas() -> (ShaderCanvas<FakeBackend>, ManualClock) {
        let clock = ManualClock::default();
        let canvas = ShaderCanvas::new(FakeBackend::new(), Box::new(clock.clone()));
        (canvas, clock)
    }

    fn pump(canvas: &mut ShaderCanvas<FakeBackend>, host: &mut FakeHost, frames: usize) {
        for _ in 0..frames {
            let handle = host.fire().expect("frame scheduled");
            canvas.on_frame(handle, host);
        }
    }

    #[test]
    fn red_shader_renders_every_frame() {
        let (mut canvas, _) = canvas();
        let mut host = FakeHost::default();
        canvas.load_fragment(RED, &mut host).expect("red compiles");
        assert_eq!(canvas.status(), DriverStatus::Running);
        assert_eq!(canvas.fragment_source(), Some(RED));

        pump(&mut canvas, &mut host, 3);
        assert_eq!(canvas.backend().draw_count(), 3);
        assert_eq!(host.outstanding.len(), 1);
    }

    #[test]
    fn time_uniform_tracks_the_clock() {
        let (mut canvas, clock) = canvas();
        let mut host = FakeHost::default();
        canvas.load_fragment(PULSE, &mut host).unwrap();

        for seconds in [0.0, 0.5, 1.0] {
            clock.set(seconds);
            pump(&mut canvas, &mut host, 1);
        }
        let times: Vec<f32> = canvas
            .backend()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::UniformF32(_, value) => Some(*value),
                _ => None,
            })
            .collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn rebuild_leaves_a_single_loop_drawing_the_new_program() {
        let (mut canvas, _) = canvas();
        let mut host = FakeHost::default();
        canvas.load_fragment(RED, &mut host).unwrap();
        pump(&mut canvas, &mut host, 2);
        let stale = canvas.pending_frame().unwrap();

        canvas.load_fragment(BLUE, &mut host).unwrap();
        assert_eq!(host.outstanding.len(), 1, "exactly one scheduled frame");
        assert!(host.cancelled.contains(&stale));

        let blue = *canvas.backend().linked_programs().last().unwrap();
        let mark = canvas.backend().calls.len();
        assert_eq!(
            canvas.on_frame(stale, &mut host),
            FrameOutcome::Ignored,
            "cancelled handle from the first loop"
        );
        pump(&mut canvas, &mut host, 4);
        let bound = canvas.backend().programs_bound_since(mark);
        assert_eq!(bound.len(), 4);
        assert!(bound.iter().all(|id| *id == blue));

        assert_eq!(canvas.backend().live_programs.len(), 1);
        assert_eq!(canvas.backend().live_buffers.len(), 1);
        assert_eq!(canvas.backend().live_shaders.len(), 2);
    }

    #[test]
    fn syntax_error_leaves_canvas_stopped() {
        let (mut canvas, _) = canvas();
        let mut host = FakeHost::default();
        canvas.load_fragment(RED, &mut host).unwrap();
        pump(&mut canvas, &mut host, 1);
        let draws = canvas.backend().draw_count();

        let err = canvas
            .load_fragment("void main() { gl_FragColor = vec4(1.0 }", &mut host)
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::ShaderCompile {
                stage: ShaderStage::Fragment,
                ..
            }
        ));
        assert_eq!(canvas.status(), DriverStatus::Stopped);
        assert_eq!(canvas.fragment_source(), None);
        assert!(host.outstanding.is_empty());
        assert_eq!(canvas.backend().draw_count(), draws);
        assert!(canvas.backend().live_programs.is_empty());
        assert!(canvas.backend().live_shaders.is_empty());
    }

    #[test]
    fn shader_without_main_is_a_compile_error() {
        let (mut canvas, _) = canvas();
        let mut host = FakeHost::default();
        let err = canvas
            .load_fragment("Here is a shader that makes the screen red.", &mut host)
            .unwrap_err();
        assert!(matches!(err, RenderError::ShaderCompile { .. }));
        assert!(canvas.backend().linked_programs().is_empty());
    }

    #[test]
    fn context_loss_halts_rendering() {
        let (mut canvas, _) = canvas();
        canvas.backend_mut().lose_context_after = Some(1);
        let mut host = FakeHost::default();
        canvas.load_fragment(RED, &mut host).unwrap();

        pump(&mut canvas, &mut host, 1);
        let handle = host.fire().unwrap();
        assert!(matches!(
            canvas.on_frame(handle, &mut host),
            FrameOutcome::Stopped(FrameError::ContextLost { .. })
        ));
        assert_eq!(canvas.status(), DriverStatus::Stopped);
        assert!(host.fire().is_none());
        assert_eq!(canvas.fragment_source(), None);
    }

    #[test]
    fn teardown_cancels_loop_and_frees_resources() {
        let (mut canvas, _) = canvas();
        let mut host = FakeHost::default();
        canvas.load_fragment(RED, &mut host).unwrap();
        let pending = canvas.pending_frame().unwrap();

        canvas.teardown(&mut host);
        assert_eq!(canvas.status(), DriverStatus::Stopped);
        assert!(host.outstanding.is_empty());
        assert_eq!(host.cancelled, vec![pending]);
        assert_eq!(canvas.on_frame(pending, &mut host), FrameOutcome::Ignored);
        assert!(canvas.backend().live_programs.is_empty());
        assert!(canvas.backend().live_buffers.is_empty());
        assert!(canvas.backend().live_shaders.is_empty());

        canvas.teardown(&mut host);
    }
}
