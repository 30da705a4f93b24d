use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::{error, info};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::window::{Window, WindowBuilder};

use crate::canvas::ShaderCanvas;
use crate::driver::{FrameHandle, FrameHost, FrameOutcome};
use crate::error::RenderError;
use crate::gpu::WgpuBackend;
use crate::runtime::SystemTimeSource;
use crate::types::RendererConfig;

#[derive(Debug)]
enum WindowCommand {
    Load {
        source: String,
        reply: Sender<Result<(), RenderError>>,
    },
    Shutdown,
}

/// Notifications sent from the window thread to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowSignal {
    /// The render loop halted after a frame failure; the window stays open.
    LoopStopped { reason: String },
    /// The user closed the window.
    Closed,
}

/// Schedules frames as winit redraw requests.
///
/// winit coalesces redraw requests, so at most one handle is outstanding.
struct WindowFrameHost {
    window: Arc<Window>,
    next: u64,
    scheduled: Option<FrameHandle>,
}

impl WindowFrameHost {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            next: 0,
            scheduled: None,
        }
    }
}

impl FrameHost for WindowFrameHost {
    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        let handle = FrameHandle::new(self.next);
        self.scheduled = Some(handle);
        self.window.request_redraw();
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.scheduled == Some(handle) {
            self.scheduled = None;
        }
    }
}

/// Preview window running its event loop on a dedicated thread.
pub struct WindowRuntime {
    proxy: EventLoopProxy<WindowCommand>,
    signals: Receiver<WindowSignal>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl WindowRuntime {
    /// Opens the window and its graphics context; blocks until both are ready.
    pub fn spawn(config: RendererConfig) -> Result<Self, RenderError> {
        let (ready_tx, ready_rx) = bounded(1);
        let (signal_tx, signal_rx) = unbounded();
        let handle = thread::Builder::new()
            .name("promptshade-window".into())
            .spawn(move || run_window_thread(config, ready_tx, signal_tx))
            .map_err(|err| {
                RenderError::ContextUnavailable(format!("failed to spawn window thread: {err}"))
            })?;

        let proxy = ready_rx.recv().map_err(|err| {
            RenderError::ContextUnavailable(format!("window thread failed to initialise: {err}"))
        })??;

        Ok(Self {
            proxy,
            signals: signal_rx,
            join_handle: Some(handle),
        })
    }

    /// Replaces whatever is on screen with `source` and waits for the result.
    pub fn load_shader(&self, source: &str) -> Result<(), RenderError> {
        let (reply, response) = bounded(1);
        self.proxy
            .send_event(WindowCommand::Load {
                source: source.to_string(),
                reply,
            })
            .map_err(|_| RenderError::ContextUnavailable("window is closed".to_string()))?;
        response
            .recv()
            .map_err(|_| RenderError::ContextUnavailable("window is closed".to_string()))?
    }

    pub fn signals(&self) -> &Receiver<WindowSignal> {
        &self.signals
    }

    pub fn shutdown(mut self) -> Result<()> {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            handle
                .join()
                .map_err(|err| anyhow!("window thread panicked: {err:?}"))??;
        }
        Ok(())
    }
}

impl Drop for WindowRuntime {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            let _ = handle.join();
        }
    }
}

fn run_window_thread(
    config: RendererConfig,
    ready_tx: Sender<Result<EventLoopProxy<WindowCommand>, RenderError>>,
    signal_tx: Sender<WindowSignal>,
) -> Result<()> {
    let mut builder = EventLoopBuilder::<WindowCommand>::with_user_event();
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;
        EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }
    #[cfg(target_os = "windows")]
    {
        use winit::platform::windows::EventLoopBuilderExtWindows;
        EventLoopBuilderExtWindows::with_any_thread(&mut builder, true);
    }

    let event_loop = match builder.build() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            let message = format!("failed to create event loop: {err}");
            let _ = ready_tx.send(Err(RenderError::ContextUnavailable(message.clone())));
            return Err(anyhow!(message));
        }
    };
    let proxy = event_loop.create_proxy();

    let (width, height) = config.surface_size;
    let window = match WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(width, height))
        .with_visible(config.show_window)
        .build(&event_loop)
    {
        Ok(window) => Arc::new(window),
        Err(err) => {
            let message = format!("failed to create preview window: {err}");
            let _ = ready_tx.send(Err(RenderError::ContextUnavailable(message.clone())));
            return Err(anyhow!(message));
        }
    };

    let backend = match WgpuBackend::new(window.clone()) {
        Ok(backend) => backend,
        Err(err) => {
            let message = err.to_string();
            let _ = ready_tx.send(Err(err));
            return Err(anyhow!(message));
        }
    };
    let mut canvas = ShaderCanvas::new(backend, Box::new(SystemTimeSource::new()));
    let mut host = WindowFrameHost::new(window.clone());

    let _ = ready_tx.send(Ok(proxy));
    info!(width, height, "preview window ready");

    let run_result = event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Wait);
        match event {
            Event::UserEvent(command) => match command {
                WindowCommand::Load { source, reply } => {
                    let result = canvas.load_fragment(&source, &mut host);
                    if let Err(err) = &result {
                        error!("failed to load shader: {err}");
                    }
                    let _ = reply.send(result);
                }
                WindowCommand::Shutdown => {
                    canvas.teardown(&mut host);
                    elwt.exit();
                }
            },
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    canvas.teardown(&mut host);
                    let _ = signal_tx.send(WindowSignal::Closed);
                    elwt.exit();
                }
                WindowEvent::Resized(new_size) => {
                    canvas.backend_mut().resize(new_size);
                }
                WindowEvent::RedrawRequested => {
                    let Some(handle) = host.scheduled.take() else {
                        return;
                    };
                    if let FrameOutcome::Stopped(err) = canvas.on_frame(handle, &mut host) {
                        let _ = signal_tx.send(WindowSignal::LoopStopped {
                            reason: err.to_string(),
                        });
                    }
                }
                _ => {}
            },
            _ => {}
        }
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
