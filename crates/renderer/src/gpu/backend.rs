use std::borrow::Cow;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::context::GpuContext;
use super::uniforms::FrameUniforms;
use crate::backend::{
    GraphicsBackend, ShaderStage, UniformLocation, RESOLUTION_UNIFORM, TIME_UNIFORM,
};
use crate::compile::prepare_source;
use crate::error::{FrameError, RenderError};

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

pub struct WgpuShader {
    module: wgpu::ShaderModule,
    uniforms: Vec<&'static str>,
}

pub struct WgpuProgram {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    uniforms: Vec<&'static str>,
}

pub struct WgpuBuffer {
    buffer: wgpu::Buffer,
}

/// Draw state accumulated between `viewport` and `draw_triangle_strip`.
#[derive(Default)]
struct PendingFrame {
    viewport: (u32, u32),
    clear: [f32; 4],
    program: Option<(wgpu::RenderPipeline, wgpu::BindGroup, wgpu::Buffer)>,
    vertices: Option<wgpu::Buffer>,
    uniforms: FrameUniforms,
}

/// [`GraphicsBackend`] over a `wgpu` surface attached to a winit window.
pub struct WgpuBackend {
    context: GpuContext,
    uniform_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    frame: PendingFrame,
    // Dropped after the surface that borrows its handles.
    _window: Arc<Window>,
}

impl WgpuBackend {
    pub fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let size = window.inner_size();
        let context = GpuContext::new(window.as_ref(), size)
            .map_err(|err| RenderError::ContextUnavailable(format!("{err:#}")))?;

        let uniform_layout =
            context
                .device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("frame uniform layout"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    }],
                });
        let pipeline_layout =
            context
                .device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("shader pipeline layout"),
                    bind_group_layouts: &[&uniform_layout],
                    push_constant_ranges: &[],
                });

        Ok(Self {
            context,
            uniform_layout,
            pipeline_layout,
            frame: PendingFrame::default(),
            _window: window,
        })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
    }

    fn with_validation<T>(&self, build: impl FnOnce(&wgpu::Device) -> T) -> Result<T, String> {
        self.context
            .device
            .push_error_scope(wgpu::ErrorFilter::Validation);
        let value = build(&self.context.device);
        match pollster::block_on(self.context.device.pop_error_scope()) {
            Some(err) => Err(err.to_string()),
            None => Ok(value),
        }
    }

    fn present(&mut self, vertex_count: u32) -> Result<(), FrameError> {
        if self.context.is_lost() {
            return Err(FrameError::ContextLost {
                reason: "GPU device lost".to_string(),
            });
        }
        let (Some((pipeline, bind_group, uniform_buffer)), Some(vertices)) =
            (self.frame.program.as_ref(), self.frame.vertices.as_ref())
        else {
            tracing::warn!("draw issued without a bound program and vertex buffer");
            return Ok(());
        };

        let frame = match self.context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Outdated) => {
                self.context.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::debug!("surface timeout; skipping frame");
                return Ok(());
            }
            Err(other) => {
                return Err(FrameError::ContextLost {
                    reason: format!("surface error: {other}"),
                });
            }
        };

        self.context
            .queue
            .write_buffer(uniform_buffer, 0, self.frame.uniforms.as_bytes());

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });
        {
            let [r, g, b, a] = self.frame.clear;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            let (width, height) = self.frame.viewport;
            let (surface_width, surface_height) = self.context.size();
            render_pass.set_viewport(
                0.0,
                0.0,
                width.min(surface_width) as f32,
                height.min(surface_height) as f32,
                0.0,
                1.0,
            );
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, bind_group, &[]);
            render_pass.set_vertex_buffer(0, vertices.slice(..));
            render_pass.draw(0..vertex_count, 0..1);
        }
        self.context.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

/// Injected uniforms the prepared (wrapped) source reads.
///
/// Fragment sources always reference both through the wrapper's header, since
/// its entry point flips `gl_FragCoord` against `u_resolution`.
fn referenced_uniforms(prepared: &str) -> Vec<&'static str> {
    [TIME_UNIFORM, RESOLUTION_UNIFORM]
        .into_iter()
        .filter(|name| prepared.contains(name))
        .collect()
}

fn merge_uniforms(vertex: &[&'static str], fragment: &[&'static str]) -> Vec<&'static str> {
    let mut uniforms = vertex.to_vec();
    for name in fragment {
        if !uniforms.contains(name) {
            uniforms.push(name);
        }
    }
    uniforms
}

fn location_in(uniforms: &[&'static str], name: &str) -> Option<UniformLocation> {
    if uniforms.iter().any(|used| *used == name) {
        FrameUniforms::location_of(name)
    } else {
        None
    }
}

impl GraphicsBackend for WgpuBackend {
    type Shader = WgpuShader;
    type Program = WgpuProgram;
    type Buffer = WgpuBuffer;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<WgpuShader, String> {
        let prepared = prepare_source(stage, source)?;
        let naga_stage = match stage {
            ShaderStage::Vertex => wgpu::naga::ShaderStage::Vertex,
            ShaderStage::Fragment => wgpu::naga::ShaderStage::Fragment,
        };
        let label = format!("{stage} shader");
        let uniforms = referenced_uniforms(&prepared);
        let module = self.with_validation(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&label),
                source: wgpu::ShaderSource::Glsl {
                    shader: Cow::Owned(prepared),
                    stage: naga_stage,
                    defines: &[],
                },
            })
        })?;
        Ok(WgpuShader { module, uniforms })
    }

    fn release_shader(&mut self, shader: WgpuShader) {
        drop(shader);
    }

    fn link_program(
        &mut self,
        vertex: &WgpuShader,
        fragment: &WgpuShader,
    ) -> Result<WgpuProgram, String> {
        let (width, height) = self.context.size();
        let uniform_buffer =
            self.context
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("frame uniforms"),
                    contents: FrameUniforms::new(width, height).as_bytes(),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
        let bind_group = self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("frame uniform bind group"),
                layout: &self.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

        let format = self.context.config.format;
        let layout = &self.pipeline_layout;
        let pipeline = self.with_validation(|device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("shader pipeline"),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &vertex.module,
                    entry_point: Some("main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &VERTEX_ATTRIBUTES,
                    }],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &fragment.module,
                    entry_point: Some("main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview: None,
                cache: None,
            })
        })?;

        Ok(WgpuProgram {
            pipeline,
            bind_group,
            uniform_buffer,
            uniforms: merge_uniforms(&vertex.uniforms, &fragment.uniforms),
        })
    }

    fn release_program(&mut self, program: WgpuProgram) {
        // The driver rebinds a program every frame, so nothing stays bound across a release.
        self.frame.program = None;
        program.uniform_buffer.destroy();
    }

    fn uniform_location(&self, program: &WgpuProgram, name: &str) -> Option<UniformLocation> {
        location_in(&program.uniforms, name)
    }

    fn create_vertex_buffer(&mut self, vertices: &[[f32; 2]]) -> WgpuBuffer {
        let buffer = self
            .context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("quad vertices"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        WgpuBuffer { buffer }
    }

    fn release_buffer(&mut self, buffer: WgpuBuffer) {
        self.frame.vertices = None;
        buffer.buffer.destroy();
    }

    fn surface_size(&self) -> (u32, u32) {
        self.context.size()
    }

    fn viewport(&mut self, width: u32, height: u32) {
        self.frame.viewport = (width, height);
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.frame.clear = color;
    }

    fn use_program(&mut self, program: &WgpuProgram) {
        self.frame.program = Some((
            program.pipeline.clone(),
            program.bind_group.clone(),
            program.uniform_buffer.clone(),
        ));
    }

    fn uniform_f32(&mut self, location: UniformLocation, value: f32) {
        self.frame.uniforms.set_f32(location, value);
    }

    fn uniform_vec2(&mut self, location: UniformLocation, value: [f32; 2]) {
        self.frame.uniforms.set_vec2(location, value);
    }

    fn bind_vertex_buffer(&mut self, buffer: &WgpuBuffer) {
        self.frame.vertices = Some(buffer.buffer.clone());
    }

    fn draw_triangle_strip(&mut self, vertex_count: u32) -> Result<(), FrameError> {
        self.present(vertex_count)
    }
}
