//! Recording doubles for the backend, frame host, and clock.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::backend::{
    GraphicsBackend, ShaderStage, UniformLocation, RESOLUTION_UNIFORM, TIME_UNIFORM,
};
use crate::driver::{FrameHandle, FrameHost};
use crate::error::FrameError;
use crate::runtime::{TimeSample, TimeSource};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Compile(ShaderStage),
    ReleaseShader(u32),
    Link { program: u32 },
    ReleaseProgram(u32),
    CreateBuffer { buffer: u32, vertices: Vec<[f32; 2]> },
    ReleaseBuffer(u32),
    Viewport(u32, u32),
    Clear([f32; 4]),
    UseProgram(u32),
    UniformF32(UniformLocation, f32),
    UniformVec2(UniformLocation, [f32; 2]),
    BindBuffer(u32),
    Draw(u32),
}

pub(crate) struct FakeShader {
    id: u32,
    source: String,
}

pub(crate) struct FakeProgram {
    id: u32,
}

pub(crate) struct FakeBuffer {
    id: u32,
}

/// Backend that "compiles" by checking for an entry point and balanced
/// brackets, and records every call in order.
pub(crate) struct FakeBackend {
    pub calls: Vec<Call>,
    pub live_shaders: HashSet<u32>,
    pub live_programs: HashSet<u32>,
    pub live_buffers: HashSet<u32>,
    pub link_failure: Option<String>,
    /// Number of successful draws before the context is reported lost.
    pub lose_context_after: Option<usize>,
    pub size: (u32, u32),
    uniforms: HashMap<u32, Vec<String>>,
    next_id: u32,
    draws: usize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            live_shaders: HashSet::new(),
            live_programs: HashSet::new(),
            live_buffers: HashSet::new(),
            link_failure: None,
            lose_context_after: None,
            size: (400, 300),
            uniforms: HashMap::new(),
            next_id: 0,
            draws: 0,
        }
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn draw_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Draw(_)))
            .count()
    }

    /// Programs bound by `UseProgram` since the call at `from`.
    pub fn programs_bound_since(&self, from: usize) -> Vec<u32> {
        self.calls[from..]
            .iter()
            .filter_map(|call| match call {
                Call::UseProgram(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn linked_programs(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Link { program } => Some(*program),
                _ => None,
            })
            .collect()
    }
}

fn fake_compile(source: &str) -> Result<(), String> {
    let mut depth_paren = 0i32;
    let mut depth_brace = 0i32;
    for ch in source.chars() {
        match ch {
            '(' => depth_paren += 1,
            ')' => depth_paren -= 1,
            '{' => depth_brace += 1,
            '}' => depth_brace -= 1,
            _ => {}
        }
        if depth_paren < 0 || depth_brace < 0 {
            return Err("ERROR: 0:1: syntax error".to_string());
        }
    }
    if depth_paren != 0 || depth_brace != 0 {
        return Err("ERROR: 0:1: syntax error".to_string());
    }
    if !source.contains("void main") {
        return Err("ERROR: 0:1: 'main' : function not found".to_string());
    }
    Ok(())
}

impl GraphicsBackend for FakeBackend {
    type Shader = FakeShader;
    type Program = FakeProgram;
    type Buffer = FakeBuffer;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<FakeShader, String> {
        self.calls.push(Call::Compile(stage));
        fake_compile(source)?;
        let id = self.next_id();
        self.live_shaders.insert(id);
        Ok(FakeShader {
            id,
            source: source.to_string(),
        })
    }

    fn release_shader(&mut self, shader: FakeShader) {
        self.calls.push(Call::ReleaseShader(shader.id));
        assert!(self.live_shaders.remove(&shader.id), "double release of shader");
    }

    fn link_program(
        &mut self,
        vertex: &FakeShader,
        fragment: &FakeShader,
    ) -> Result<FakeProgram, String> {
        if let Some(log) = self.link_failure.clone() {
            return Err(log);
        }
        let id = self.next_id();
        self.calls.push(Call::Link { program: id });
        self.live_programs.insert(id);
        let names = [TIME_UNIFORM, RESOLUTION_UNIFORM]
            .into_iter()
            .filter(|name| vertex.source.contains(name) || fragment.source.contains(name))
            .map(str::to_string)
            .collect();
        self.uniforms.insert(id, names);
        Ok(FakeProgram { id })
    }

    fn release_program(&mut self, program: FakeProgram) {
        self.calls.push(Call::ReleaseProgram(program.id));
        assert!(self.live_programs.remove(&program.id), "double release of program");
    }

    fn uniform_location(&self, program: &FakeProgram, name: &str) -> Option<UniformLocation> {
        let names = self.uniforms.get(&program.id)?;
        names
            .iter()
            .position(|candidate| candidate == name)
            .map(|index| UniformLocation(index as u32))
    }

    fn create_vertex_buffer(&mut self, vertices: &[[f32; 2]]) -> FakeBuffer {
        let id = self.next_id();
        self.calls.push(Call::CreateBuffer {
            buffer: id,
            vertices: vertices.to_vec(),
        });
        self.live_buffers.insert(id);
        FakeBuffer { id }
    }

    fn release_buffer(&mut self, buffer: FakeBuffer) {
        self.calls.push(Call::ReleaseBuffer(buffer.id));
        assert!(self.live_buffers.remove(&buffer.id), "double release of buffer");
    }

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn viewport(&mut self, width: u32, height: u32) {
        self.calls.push(Call::Viewport(width, height));
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.calls.push(Call::Clear(color));
    }

    fn use_program(&mut self, program: &FakeProgram) {
        self.calls.push(Call::UseProgram(program.id));
    }

    fn uniform_f32(&mut self, location: UniformLocation, value: f32) {
        self.calls.push(Call::UniformF32(location, value));
    }

    fn uniform_vec2(&mut self, location: UniformLocation, value: [f32; 2]) {
        self.calls.push(Call::UniformVec2(location, value));
    }

    fn bind_vertex_buffer(&mut self, buffer: &FakeBuffer) {
        self.calls.push(Call::BindBuffer(buffer.id));
    }

    fn draw_triangle_strip(&mut self, vertex_count: u32) -> Result<(), FrameError> {
        if self
            .lose_context_after
            .map(|limit| self.draws >= limit)
            .unwrap_or(false)
        {
            return Err(FrameError::ContextLost {
                reason: "context lost".to_string(),
            });
        }
        self.draws += 1;
        self.calls.push(Call::Draw(vertex_count));
        Ok(())
    }
}

/// Frame host that hands out sequential handles and tracks which are still
/// scheduled.
#[derive(Debug, Default)]
pub(crate) struct FakeHost {
    next: u64,
    pub outstanding: Vec<FrameHandle>,
    pub cancelled: Vec<FrameHandle>,
}

impl FakeHost {
    /// Simulates the display refresh: the oldest scheduled callback fires.
    pub fn fire(&mut self) -> Option<FrameHandle> {
        if self.outstanding.is_empty() {
            None
        } else {
            Some(self.outstanding.remove(0))
        }
    }
}

impl FrameHost for FakeHost {
    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        let handle = FrameHandle::new(self.next);
        self.outstanding.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.outstanding.retain(|pending| *pending != handle);
        self.cancelled.push(handle);
    }
}

/// Clock whose value the test sets explicitly.
#[derive(Debug, Clone, Default)]
pub(crate) struct ManualClock {
    seconds: Arc<Mutex<f32>>,
}

impl ManualClock {
    pub fn set(&self, seconds: f32) {
        *self.seconds.lock().unwrap() = seconds;
    }
}

impl TimeSource for ManualClock {
    fn reset(&mut self) {
        self.set(0.0);
    }

    fn sample(&mut self) -> TimeSample {
        TimeSample::new(*self.seconds.lock().unwrap())
    }
}
