use std::mem::offset_of;

use bytemuck::{Pod, Zeroable};

use crate::backend::{UniformLocation, RESOLUTION_UNIFORM, TIME_UNIFORM};

/// CPU mirror of the `PromptshadeFrame` block injected ahead of every fragment.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub(crate) struct FrameUniforms {
    pub time: f32,
    pub _padding: f32,
    pub resolution: [f32; 2],
}

pub(crate) const TIME_OFFSET: u32 = offset_of!(FrameUniforms, time) as u32;
pub(crate) const RESOLUTION_OFFSET: u32 = offset_of!(FrameUniforms, resolution) as u32;

impl FrameUniforms {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resolution: [width as f32, height as f32],
            ..Self::default()
        }
    }

    /// Block offset of a named uniform, used as its location.
    pub fn location_of(name: &str) -> Option<UniformLocation> {
        match name {
            TIME_UNIFORM => Some(UniformLocation(TIME_OFFSET)),
            RESOLUTION_UNIFORM => Some(UniformLocation(RESOLUTION_OFFSET)),
            _ => None,
        }
    }

    pub fn set_f32(&mut self, location: UniformLocation, value: f32) {
        if location.0 == TIME_OFFSET {
            self.time = value;
        } else {
            tracing::warn!(offset = location.0, "no float uniform at offset");
        }
    }

    pub fn set_vec2(&mut self, location: UniformLocation, value: [f32; 2]) {
        if location.0 == RESOLUTION_OFFSET {
            self.resolution = value;
        } else {
            tracing::warn!(offset = location.0, "no vec2 uniform at offset");
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
