use crate::backend::GraphicsBackend;

/// Clip-space corners of the full-screen quad in triangle-strip order.
pub const QUAD_VERTICES: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];

/// Vertices issued per draw; a 4-vertex strip yields two triangles.
pub const QUAD_VERTEX_COUNT: u32 = QUAD_VERTICES.len() as u32;

/// Uploads the quad once for a freshly built program.
pub fn upload_quad<B: GraphicsBackend>(backend: &mut B) -> B::Buffer {
    backend.create_vertex_buffer(&QUAD_VERTICES)
}
