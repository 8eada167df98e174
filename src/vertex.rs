use crate::graphics::VERTEX_FLOAT_COUNT;

/// One vertex as laid out in the queue's float array: destination position in pixels, source
/// texel coordinates and an RGBA color multiplier.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
    pub color: [f32; 4],
}

const _: () = assert!(std::mem::size_of::<Vertex>() == VERTEX_FLOAT_COUNT * 4);

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];

    pub fn new(position: [f32; 2], tex_coords: [f32; 2], color: [f32; 4]) -> Self {
        Self {
            position,
            tex_coords,
            color,
        }
    }

    /// Vertex buffer layout matching the floats uploaded by `GraphicsDriver::set_vertices`.
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    /// Views vertices as the flat float layout the command queue consumes.
    pub fn as_floats(vertices: &[Vertex]) -> &[f32] {
        bytemuck::cast_slice(vertices)
    }

    /// Views flat floats as vertices. Panics if the length is not a multiple of
    /// [`VERTEX_FLOAT_COUNT`].
    pub fn from_floats(floats: &[f32]) -> &[Vertex] {
        bytemuck::cast_slice(floats)
    }
}
