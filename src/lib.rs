pub use wgpu;

mod blend;
mod driver;
mod error;
mod graphics;
mod id;
mod image;
mod queue;
mod render_thread;
mod shader;
mod vertex;
mod vertex_backend;

pub use blend::{Blend, BlendFactor, BlendOperation};
pub use driver::{DrawTrianglesArgs, DriverError, GraphicsDriver, PixelRect, Region, WritePixelsArgs};
pub use error::CommandError;
pub use graphics::{
    adjust_destination_pixel, quad_indices, PreservedUniform, INDICES_COUNT, SHADER_IMAGE_COUNT,
    VERTEX_FLOAT_COUNT,
};
pub use id::{ImageId, ShaderId};
pub use image::Image;
pub use queue::{CommandQueue, DrawTriangles, FlushStats};
pub use render_thread::DriverThread;
pub use shader::{Shader, ShaderProgram};
pub use vertex::Vertex;
pub use vertex_backend::{VertexArena, VertexBackend};
