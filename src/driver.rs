//! The capability surface the command queue replays against.
//!
//! A driver owns the actual GPU objects. The queue never calls it directly from the producing
//! thread: every call is issued from the [`crate::DriverThread`] that owns the driver.

use std::fmt;

use crate::blend::Blend;
use crate::graphics::SHADER_IMAGE_COUNT;
use crate::id::{ImageId, ShaderId};
use crate::shader::ShaderProgram;

/// Axis-aligned rectangle in destination (or source) pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Region {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(x:{}, y:{}, width:{}, height:{})",
            self.x as i32, self.y as i32, self.width as i32, self.height as i32
        )
    }
}

/// Integer pixel rectangle used by pixel transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Size in bytes of the RGBA8 pixels covered by the rectangle.
    pub fn rgba8_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// One RGBA8 upload into a region of an image.
#[derive(Debug, Clone, PartialEq)]
pub struct WritePixelsArgs {
    pub pixels: Vec<u8>,
    pub region: PixelRect,
}

/// Error reported by a graphics driver. The queue treats it as opaque and recoverable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DriverError {
    message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Everything a driver needs to issue one indexed triangle-list draw from the vertices most
/// recently passed to [`GraphicsDriver::set_vertices`].
#[derive(Debug, Clone, Copy)]
pub struct DrawTrianglesArgs<'a> {
    pub dst: ImageId,
    pub srcs: [Option<ImageId>; SHADER_IMAGE_COUNT],
    pub shader: ShaderId,
    pub index_count: usize,
    /// Offset, in indices, into the current upload.
    pub index_offset: usize,
    pub blend: Blend,
    pub dst_region: Region,
    /// Uniform values by variable index. Entries the shader does not read are empty.
    pub uniforms: &'a [&'a [f32]],
    pub even_odd: bool,
}

/// A graphics backend. Implementations live outside this crate.
pub trait GraphicsDriver: Send {
    fn initialize(&mut self) -> Result<(), DriverError>;

    fn begin(&mut self) -> Result<(), DriverError>;

    /// Ends the current frame. `present` is true when the screen should be presented.
    fn end(&mut self, present: bool) -> Result<(), DriverError>;

    /// Uploads the vertex and index data the following draws index into.
    fn set_vertices(&mut self, vertices: &[f32], indices: &[u16]) -> Result<(), DriverError>;

    fn draw_triangles(&mut self, args: &DrawTrianglesArgs<'_>) -> Result<(), DriverError>;

    fn new_image(&mut self, width: u32, height: u32) -> Result<ImageId, DriverError>;

    fn new_screen_framebuffer_image(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<ImageId, DriverError>;

    fn new_shader(&mut self, program: &dyn ShaderProgram) -> Result<ShaderId, DriverError>;

    fn write_pixels(&mut self, image: ImageId, args: &[WritePixelsArgs])
        -> Result<(), DriverError>;

    /// Reads RGBA8 pixels of `region` into `buffer`, which is `region.rgba8_len()` bytes long.
    fn read_pixels(
        &mut self,
        image: ImageId,
        buffer: &mut [u8],
        region: PixelRect,
    ) -> Result<(), DriverError>;

    fn dispose_image(&mut self, image: ImageId);

    fn dispose_shader(&mut self, shader: ShaderId);

    /// Whether the contents of the image were lost, e.g. after a context loss.
    fn is_image_invalidated(&self, image: ImageId) -> bool;

    fn max_image_size(&self) -> u32;

    /// Resets the driver state. Drivers without such a capability keep the default no-op.
    fn reset(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}
