//! Graphics drivers for tests: one that records every call, one that does nothing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ahash::{HashMap, HashSet};
use grafo_batch::{
    Blend, DrawTrianglesArgs, DriverError, GraphicsDriver, ImageId, PixelRect, Region, ShaderId,
    ShaderProgram, WritePixelsArgs, SHADER_IMAGE_COUNT,
};

/// A draw as the driver received it, with uniforms copied out.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub dst: ImageId,
    pub srcs: [Option<ImageId>; SHADER_IMAGE_COUNT],
    pub shader: ShaderId,
    pub index_count: usize,
    pub index_offset: usize,
    pub blend: Blend,
    pub dst_region: Region,
    pub uniforms: Vec<Vec<f32>>,
    pub even_odd: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Initialize,
    Reset,
    Begin,
    End { present: bool },
    SetVertices { vertices: Vec<f32>, indices: Vec<u16> },
    DrawTriangles(RecordedDraw),
    NewImage { id: ImageId, width: u32, height: u32, screen: bool },
    NewShader { id: ShaderId },
    WritePixels { image: ImageId, regions: Vec<PixelRect> },
    ReadPixels { image: ImageId, region: PixelRect },
    DisposeImage(ImageId),
    DisposeShader(ShaderId),
}

/// Calls a [`RecordingDriver`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    Begin,
    End,
    SetVertices,
    DrawTriangles,
    NewImage,
    WritePixels,
    ReadPixels,
}

#[derive(Debug)]
struct StoredImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    invalidated: bool,
}

#[derive(Debug, Default)]
struct Shared {
    calls: Vec<DriverCall>,
    failures: HashSet<FailurePoint>,
    images: HashMap<ImageId, StoredImage>,
}

/// Test-side view of a [`RecordingDriver`] that has moved to the driver thread.
#[derive(Debug, Clone)]
pub struct CallLog {
    shared: Arc<Mutex<Shared>>,
}

impl CallLog {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.lock().calls.clone()
    }

    /// Returns the recorded calls and forgets them.
    pub fn take(&self) -> Vec<DriverCall> {
        std::mem::take(&mut self.lock().calls)
    }

    pub fn draws(&self) -> Vec<RecordedDraw> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                DriverCall::DrawTriangles(draw) => Some(draw.clone()),
                _ => None,
            })
            .collect()
    }

    /// Vertex and index uploads, in order.
    pub fn uploads(&self) -> Vec<(Vec<f32>, Vec<u16>)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                DriverCall::SetVertices { vertices, indices } => {
                    Some((vertices.clone(), indices.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn fail_on(&self, point: FailurePoint) {
        self.lock().failures.insert(point);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Marks the image as having lost its contents.
    pub fn invalidate(&self, image: ImageId) {
        if let Some(stored) = self.lock().images.get_mut(&image) {
            stored.invalidated = true;
        }
    }
}

/// A driver that keeps images in memory and records every call into a shared [`CallLog`].
#[derive(Debug)]
pub struct RecordingDriver {
    shared: Arc<Mutex<Shared>>,
    next_image_id: u32,
    next_shader_id: u32,
    max_image_size: u32,
}

impl RecordingDriver {
    pub const DEFAULT_MAX_IMAGE_SIZE: u32 = 4096;

    pub fn new() -> (Self, CallLog) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let driver = Self {
            shared: Arc::clone(&shared),
            next_image_id: 1,
            next_shader_id: 1,
            max_image_size: Self::DEFAULT_MAX_IMAGE_SIZE,
        };
        (driver, CallLog { shared })
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records `call`, then fails if the test asked for `point` to fail.
    fn record(&self, call: DriverCall, point: Option<FailurePoint>) -> Result<(), DriverError> {
        let mut shared = self.lock();
        shared.calls.push(call);
        match point {
            Some(point) if shared.failures.contains(&point) => {
                Err(DriverError::new(format!("injected {point:?} failure")))
            }
            _ => Ok(()),
        }
    }

    fn create_image(&mut self, width: u32, height: u32, screen: bool) -> Result<ImageId, DriverError> {
        let id = if screen {
            ImageId(0)
        } else {
            let id = ImageId(self.next_image_id);
            self.next_image_id += 1;
            id
        };
        self.record(
            DriverCall::NewImage {
                id,
                width,
                height,
                screen,
            },
            Some(FailurePoint::NewImage),
        )?;
        self.lock().images.insert(
            id,
            StoredImage {
                width,
                height,
                pixels: vec![0; width as usize * height as usize * 4],
                invalidated: false,
            },
        );
        Ok(id)
    }
}

impl GraphicsDriver for RecordingDriver {
    fn initialize(&mut self) -> Result<(), DriverError> {
        self.record(DriverCall::Initialize, None)
    }

    fn begin(&mut self) -> Result<(), DriverError> {
        self.record(DriverCall::Begin, Some(FailurePoint::Begin))
    }

    fn end(&mut self, present: bool) -> Result<(), DriverError> {
        self.record(DriverCall::End { present }, Some(FailurePoint::End))
    }

    fn set_vertices(&mut self, vertices: &[f32], indices: &[u16]) -> Result<(), DriverError> {
        self.record(
            DriverCall::SetVertices {
                vertices: vertices.to_vec(),
                indices: indices.to_vec(),
            },
            Some(FailurePoint::SetVertices),
        )
    }

    fn draw_triangles(&mut self, args: &DrawTrianglesArgs<'_>) -> Result<(), DriverError> {
        self.record(
            DriverCall::DrawTriangles(RecordedDraw {
                dst: args.dst,
                srcs: args.srcs,
                shader: args.shader,
                index_count: args.index_count,
                index_offset: args.index_offset,
                blend: args.blend,
                dst_region: args.dst_region,
                uniforms: args.uniforms.iter().map(|values| values.to_vec()).collect(),
                even_odd: args.even_odd,
            }),
            Some(FailurePoint::DrawTriangles),
        )
    }

    fn new_image(&mut self, width: u32, height: u32) -> Result<ImageId, DriverError> {
        self.create_image(width, height, false)
    }

    fn new_screen_framebuffer_image(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<ImageId, DriverError> {
        self.create_image(width, height, true)
    }

    fn new_shader(&mut self, _program: &dyn ShaderProgram) -> Result<ShaderId, DriverError> {
        let id = ShaderId(self.next_shader_id);
        self.next_shader_id += 1;
        self.record(DriverCall::NewShader { id }, None)?;
        Ok(id)
    }

    fn write_pixels(&mut self, image: ImageId, args: &[WritePixelsArgs]) -> Result<(), DriverError> {
        self.record(
            DriverCall::WritePixels {
                image,
                regions: args.iter().map(|arg| arg.region).collect(),
            },
            Some(FailurePoint::WritePixels),
        )?;

        let mut shared = self.lock();
        let stored = shared
            .images
            .get_mut(&image)
            .ok_or_else(|| DriverError::new(format!("unknown image {image}")))?;
        for arg in args {
            let region = arg.region;
            if region.x + region.width > stored.width || region.y + region.height > stored.height {
                return Err(DriverError::new("write outside of the image"));
            }
            let row_len = region.width as usize * 4;
            for row in 0..region.height as usize {
                let src = row * row_len;
                let dst = ((region.y as usize + row) * stored.width as usize + region.x as usize) * 4;
                stored.pixels[dst..dst + row_len].copy_from_slice(&arg.pixels[src..src + row_len]);
            }
        }
        Ok(())
    }

    fn read_pixels(
        &mut self,
        image: ImageId,
        buffer: &mut [u8],
        region: PixelRect,
    ) -> Result<(), DriverError> {
        self.record(
            DriverCall::ReadPixels { image, region },
            Some(FailurePoint::ReadPixels),
        )?;

        let shared = self.lock();
        let stored = shared
            .images
            .get(&image)
            .ok_or_else(|| DriverError::new(format!("unknown image {image}")))?;
        if region.x + region.width > stored.width || region.y + region.height > stored.height {
            return Err(DriverError::new("read outside of the image"));
        }
        let row_len = region.width as usize * 4;
        for row in 0..region.height as usize {
            let src = ((region.y as usize + row) * stored.width as usize + region.x as usize) * 4;
            let dst = row * row_len;
            buffer[dst..dst + row_len].copy_from_slice(&stored.pixels[src..src + row_len]);
        }
        Ok(())
    }

    fn dispose_image(&mut self, image: ImageId) {
        let mut shared = self.lock();
        shared.images.remove(&image);
        shared.calls.push(DriverCall::DisposeImage(image));
    }

    fn dispose_shader(&mut self, shader: ShaderId) {
        self.lock().calls.push(DriverCall::DisposeShader(shader));
    }

    fn is_image_invalidated(&self, image: ImageId) -> bool {
        self.lock()
            .images
            .get(&image)
            .is_some_and(|stored| stored.invalidated)
    }

    fn max_image_size(&self) -> u32 {
        self.max_image_size
    }

    fn reset(&mut self) -> Result<(), DriverError> {
        self.record(DriverCall::Reset, None)
    }
}

/// A driver that hands out ids and ignores everything else.
#[derive(Debug, Default)]
pub struct NullDriver {
    next_id: u32,
}

impl NullDriver {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GraphicsDriver for NullDriver {
    fn initialize(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    fn begin(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    fn end(&mut self, _present: bool) -> Result<(), DriverError> {
        Ok(())
    }

    fn set_vertices(&mut self, _vertices: &[f32], _indices: &[u16]) -> Result<(), DriverError> {
        Ok(())
    }

    fn draw_triangles(&mut self, _args: &DrawTrianglesArgs<'_>) -> Result<(), DriverError> {
        Ok(())
    }

    fn new_image(&mut self, _width: u32, _height: u32) -> Result<ImageId, DriverError> {
        Ok(ImageId(self.next_id()))
    }

    fn new_screen_framebuffer_image(
        &mut self,
        _width: u32,
        _height: u32,
    ) -> Result<ImageId, DriverError> {
        Ok(ImageId(0))
    }

    fn new_shader(&mut self, _program: &dyn ShaderProgram) -> Result<ShaderId, DriverError> {
        Ok(ShaderId(self.next_id()))
    }

    fn write_pixels(&mut self, _image: ImageId, _args: &[WritePixelsArgs]) -> Result<(), DriverError> {
        Ok(())
    }

    fn read_pixels(
        &mut self,
        _image: ImageId,
        buffer: &mut [u8],
        _region: PixelRect,
    ) -> Result<(), DriverError> {
        buffer.fill(0);
        Ok(())
    }

    fn dispose_image(&mut self, _image: ImageId) {}

    fn dispose_shader(&mut self, _shader: ShaderId) {}

    fn is_image_invalidated(&self, _image: ImageId) -> bool {
        false
    }

    fn max_image_size(&self) -> u32 {
        RecordingDriver::DEFAULT_MAX_IMAGE_SIZE
    }
}
