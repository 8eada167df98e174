use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::driver::{GraphicsDriver, PixelRect, WritePixelsArgs};
use crate::error::CommandError;
use crate::id::ImageId;
use crate::image::Image;
use crate::shader::Shader;

use super::draw_triangles::DrawTrianglesCommand;
use super::uniforms::FloatArena;

pub(super) fn realized_image(image: &Image) -> Result<ImageId, CommandError> {
    image
        .driver_id()
        .ok_or(CommandError::UnrealizedImage(image.id()))
}

#[derive(Debug)]
pub(super) enum Command {
    DrawTriangles(Box<DrawTrianglesCommand>),
    WritePixels(WritePixelsCommand),
    ReadPixels(ReadPixelsCommand),
    DisposeImage(DisposeImageCommand),
    DisposeShader(DisposeShaderCommand),
    NewImage(NewImageCommand),
    NewShader(NewShaderCommand),
    IsInvalidated(IsInvalidatedCommand),
}

impl Command {
    /// Replays the command. `index_offset` is only meaningful for draws: the position of their
    /// first index within the current upload.
    pub(super) fn exec(
        &self,
        driver: &mut dyn GraphicsDriver,
        index_offset: usize,
        floats: &FloatArena,
    ) -> Result<(), CommandError> {
        match self {
            Command::DrawTriangles(draw) => draw.exec(driver, index_offset, floats),
            Command::WritePixels(command) => command.exec(driver),
            Command::ReadPixels(command) => command.exec(driver),
            Command::DisposeImage(command) => {
                command.exec(driver);
                Ok(())
            }
            Command::DisposeShader(command) => {
                command.exec(driver);
                Ok(())
            }
            Command::NewImage(command) => command.exec(driver),
            Command::NewShader(command) => command.exec(driver),
            Command::IsInvalidated(command) => command.exec(driver),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::DrawTriangles(draw) => fmt::Display::fmt(draw, f),
            Command::WritePixels(command) => write!(
                f,
                "write-pixels: dst: {}, len(args): {}",
                command.dst.id(),
                command.args.len()
            ),
            Command::ReadPixels(command) => {
                write!(f, "read-pixels: image: {}", command.image.id())
            }
            Command::DisposeImage(command) => {
                write!(f, "dispose-image: target: {}", command.target.id())
            }
            Command::DisposeShader(command) => {
                write!(f, "dispose-shader: target: {}", command.target.id())
            }
            Command::NewImage(command) => {
                let (width, height) = command.result.internal_size();
                write!(
                    f,
                    "new-image: result: {}, width: {}, height: {}, screen: {}",
                    command.result.id(),
                    width,
                    height,
                    command.result.is_screen()
                )
            }
            Command::NewShader(command) => {
                write!(f, "new-shader: result: {}", command.result.id())
            }
            Command::IsInvalidated(command) => {
                write!(f, "is-invalidated: image: {}", command.image.id())
            }
        }
    }
}

#[derive(Debug)]
pub(super) struct WritePixelsCommand {
    pub(super) dst: Image,
    pub(super) args: Vec<WritePixelsArgs>,
}

impl WritePixelsCommand {
    fn exec(&self, driver: &mut dyn GraphicsDriver) -> Result<(), CommandError> {
        if self.args.is_empty() {
            return Ok(());
        }
        driver.write_pixels(realized_image(&self.dst)?, &self.args)?;
        Ok(())
    }
}

#[derive(Debug)]
pub(super) struct ReadPixelsCommand {
    pub(super) image: Image,
    pub(super) region: PixelRect,
    pub(super) result: Arc<Mutex<Vec<u8>>>,
}

impl ReadPixelsCommand {
    fn exec(&self, driver: &mut dyn GraphicsDriver) -> Result<(), CommandError> {
        let image = realized_image(&self.image)?;
        let mut pixels = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        pixels.resize(self.region.rgba8_len(), 0);
        driver.read_pixels(image, &mut pixels, self.region)?;
        Ok(())
    }
}

#[derive(Debug)]
pub(super) struct DisposeImageCommand {
    pub(super) target: Image,
}

impl DisposeImageCommand {
    fn exec(&self, driver: &mut dyn GraphicsDriver) {
        if let Some(image) = self.target.driver_id() {
            driver.dispose_image(image);
        }
    }
}

#[derive(Debug)]
pub(super) struct DisposeShaderCommand {
    pub(super) target: Shader,
}

impl DisposeShaderCommand {
    fn exec(&self, driver: &mut dyn GraphicsDriver) {
        if let Some(shader) = self.target.driver_id() {
            driver.dispose_shader(shader);
        }
    }
}

#[derive(Debug)]
pub(super) struct NewImageCommand {
    pub(super) result: Image,
}

impl NewImageCommand {
    fn exec(&self, driver: &mut dyn GraphicsDriver) -> Result<(), CommandError> {
        let (width, height) = self.result.internal_size();
        let id = if self.result.is_screen() {
            driver.new_screen_framebuffer_image(width, height)?
        } else {
            driver.new_image(width, height)?
        };
        self.result.set_driver_id(id);
        Ok(())
    }
}

#[derive(Debug)]
pub(super) struct NewShaderCommand {
    pub(super) result: Shader,
}

impl NewShaderCommand {
    fn exec(&self, driver: &mut dyn GraphicsDriver) -> Result<(), CommandError> {
        let id = driver.new_shader(self.result.program().as_ref())?;
        self.result.set_driver_id(id);
        Ok(())
    }
}

#[derive(Debug)]
pub(super) struct IsInvalidatedCommand {
    pub(super) image: Image,
    pub(super) result: Arc<AtomicBool>,
}

impl IsInvalidatedCommand {
    fn exec(&self, driver: &mut dyn GraphicsDriver) -> Result<(), CommandError> {
        let invalidated = driver.is_image_invalidated(realized_image(&self.image)?);
        self.result.store(invalidated, Ordering::Release);
        Ok(())
    }
}
