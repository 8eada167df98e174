use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::id::ImageId;

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to an image created through [`crate::CommandQueue::new_image`].
///
/// The driver resource behind it only exists once the queued creation command has been flushed.
/// Clones share the same image; equality is identity.
#[derive(Clone)]
pub struct Image {
    inner: Arc<ImageInner>,
}

struct ImageInner {
    id: u64,
    width: u32,
    height: u32,
    screen: bool,
    driver_id: OnceLock<ImageId>,
}

impl Image {
    pub(crate) fn new(width: u32, height: u32, screen: bool) -> Self {
        Self {
            inner: Arc::new(ImageInner {
                id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
                width,
                height,
                screen,
                driver_id: OnceLock::new(),
            }),
        }
    }

    /// Process-unique id of the handle. Not the driver's id.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Size of the backing texture in pixels.
    pub fn internal_size(&self) -> (u32, u32) {
        (self.inner.width, self.inner.height)
    }

    pub fn is_screen(&self) -> bool {
        self.inner.screen
    }

    /// The driver's id, once the image has been created on the driver.
    pub fn driver_id(&self) -> Option<ImageId> {
        self.inner.driver_id.get().copied()
    }

    pub(crate) fn set_driver_id(&self, driver_id: ImageId) {
        if self.inner.driver_id.set(driver_id).is_err() {
            tracing::warn!(image = self.inner.id, "image was already created on the driver");
        }
    }

    pub(crate) fn describe(&self) -> String {
        if self.inner.screen {
            format!("{} (screen)", self.inner.id)
        } else {
            self.inner.id.to_string()
        }
    }
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Image {}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("id", &self.inner.id)
            .field("width", &self.inner.width)
            .field("height", &self.inner.height)
            .field("screen", &self.inner.screen)
            .field("driver_id", &self.driver_id())
            .finish()
    }
}
