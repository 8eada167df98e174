use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::id::ShaderId;

/// A shader program as produced by the shader compiler, seen through the only reflection the
/// queue needs.
pub trait ShaderProgram: Send + Sync + fmt::Debug {
    /// Whether the program reads the uniform variable at `index`. Indices count the preserved
    /// uniforms first.
    fn is_uniform_reachable(&self, index: usize) -> bool;

    /// Lets a driver downcast to its own program type.
    fn as_any(&self) -> &dyn Any;
}

static NEXT_SHADER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to a shader created through [`crate::CommandQueue::new_shader`]. Equality is identity.
#[derive(Clone)]
pub struct Shader {
    inner: Arc<ShaderInner>,
}

struct ShaderInner {
    id: u64,
    program: Arc<dyn ShaderProgram>,
    driver_id: OnceLock<ShaderId>,
}

impl Shader {
    pub(crate) fn new(program: Arc<dyn ShaderProgram>) -> Self {
        Self {
            inner: Arc::new(ShaderInner {
                id: NEXT_SHADER_ID.fetch_add(1, Ordering::Relaxed),
                program,
                driver_id: OnceLock::new(),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn program(&self) -> &Arc<dyn ShaderProgram> {
        &self.inner.program
    }

    pub fn driver_id(&self) -> Option<ShaderId> {
        self.inner.driver_id.get().copied()
    }

    pub(crate) fn set_driver_id(&self, driver_id: ShaderId) {
        if self.inner.driver_id.set(driver_id).is_err() {
            tracing::warn!(shader = self.inner.id, "shader was already created on the driver");
        }
    }
}

impl PartialEq for Shader {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Shader {}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("id", &self.inner.id)
            .field("program", &self.inner.program)
            .field("driver_id", &self.driver_id())
            .finish()
    }
}
