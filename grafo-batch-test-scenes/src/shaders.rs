use std::any::Any;

use grafo_batch::ShaderProgram;

/// A shader program with configurable uniform reachability.
#[derive(Debug, Clone, Default)]
pub struct TestProgram {
    unreachable: Vec<usize>,
}

impl TestProgram {
    /// A program that reads every uniform.
    pub fn all_reachable() -> Self {
        Self::default()
    }

    /// A program that never reads the uniforms at the given variable indices.
    pub fn with_unreachable(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            unreachable: indices.into_iter().collect(),
        }
    }
}

impl ShaderProgram for TestProgram {
    fn is_uniform_reachable(&self, index: usize) -> bool {
        !self.unreachable.contains(&index)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
