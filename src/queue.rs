//! Deferred, batched graphics commands.
//!
//! Producers enqueue draws and resource operations on a [`CommandQueue`]. Consecutive compatible
//! draws are merged into one command while enqueuing, vertex data is split into upload chunks the
//! driver can index with 16-bit indices, and [`CommandQueue::flush`] replays everything on the
//! [`DriverThread`] between one `begin`/`end` pair.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, debug_span, trace, warn};

use crate::blend::Blend;
use crate::driver::{GraphicsDriver, PixelRect, Region, WritePixelsArgs};
use crate::error::CommandError;
use crate::graphics::{
    must_use_different_vertex_buffer, INDICES_COUNT, SHADER_IMAGE_COUNT, VERTEX_FLOAT_COUNT,
};
use crate::image::Image;
use crate::render_thread::DriverThread;
use crate::shader::{Shader, ShaderProgram};

mod draw_triangles;
mod enqueue;
mod flush;
mod metrics;
mod types;
mod uniforms;

pub use metrics::FlushStats;

use draw_triangles::{DrawTarget, DrawTrianglesCommandPool};
use types::{
    Command, DisposeImageCommand, DisposeShaderCommand, IsInvalidatedCommand, NewImageCommand,
    NewShaderCommand, ReadPixelsCommand, WritePixelsCommand,
};
use uniforms::{prepend_preserved_uniforms, FloatArena, PreservedUniformInputs};

/// Everything recorded since the last flush. Moved to the driver thread for replay and back.
#[derive(Debug, Default)]
struct CommandBuffer {
    commands: Vec<Command>,
    vertices: Vec<f32>,
    /// Indices, already rebased onto the start of their upload chunk.
    indices: Vec<u16>,
    floats: FloatArena,
}

/// One draw as handed to [`CommandQueue::enqueue_draw_triangles`].
#[derive(Debug, Clone, Copy)]
pub struct DrawTriangles<'a> {
    pub dst: &'a Image,
    pub srcs: [Option<&'a Image>; SHADER_IMAGE_COUNT],
    /// Interleaved vertex floats, [`VERTEX_FLOAT_COUNT`] per vertex.
    pub vertices: &'a [f32],
    /// Indices relative to the first vertex in `vertices`.
    pub indices: &'a [u16],
    pub blend: Blend,
    pub dst_region: Region,
    pub src_region: Region,
    /// Offsets of sources 1 to 3 relative to the first source, in pixels.
    pub src_offsets: [[f32; 2]; SHADER_IMAGE_COUNT - 1],
    pub shader: &'a Shader,
    /// User uniform values, by variable index after the preserved ones.
    pub uniforms: &'a [&'a [f32]],
    pub even_odd: bool,
}

/// Records graphics commands and replays them in batches.
#[derive(Debug)]
pub struct CommandQueue {
    buffer: CommandBuffer,
    /// Vertex floats and indices in the upload chunk currently being filled.
    chunk_vertex_float_count: usize,
    chunk_index_count: usize,
    draw_triangles_pool: DrawTrianglesCommandPool,
    merged_draws: usize,
    last_flush_stats: FlushStats,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    /// Upper bound on recycled draw commands kept between flushes.
    pub const DEFAULT_POOL_CAPACITY: usize = 1024;

    pub fn new() -> Self {
        Self::with_pool_capacity(Self::DEFAULT_POOL_CAPACITY)
    }

    pub fn with_pool_capacity(pool_capacity: usize) -> Self {
        Self {
            buffer: CommandBuffer::default(),
            chunk_vertex_float_count: 0,
            chunk_index_count: 0,
            draw_triangles_pool: DrawTrianglesCommandPool::new(pool_capacity),
            merged_draws: 0,
            last_flush_stats: FlushStats::default(),
        }
    }

    /// Number of queued commands, after merging.
    pub fn len(&self) -> usize {
        self.buffer.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.commands.is_empty()
    }

    /// Vertex floats recorded since the last flush.
    pub fn vertex_float_count(&self) -> usize {
        self.buffer.vertices.len()
    }

    /// Indices recorded since the last flush.
    pub fn index_count(&self) -> usize {
        self.buffer.indices.len()
    }

    /// Draw commands waiting in the recycling pool.
    pub fn pooled_draw_commands(&self) -> usize {
        self.draw_triangles_pool.len()
    }

    /// Counters of the most recent successful flush.
    pub fn last_flush_stats(&self) -> FlushStats {
        self.last_flush_stats
    }
}
