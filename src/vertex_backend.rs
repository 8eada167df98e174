use std::ops::Range;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::debug;

use crate::graphics::{adjust_destination_pixel, VERTEX_FLOAT_COUNT};

const MIN_BACKING_FLOAT_COUNT: usize = 128 * VERTEX_FLOAT_COUNT;

fn backing_float_count(required: usize) -> usize {
    let mut len = MIN_BACKING_FLOAT_COUNT;
    while len < required {
        len *= 2;
    }
    len
}

/// Growable float storage handing out vertex slices for one frame.
///
/// Slices never overlap within one allocation epoch. When the backing array has to grow, a new
/// array replaces it and the cursor restarts at zero; [`VertexArena::slice`] borrows the arena
/// mutably, so no slice can outlive the allocation that produced it.
#[derive(Debug)]
pub struct VertexArena {
    backing: Vec<f32>,
    cursor: usize,
    under_used_windows: u32,
    retention_windows: u32,
}

impl VertexArena {
    fn new(retention_windows: u32) -> Self {
        Self {
            backing: Vec::new(),
            cursor: 0,
            under_used_windows: 0,
            retention_windows,
        }
    }

    /// Returns storage for `vertex_count` vertices.
    ///
    /// The slice may hold stale values from a previous window; callers overwrite all of it.
    pub fn slice(&mut self, vertex_count: usize) -> &mut [f32] {
        let range = self.allocate(vertex_count);
        &mut self.backing[range]
    }

    /// Writes the four vertices of a textured quad and returns them.
    ///
    /// `src` is the source rectangle `[x0, y0, x1, y1]` in texels, `transform` the affine
    /// `[a, b, c, d, tx, ty]` mapping it into destination pixels and `color` the RGBA multiplier.
    /// Destination coordinates go through [`adjust_destination_pixel`]. Pair with
    /// [`crate::quad_indices`].
    pub fn quad(&mut self, src: [f32; 4], transform: [f32; 6], color: [f32; 4]) -> &[f32] {
        let [sx0, sy0, sx1, sy1] = src;
        let [a, b, c, d, tx, ty] = transform;
        let width = sx1 - sx0;
        let height = sy1 - sy0;
        let (ax, by, cx, dy) = (a * width, b * height, c * width, d * height);
        let [cr, cg, cb, ca] = color;

        let vertices = self.slice(4);
        vertices.copy_from_slice(&[
            adjust_destination_pixel(tx),
            adjust_destination_pixel(ty),
            sx0,
            sy0,
            cr,
            cg,
            cb,
            ca,
            adjust_destination_pixel(ax + tx),
            adjust_destination_pixel(cx + ty),
            sx1,
            sy0,
            cr,
            cg,
            cb,
            ca,
            adjust_destination_pixel(by + tx),
            adjust_destination_pixel(dy + ty),
            sx0,
            sy1,
            cr,
            cg,
            cb,
            ca,
            adjust_destination_pixel(ax + by + tx),
            adjust_destination_pixel(cx + dy + ty),
            sx1,
            sy1,
            cr,
            cg,
            cb,
            ca,
        ]);
        vertices
    }

    /// Length of the backing array in floats.
    pub fn capacity(&self) -> usize {
        self.backing.len()
    }

    /// Floats handed out since the window started or the backing last grew.
    pub fn used(&self) -> usize {
        self.cursor
    }

    fn allocate(&mut self, vertex_count: usize) -> Range<usize> {
        let need = vertex_count * VERTEX_FLOAT_COUNT;
        if self.backing.len() < self.cursor + need {
            let len = (self.backing.len() * 2).max(backing_float_count(need));
            debug!(
                old_len = self.backing.len(),
                new_len = len,
                "growing vertex backing storage"
            );
            self.backing = vec![0.0; len];
            self.cursor = 0;
        }
        let range = self.cursor..self.cursor + need;
        self.cursor += need;
        range
    }

    fn end_window(&mut self) {
        if backing_float_count(self.cursor) < self.backing.len() {
            if self.under_used_windows < self.retention_windows {
                self.under_used_windows += 1;
            }
        } else {
            self.under_used_windows = 0;
        }

        if self.under_used_windows == self.retention_windows && !self.backing.is_empty() {
            debug!(
                len = self.backing.len(),
                windows = self.retention_windows,
                "releasing under-used vertex backing storage"
            );
            self.backing = Vec::new();
            self.under_used_windows = 0;
        }

        self.cursor = 0;
    }
}

/// A [`VertexArena`] shared between call sites behind a mutex.
#[derive(Debug)]
pub struct VertexBackend {
    arena: Mutex<VertexArena>,
}

impl Default for VertexBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl VertexBackend {
    /// Consecutive under-used windows after which the backing storage is released.
    pub const DEFAULT_RETENTION_WINDOWS: u32 = 60;

    pub fn new() -> Self {
        Self::with_retention_windows(Self::DEFAULT_RETENTION_WINDOWS)
    }

    pub fn with_retention_windows(retention_windows: u32) -> Self {
        Self {
            arena: Mutex::new(VertexArena::new(retention_windows)),
        }
    }

    /// Process-wide backend, created on first use.
    pub fn global() -> &'static VertexBackend {
        static GLOBAL_VERTEX_BACKEND: OnceLock<VertexBackend> = OnceLock::new();
        GLOBAL_VERTEX_BACKEND.get_or_init(VertexBackend::new)
    }

    /// Allocates storage for `vertex_count` vertices and lets `fill` write it under the lock.
    pub fn with_slice<R>(&self, vertex_count: usize, fill: impl FnOnce(&mut [f32]) -> R) -> R {
        let mut arena = self.lock();
        fill(arena.slice(vertex_count))
    }

    /// Runs one window of work (typically: fill vertex slices, enqueue, flush) under the lock,
    /// then updates the shrink heuristics and rewinds the cursor.
    ///
    /// `work` must not call back into this backend; it receives the arena instead.
    pub fn lock_and_reset<R, E>(
        &self,
        work: impl FnOnce(&mut VertexArena) -> Result<R, E>,
    ) -> Result<R, E> {
        let mut arena = self.lock();
        let result = work(&mut *arena);
        arena.end_window();
        result
    }

    fn lock(&self) -> MutexGuard<'_, VertexArena> {
        self.arena.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
