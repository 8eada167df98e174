/// Counters for one successful flush, for diagnosing batching efficiency.
///
/// Read them through [`super::CommandQueue::last_flush_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Commands replayed against the driver.
    pub commands: usize,
    /// Draw-triangles commands replayed, after merging.
    pub draw_calls: usize,
    /// Calls to `set_vertices`, one per chunk carrying indices.
    pub vertex_uploads: usize,
    /// Indices uploaded across all chunks.
    pub uploaded_indices: usize,
    /// Enqueued draws folded into the preceding command since the previous flush.
    pub merged_draws: usize,
}

impl FlushStats {
    /// Merge another flush's counts into this accumulator.
    pub fn accumulate(&mut self, other: &Self) {
        self.commands += other.commands;
        self.draw_calls += other.draw_calls;
        self.vertex_uploads += other.vertex_uploads;
        self.uploaded_indices += other.uploaded_indices;
        self.merged_draws += other.merged_draws;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_sums_every_counter() {
        let mut total = FlushStats::default();
        let flush = FlushStats {
            commands: 3,
            draw_calls: 2,
            vertex_uploads: 1,
            uploaded_indices: 12,
            merged_draws: 4,
        };
        total.accumulate(&flush);
        total.accumulate(&flush);

        assert_eq!(
            total,
            FlushStats {
                commands: 6,
                draw_calls: 4,
                vertex_uploads: 2,
                uploaded_indices: 24,
                merged_draws: 8,
            }
        );
    }
}
