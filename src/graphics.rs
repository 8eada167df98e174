//! Constants shared by every producer and consumer of vertex data, plus the small pure helpers
//! that go with them.

/// Number of source images a shader can sample from.
pub const SHADER_IMAGE_COUNT: usize = 4;

/// Largest number of indices a single upload chunk may carry. Rounded down to a multiple of 3 so
/// a chunk always ends on a triangle boundary.
pub const INDICES_COUNT: usize = (1 << 16) / 3 * 3;

/// Floats per vertex: destination x/y, source u/v and an RGBA color.
pub const VERTEX_FLOAT_COUNT: usize = 8;

/// Builtin uniform slots written ahead of the user's uniforms for every draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum PreservedUniform {
    DestinationTextureSize = 0,
    SourceTextureSizes = 1,
    DestinationRegionOrigin = 2,
    DestinationRegionSize = 3,
    SourceOffsets = 4,
    SourceRegionOrigin = 5,
    SourceRegionSize = 6,
    ProjectionMatrix = 7,
}

impl PreservedUniform {
    pub const COUNT: usize = 8;

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }
}

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 1, 2, 3];

/// Indices of the two triangles making up a quad written by [`crate::VertexArena::quad`].
pub fn quad_indices() -> &'static [u16] {
    &QUAD_INDICES
}

/// Returns true when a chunk holding the given totals no longer fits one upload.
#[inline(always)]
pub(crate) fn must_use_different_vertex_buffer(
    next_vertex_float_count: usize,
    next_index_count: usize,
) -> bool {
    next_vertex_float_count > INDICES_COUNT * VERTEX_FLOAT_COUNT || next_index_count > INDICES_COUNT
}

/// Snaps a destination coordinate away from the exact center of a pixel.
///
/// Sampling exactly at a pixel center produces artifacts on some GPUs, so the fractional part is
/// mapped onto one of four fixed offsets: `0`, `5/16`, `11/16` or `1`.
#[inline(always)]
pub fn adjust_destination_pixel(x: f32) -> f32 {
    let ix = x.floor();
    let frac = x - ix;
    if frac < 3.0 / 16.0 {
        ix
    } else if frac < 8.0 / 16.0 {
        ix + 5.0 / 16.0
    } else if frac < 13.0 / 16.0 {
        ix + 11.0 / 16.0
    } else {
        ix + 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn indices_count_is_largest_multiple_of_three_below_u16_range() {
        assert_eq!(INDICES_COUNT, 65535);
        assert_eq!(INDICES_COUNT % 3, 0);
        assert!(INDICES_COUNT + 3 > 1 << 16);
    }

    #[test]
    fn adjust_destination_pixel_uses_fixed_thresholds() {
        assert_eq!(adjust_destination_pixel(10.0), 10.0);
        assert_eq!(adjust_destination_pixel(10.1), 10.0);
        assert_eq!(adjust_destination_pixel(10.25), 10.3125);
        assert_eq!(adjust_destination_pixel(10.5), 10.6875);
        assert_eq!(adjust_destination_pixel(10.8), 10.6875);
        assert_eq!(adjust_destination_pixel(10.9), 11.0);
        assert_eq!(adjust_destination_pixel(-0.5), -0.3125);
        assert_eq!(adjust_destination_pixel(-0.05), 0.0);
    }

    #[test]
    fn chunk_capacity_check_covers_both_limits() {
        assert!(!must_use_different_vertex_buffer(
            INDICES_COUNT * VERTEX_FLOAT_COUNT,
            INDICES_COUNT
        ));
        assert!(must_use_different_vertex_buffer(
            INDICES_COUNT * VERTEX_FLOAT_COUNT + 1,
            0
        ));
        assert!(must_use_different_vertex_buffer(0, INDICES_COUNT + 1));
    }

    proptest! {
        #[test]
        fn adjust_destination_pixel_is_idempotent(x in -100_000.0f32..100_000.0f32) {
            let adjusted = adjust_destination_pixel(x);
            prop_assert_eq!(adjust_destination_pixel(adjusted), adjusted);
        }

        #[test]
        fn adjust_destination_pixel_lands_on_fixed_offsets(x in -100_000.0f32..100_000.0f32) {
            let offset = adjust_destination_pixel(x) - x.floor();
            prop_assert!(
                [0.0, 5.0 / 16.0, 11.0 / 16.0, 1.0].contains(&offset),
                "unexpected offset {} for {}",
                offset,
                x
            );
        }
    }
}
