use std::ops::Range;

use smallvec::SmallVec;

use crate::driver::Region;
use crate::graphics::{PreservedUniform, SHADER_IMAGE_COUNT};
use crate::image::Image;
use crate::shader::ShaderProgram;

/// Per-frame float storage for uniform values. Entries are addressed by index range, so growing
/// the arena never invalidates what was handed out earlier. Reset at the end of each frame.
#[derive(Debug, Default)]
pub(crate) struct FloatArena {
    floats: Vec<f32>,
}

impl FloatArena {
    pub(crate) fn push(&mut self, values: &[f32]) -> Range<usize> {
        let start = self.floats.len();
        self.floats.extend_from_slice(values);
        start..self.floats.len()
    }

    pub(crate) fn get(&self, range: &Range<usize>) -> &[f32] {
        &self.floats[range.clone()]
    }

    pub(crate) fn len(&self) -> usize {
        self.floats.len()
    }

    pub(crate) fn reset(&mut self) {
        self.floats.clear();
    }
}

/// Uniform values of one draw, by variable index, stored in a [`FloatArena`].
#[derive(Debug, Default, Clone)]
pub(crate) struct UniformList {
    entries: SmallVec<[Range<usize>; 16]>,
}

impl UniformList {
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn push(&mut self, range: Range<usize>) {
        self.entries.push(range);
    }

    /// Empties the entries the program never reads. Positions are kept.
    pub(crate) fn clear_unreachable(&mut self, program: &dyn ShaderProgram) {
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if !program.is_uniform_reachable(index) {
                *entry = entry.start..entry.start;
            }
        }
    }

    /// Same number of entries, same entry lengths, same scalars.
    pub(crate) fn values_eq(&self, other: &Self, floats: &FloatArena) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|(a, b)| floats.get(a) == floats.get(b))
    }

    pub(crate) fn resolve<'a>(&self, floats: &'a FloatArena) -> SmallVec<[&'a [f32]; 16]> {
        self.entries.iter().map(|range| floats.get(range)).collect()
    }
}

pub(crate) struct PreservedUniformInputs<'a> {
    pub(crate) dst: &'a Image,
    pub(crate) srcs: &'a [Option<&'a Image>; SHADER_IMAGE_COUNT],
    pub(crate) offsets: [[f32; 2]; SHADER_IMAGE_COUNT - 1],
    pub(crate) dst_region: Region,
    pub(crate) src_region: Region,
}

/// Fills `list` with the preserved uniforms followed by the user's uniforms.
pub(crate) fn prepend_preserved_uniforms(
    floats: &mut FloatArena,
    list: &mut UniformList,
    inputs: &PreservedUniformInputs<'_>,
    user_uniforms: &[&[f32]],
) {
    list.clear();

    let (dw, dh) = inputs.dst.internal_size();
    let (dw, dh) = (dw as f32, dh as f32);

    let mut source_sizes = [0.0; 2 * SHADER_IMAGE_COUNT];
    for (size, src) in source_sizes.chunks_exact_mut(2).zip(inputs.srcs) {
        if let Some(src) = src {
            let (w, h) = src.internal_size();
            size[0] = w as f32;
            size[1] = h as f32;
        }
    }

    let mut src_region = inputs.src_region;
    let mut offsets = inputs.offsets;
    if let Some(src) = inputs.srcs[0] {
        let (w, h) = src.internal_size();
        let (w, h) = (w as f32, h as f32);
        src_region.x /= w;
        src_region.y /= h;
        src_region.width /= w;
        src_region.height /= h;
        for offset in &mut offsets {
            offset[0] /= w;
            offset[1] /= h;
        }
    }
    let offsets = offsets.as_flattened();

    #[rustfmt::skip]
    let projection = [
        2.0 / dw, 0.0, 0.0, 0.0,
        0.0, 2.0 / dh, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        -1.0, -1.0, 0.0, 1.0,
    ];

    let slots: [(PreservedUniform, &[f32]); PreservedUniform::COUNT] = [
        (PreservedUniform::DestinationTextureSize, &[dw, dh]),
        (PreservedUniform::SourceTextureSizes, &source_sizes),
        (
            PreservedUniform::DestinationRegionOrigin,
            &[inputs.dst_region.x / dw, inputs.dst_region.y / dh],
        ),
        (
            PreservedUniform::DestinationRegionSize,
            &[inputs.dst_region.width / dw, inputs.dst_region.height / dh],
        ),
        (PreservedUniform::SourceOffsets, offsets),
        (
            PreservedUniform::SourceRegionOrigin,
            &[src_region.x, src_region.y],
        ),
        (
            PreservedUniform::SourceRegionSize,
            &[src_region.width, src_region.height],
        ),
        (PreservedUniform::ProjectionMatrix, &projection),
    ];
    for (slot, values) in slots {
        debug_assert_eq!(list.len(), slot.index());
        list.push(floats.push(values));
    }

    for values in user_uniforms {
        list.push(floats.push(values));
    }
}
