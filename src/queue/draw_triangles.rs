use std::fmt;
use std::ops::Range;

use crate::blend::Blend;
use crate::driver::{DrawTrianglesArgs, GraphicsDriver, Region};
use crate::error::CommandError;
use crate::graphics::{SHADER_IMAGE_COUNT, VERTEX_FLOAT_COUNT};
use crate::image::Image;
use crate::shader::Shader;

use super::types::realized_image;
use super::uniforms::{FloatArena, UniformList};

/// Images and shader a draw reads from and writes to.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct DrawTarget {
    pub(super) dst: Image,
    pub(super) srcs: [Option<Image>; SHADER_IMAGE_COUNT],
    pub(super) shader: Shader,
}

/// A queued triangle draw, possibly the merge of several consecutive enqueues.
///
/// Instances are recycled through [`DrawTrianglesCommandPool`]; a pooled instance has no target.
#[derive(Debug, Default)]
pub(super) struct DrawTrianglesCommand {
    pub(super) target: Option<DrawTarget>,
    /// Range into the queue's vertex floats.
    pub(super) vertices: Range<usize>,
    pub(super) index_count: usize,
    pub(super) blend: Blend,
    pub(super) dst_region: Region,
    pub(super) uniforms: UniformList,
    pub(super) even_odd: bool,
}

impl DrawTrianglesCommand {
    pub(super) fn vertex_float_count(&self) -> usize {
        self.vertices.len()
    }

    /// Whether `next`, enqueued right after `self`, can be folded into it.
    pub(super) fn can_merge(&self, next: &Self, vertices: &[f32], floats: &FloatArena) -> bool {
        let (Some(target), Some(next_target)) = (&self.target, &next.target) else {
            return false;
        };
        if target.shader != next_target.shader {
            return false;
        }
        if !self.uniforms.values_eq(&next.uniforms, floats) {
            return false;
        }
        if target.dst != next_target.dst || target.srcs != next_target.srcs {
            return false;
        }
        if self.blend != next.blend || self.dst_region != next.dst_region {
            return false;
        }
        if self.even_odd != next.even_odd {
            return false;
        }
        // Even-odd fills count coverage per pixel, so overlapping draws must stay separate.
        if self.even_odd
            && might_overlap_destination_regions(
                &vertices[self.vertices.clone()],
                &vertices[next.vertices.clone()],
            )
        {
            return false;
        }
        true
    }

    pub(super) fn merge(&mut self, next: &Self) {
        debug_assert_eq!(self.vertices.end, next.vertices.start);
        self.vertices.end = next.vertices.end;
        self.index_count += next.index_count;
    }

    /// Drops image and shader references and empties the uniforms, keeping their capacity.
    pub(super) fn release(&mut self) {
        self.target = None;
        self.vertices = 0..0;
        self.index_count = 0;
        self.uniforms.clear();
    }

    pub(super) fn exec(
        &self,
        driver: &mut dyn GraphicsDriver,
        index_offset: usize,
        floats: &FloatArena,
    ) -> Result<(), CommandError> {
        if self.index_count == 0 {
            return Ok(());
        }
        let Some(target) = &self.target else {
            return Ok(());
        };

        let dst = realized_image(&target.dst)?;
        let mut srcs = [None; SHADER_IMAGE_COUNT];
        for (slot, src) in srcs.iter_mut().zip(&target.srcs) {
            if let Some(src) = src {
                *slot = Some(realized_image(src)?);
            }
        }
        let shader = target
            .shader
            .driver_id()
            .ok_or(CommandError::UnrealizedShader(target.shader.id()))?;
        let uniforms = self.uniforms.resolve(floats);

        driver.draw_triangles(&DrawTrianglesArgs {
            dst,
            srcs,
            shader,
            index_count: self.index_count,
            index_offset,
            blend: self.blend,
            dst_region: self.dst_region,
            uniforms: uniforms.as_slice(),
            even_odd: self.even_odd,
        })?;
        Ok(())
    }
}

impl fmt::Display for DrawTrianglesCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(target) = &self.target else {
            return write!(f, "draw-triangles: (released)");
        };
        let srcs: Vec<String> = target
            .srcs
            .iter()
            .map(|src| match src {
                Some(src) => src.describe(),
                None => "(nil)".to_string(),
            })
            .collect();
        write!(
            f,
            "draw-triangles: dst: {} <- src: [{}], dst region: {}, num of indices: {}, blend: {}, even-odd: {}",
            target.dst.describe(),
            srcs.join(", "),
            self.dst_region,
            self.index_count,
            self.blend,
            self.even_odd,
        )
    }
}

/// Destination-space bounding box `[min_x, min_y, max_x, max_y]` of interleaved vertex floats.
pub(super) fn destination_bounds(vertices: &[f32]) -> [f32; 4] {
    vertices.chunks_exact(VERTEX_FLOAT_COUNT).fold(
        [f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY],
        |[min_x, min_y, max_x, max_y], vertex| {
            [
                min_x.min(vertex[0]),
                min_y.min(vertex[1]),
                max_x.max(vertex[0]),
                max_y.max(vertex[1]),
            ]
        },
    )
}

/// Conservative overlap test: boxes closer than one pixel count as overlapping.
pub(super) fn might_overlap_destination_regions(a: &[f32], b: &[f32]) -> bool {
    const MARGIN: f32 = 1.0;
    let [a_min_x, a_min_y, a_max_x, a_max_y] = destination_bounds(a);
    let [b_min_x, b_min_y, b_max_x, b_max_y] = destination_bounds(b);
    a_min_x < b_max_x + MARGIN
        && b_min_x < a_max_x + MARGIN
        && a_min_y < b_max_y + MARGIN
        && b_min_y < a_max_y + MARGIN
}

/// Bounded free list of draw commands.
#[derive(Debug)]
pub(super) struct DrawTrianglesCommandPool {
    free: Vec<Box<DrawTrianglesCommand>>,
    capacity: usize,
}

impl DrawTrianglesCommandPool {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            free: Vec::new(),
            capacity,
        }
    }

    pub(super) fn get(&mut self) -> Box<DrawTrianglesCommand> {
        self.free.pop().unwrap_or_default()
    }

    pub(super) fn put(&mut self, mut command: Box<DrawTrianglesCommand>) {
        command.release();
        if self.free.len() < self.capacity {
            self.free.push(command);
        }
    }

    pub(super) fn len(&self) -> usize {
        self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::ShaderProgram;
    use std::any::Any;
    use std::sync::Arc;

    #[derive(Debug)]
    struct AllReachable;

    impl ShaderProgram for AllReachable {
        fn is_uniform_reachable(&self, _index: usize) -> bool {
            true
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn quad(x: f32, y: f32, size: f32) -> Vec<f32> {
        let mut vertices = Vec::new();
        for (dx, dy) in [(0.0, 0.0), (size, 0.0), (0.0, size), (size, size)] {
            vertices.extend_from_slice(&[x + dx, y + dy, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
        }
        vertices
    }

    #[test]
    fn bounds_cover_every_vertex() {
        let mut vertices = quad(10.0, 20.0, 5.0);
        vertices.extend(quad(-3.0, 40.0, 1.0));
        assert_eq!(destination_bounds(&vertices), [-3.0, 20.0, 15.0, 41.0]);
    }

    #[test]
    fn overlap_uses_a_one_pixel_margin() {
        let a = quad(0.0, 0.0, 10.0);
        assert!(might_overlap_destination_regions(&a, &quad(5.0, 5.0, 10.0)));
        assert!(might_overlap_destination_regions(&a, &quad(10.5, 0.0, 10.0)));
        assert!(might_overlap_destination_regions(&quad(0.0, 10.5, 10.0), &a));
        assert!(!might_overlap_destination_regions(&a, &quad(11.0, 0.0, 10.0)));
        assert!(!might_overlap_destination_regions(&a, &quad(11.5, 0.0, 10.0)));
        assert!(!might_overlap_destination_regions(&quad(-11.5, 0.0, 10.0), &a));
        assert!(!might_overlap_destination_regions(&a, &quad(0.0, 30.0, 10.0)));
    }

    #[test]
    fn pool_keeps_at_most_its_capacity() {
        let mut pool = DrawTrianglesCommandPool::new(2);
        for _ in 0..5 {
            pool.put(Box::default());
        }
        assert_eq!(pool.len(), 2);
        pool.get();
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn released_command_drops_its_target() {
        let dst = Image::new(8, 8, false);
        let mut command = DrawTrianglesCommand {
            target: Some(DrawTarget {
                dst: dst.clone(),
                srcs: [None, None, None, None],
                shader: Shader::new(Arc::new(AllReachable)),
            }),
            vertices: 0..32,
            index_count: 6,
            ..Default::default()
        };
        command.release();

        assert!(command.target.is_none());
        assert_eq!(command.index_count, 0);
        assert_eq!(command.to_string(), "draw-triangles: (released)");
    }
}
