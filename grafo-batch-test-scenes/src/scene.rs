//! Scene building blocks shared by the integration tests and benchmarks.

use std::sync::Arc;

use grafo_batch::{
    Blend, CommandQueue, DrawTriangles, Image, Region, Shader, Vertex, SHADER_IMAGE_COUNT,
};

use crate::shaders::TestProgram;

pub const CANVAS_WIDTH: u32 = 256;
pub const CANVAS_HEIGHT: u32 = 256;

/// Interleaved vertex floats of an axis-aligned quad. Pair with [`grafo_batch::quad_indices`].
pub fn quad_vertices(x: f32, y: f32, width: f32, height: f32, color: [f32; 4]) -> Vec<f32> {
    let vertices = [
        Vertex::new([x, y], [0.0, 0.0], color),
        Vertex::new([x + width, y], [1.0, 0.0], color),
        Vertex::new([x, y + height], [0.0, 1.0], color),
        Vertex::new([x + width, y + height], [1.0, 1.0], color),
    ];
    bytemuck::cast_slice(&vertices).to_vec()
}

/// `count` unit quads laid out left to right, with indices relative to the first vertex.
pub fn quad_row(count: usize, y: f32) -> (Vec<f32>, Vec<u16>) {
    let mut vertices = Vec::with_capacity(count * 4 * grafo_batch::VERTEX_FLOAT_COUNT);
    let mut indices = Vec::with_capacity(count * 6);
    for i in 0..count {
        vertices.extend(quad_vertices(i as f32 * 2.0, y, 1.0, 1.0, [1.0; 4]));
        let base = (i * 4) as u16;
        indices.extend(grafo_batch::quad_indices().iter().map(|index| index + base));
    }
    (vertices, indices)
}

/// A screen image and a shader, created through the queue they will be drawn with.
#[derive(Debug, Clone)]
pub struct SceneResources {
    pub screen: Image,
    pub shader: Shader,
}

impl SceneResources {
    pub fn create(queue: &mut CommandQueue) -> Self {
        Self::create_with_program(queue, TestProgram::all_reachable())
    }

    pub fn create_with_program(queue: &mut CommandQueue, program: TestProgram) -> Self {
        Self {
            screen: queue.new_screen_framebuffer_image(CANVAS_WIDTH, CANVAS_HEIGHT),
            shader: queue.new_shader(Arc::new(program)),
        }
    }

    /// Source-over draw of `vertices` onto the whole screen without sources or user uniforms.
    pub fn draw<'a>(&'a self, vertices: &'a [f32], indices: &'a [u16]) -> DrawTriangles<'a> {
        DrawTriangles {
            dst: &self.screen,
            srcs: [None; SHADER_IMAGE_COUNT],
            vertices,
            indices,
            blend: Blend::SOURCE_OVER,
            dst_region: Region::new(0.0, 0.0, CANVAS_WIDTH as f32, CANVAS_HEIGHT as f32),
            src_region: Region::default(),
            src_offsets: [[0.0; 2]; SHADER_IMAGE_COUNT - 1],
            shader: &self.shader,
            uniforms: &[],
            even_odd: false,
        }
    }
}
