use super::*;

impl CommandQueue {
    /// Records a triangle draw, folding it into the previous command when they are compatible.
    ///
    /// # Panics
    ///
    /// Panics if `draw.indices` holds more than [`INDICES_COUNT`] indices.
    pub fn enqueue_draw_triangles(&mut self, draw: DrawTriangles<'_>) {
        assert!(
            draw.indices.len() <= INDICES_COUNT,
            "a single draw can carry at most {INDICES_COUNT} indices, got {}",
            draw.indices.len()
        );
        debug_assert_eq!(draw.vertices.len() % VERTEX_FLOAT_COUNT, 0);

        let mut split = false;
        if must_use_different_vertex_buffer(
            self.chunk_vertex_float_count + draw.vertices.len(),
            self.chunk_index_count + draw.indices.len(),
        ) {
            self.chunk_vertex_float_count = 0;
            self.chunk_index_count = 0;
            split = true;
        }

        let vertex_start = self.buffer.vertices.len();
        self.buffer.vertices.extend_from_slice(draw.vertices);
        let base = (self.chunk_vertex_float_count / VERTEX_FLOAT_COUNT) as u16;
        self.buffer
            .indices
            .extend(draw.indices.iter().map(|&index| index + base));
        self.chunk_vertex_float_count += draw.vertices.len();
        self.chunk_index_count += draw.indices.len();

        let mut command = self.draw_triangles_pool.get();
        command.target = Some(DrawTarget {
            dst: draw.dst.clone(),
            srcs: draw.srcs.map(|src| src.cloned()),
            shader: draw.shader.clone(),
        });
        command.vertices = vertex_start..self.buffer.vertices.len();
        command.index_count = draw.indices.len();
        command.blend = draw.blend;
        command.dst_region = draw.dst_region;
        command.even_odd = draw.even_odd;
        prepend_preserved_uniforms(
            &mut self.buffer.floats,
            &mut command.uniforms,
            &PreservedUniformInputs {
                dst: draw.dst,
                srcs: &draw.srcs,
                offsets: draw.src_offsets,
                dst_region: draw.dst_region,
                src_region: draw.src_region,
            },
            draw.uniforms,
        );
        command
            .uniforms
            .clear_unreachable(draw.shader.program().as_ref());

        // A draw that opened a new chunk indexes a different upload than the previous command.
        if !split {
            if let Some(Command::DrawTriangles(last)) = self.buffer.commands.last_mut() {
                if last.can_merge(&command, &self.buffer.vertices, &self.buffer.floats) {
                    last.merge(&command);
                    self.merged_draws += 1;
                    self.draw_triangles_pool.put(command);
                    return;
                }
            }
        }
        self.buffer.commands.push(Command::DrawTriangles(command));
    }

    pub(super) fn enqueue(&mut self, command: Command) {
        self.buffer.commands.push(command);
    }

    /// Creates an image handle. The driver resource is created when the queue is next flushed.
    pub fn new_image(&mut self, width: u32, height: u32) -> Image {
        let image = Image::new(width, height, false);
        self.enqueue(Command::NewImage(NewImageCommand {
            result: image.clone(),
        }));
        image
    }

    /// Like [`CommandQueue::new_image`], backed by the screen framebuffer.
    pub fn new_screen_framebuffer_image(&mut self, width: u32, height: u32) -> Image {
        let image = Image::new(width, height, true);
        self.enqueue(Command::NewImage(NewImageCommand {
            result: image.clone(),
        }));
        image
    }

    pub fn new_shader(&mut self, program: Arc<dyn ShaderProgram>) -> Shader {
        let shader = Shader::new(program);
        self.enqueue(Command::NewShader(NewShaderCommand {
            result: shader.clone(),
        }));
        shader
    }

    pub fn write_pixels(&mut self, dst: &Image, args: Vec<WritePixelsArgs>) {
        self.enqueue(Command::WritePixels(WritePixelsCommand {
            dst: dst.clone(),
            args,
        }));
    }

    pub fn dispose_image(&mut self, image: &Image) {
        self.enqueue(Command::DisposeImage(DisposeImageCommand {
            target: image.clone(),
        }));
    }

    pub fn dispose_shader(&mut self, shader: &Shader) {
        self.enqueue(Command::DisposeShader(DisposeShaderCommand {
            target: shader.clone(),
        }));
    }
}
