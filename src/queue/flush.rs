use super::*;

/// A run of commands whose draws all index the same vertex upload.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Chunk {
    command_count: usize,
    vertex_float_count: usize,
    index_count: usize,
}

/// Takes the longest prefix of `commands` fitting one upload. The first command is always taken.
fn next_chunk(commands: &[Command]) -> Chunk {
    let mut chunk = Chunk::default();
    for command in commands {
        if let Command::DrawTriangles(draw) = command {
            assert!(
                draw.index_count <= INDICES_COUNT,
                "a queued draw carries {} indices, more than the {INDICES_COUNT} one upload can hold",
                draw.index_count
            );
            if chunk.command_count > 0
                && must_use_different_vertex_buffer(
                    chunk.vertex_float_count + draw.vertex_float_count(),
                    chunk.index_count + draw.index_count,
                )
            {
                break;
            }
            chunk.vertex_float_count += draw.vertex_float_count();
            chunk.index_count += draw.index_count;
        }
        chunk.command_count += 1;
    }
    chunk
}

impl CommandBuffer {
    /// Replays every command between one `begin`/`end` pair.
    ///
    /// `end` runs whenever `begin` succeeded; its error is reported only if nothing failed before.
    fn execute(
        &self,
        driver: &mut dyn GraphicsDriver,
        end_frame: bool,
    ) -> Result<FlushStats, CommandError> {
        let _span = debug_span!("flush", end_frame, commands = self.commands.len()).entered();

        driver.begin()?;
        let replayed = self.replay(driver);
        let ended = driver.end(end_frame);
        match (replayed, ended) {
            (Ok(stats), Ok(())) => Ok(stats),
            (Ok(_), Err(error)) => Err(error.into()),
            (Err(error), Ok(())) => Err(error),
            (Err(error), Err(end_error)) => {
                warn!(%end_error, "ending the frame failed after an earlier error");
                Err(error)
            }
        }
    }

    fn replay(&self, driver: &mut dyn GraphicsDriver) -> Result<FlushStats, CommandError> {
        let mut stats = FlushStats::default();
        let mut commands = self.commands.as_slice();
        let mut vertices = self.vertices.as_slice();
        let mut indices = self.indices.as_slice();

        while !commands.is_empty() {
            let chunk = next_chunk(commands);
            if chunk.index_count > 0 {
                driver.set_vertices(
                    &vertices[..chunk.vertex_float_count],
                    &indices[..chunk.index_count],
                )?;
                stats.vertex_uploads += 1;
                stats.uploaded_indices += chunk.index_count;
            }
            vertices = &vertices[chunk.vertex_float_count..];
            indices = &indices[chunk.index_count..];

            let mut index_offset = 0;
            for command in &commands[..chunk.command_count] {
                trace!("{command}");
                command.exec(driver, index_offset, &self.floats)?;
                stats.commands += 1;
                if let Command::DrawTriangles(draw) = command {
                    index_offset += draw.index_count;
                    stats.draw_calls += 1;
                }
            }
            commands = &commands[chunk.command_count..];
        }
        Ok(stats)
    }
}

impl CommandQueue {
    /// Replays every queued command on the driver thread and resets the queue.
    ///
    /// With `end_frame`, the driver is told to present and the per-frame uniform storage is
    /// released. A flush with nothing queued and no frame end is a no-op. On error the queue is
    /// reset all the same and the error is returned.
    pub fn flush(&mut self, thread: &DriverThread, end_frame: bool) -> Result<(), CommandError> {
        if self.buffer.commands.is_empty() && !end_frame {
            return Ok(());
        }

        let buffer = std::mem::take(&mut self.buffer);
        let result = match thread.run(move |driver| {
            let result = buffer.execute(driver, end_frame);
            (buffer, result)
        }) {
            Ok((buffer, result)) => {
                self.buffer = buffer;
                result
            }
            Err(error) => Err(error),
        };
        self.recycle(end_frame);

        let merged_draws = std::mem::take(&mut self.merged_draws);
        let mut stats = result?;
        stats.merged_draws = merged_draws;
        debug!(
            commands = stats.commands,
            draw_calls = stats.draw_calls,
            vertex_uploads = stats.vertex_uploads,
            merged_draws = stats.merged_draws,
            "flushed command queue"
        );
        self.last_flush_stats = stats;
        Ok(())
    }

    fn recycle(&mut self, end_frame: bool) {
        for command in self.buffer.commands.drain(..) {
            if let Command::DrawTriangles(draw) = command {
                self.draw_triangles_pool.put(draw);
            }
        }
        self.buffer.vertices.clear();
        self.buffer.indices.clear();
        self.chunk_vertex_float_count = 0;
        self.chunk_index_count = 0;
        if end_frame {
            self.buffer.floats.reset();
        }
    }

    /// Flushes the queue and returns the RGBA8 pixels of `region` of `image`.
    pub fn read_pixels(
        &mut self,
        thread: &DriverThread,
        image: &Image,
        region: PixelRect,
    ) -> Result<Vec<u8>, CommandError> {
        let result = Arc::new(Mutex::new(Vec::new()));
        self.enqueue(Command::ReadPixels(ReadPixelsCommand {
            image: image.clone(),
            region,
            result: Arc::clone(&result),
        }));
        self.flush(thread, false)?;
        let mut pixels = result.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(std::mem::take(&mut *pixels))
    }

    /// Flushes the queue and asks the driver whether `image` lost its contents.
    pub fn is_invalidated(
        &mut self,
        thread: &DriverThread,
        image: &Image,
    ) -> Result<bool, CommandError> {
        let result = Arc::new(AtomicBool::new(false));
        self.enqueue(Command::IsInvalidated(IsInvalidatedCommand {
            image: image.clone(),
            result: Arc::clone(&result),
        }));
        self.flush(thread, false)?;
        Ok(result.load(Ordering::Acquire))
    }
}
