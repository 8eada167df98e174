//! Batching behavior of the command queue, observed through a recording driver.
//!
//! Run with:   cargo test --test batching

use grafo_batch::{
    quad_indices, Blend, CommandError, CommandQueue, DriverThread, FlushStats, VertexBackend,
    VERTEX_FLOAT_COUNT,
};
use grafo_batch_test_scenes::{
    quad_row, quad_vertices, CallLog, DriverCall, FailurePoint, RecordingDriver,
    SceneResources, TestProgram,
};
use proptest::prelude::*;

fn spawn() -> (DriverThread, CallLog) {
    let (driver, log) = RecordingDriver::new();
    (DriverThread::spawn(driver).unwrap(), log)
}

#[test]
fn compatible_draws_replay_as_one_draw_call() {
    let (thread, log) = spawn();
    let mut queue = CommandQueue::new();
    let scene = SceneResources::create(&mut queue);

    for i in 0..3 {
        let vertices = quad_vertices(i as f32 * 10.0, 0.0, 8.0, 8.0, [1.0, 0.0, 0.0, 1.0]);
        queue.enqueue_draw_triangles(scene.draw(&vertices, quad_indices()));
    }
    queue.flush(&thread, true).unwrap();

    let draws = log.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].index_count, 18);
    assert_eq!(draws[0].index_offset, 0);
    assert_eq!(draws[0].uniforms[0], [256.0, 256.0]);
    assert_eq!(draws[0].uniforms.len(), 8);

    let uploads = log.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0.len(), 12 * VERTEX_FLOAT_COUNT);
    assert_eq!(
        uploads[0].1,
        [0, 1, 2, 1, 2, 3, 4, 5, 6, 5, 6, 7, 8, 9, 10, 9, 10, 11]
    );

    assert_eq!(
        queue.last_flush_stats(),
        FlushStats {
            commands: 3,
            draw_calls: 1,
            vertex_uploads: 1,
            uploaded_indices: 18,
            merged_draws: 2,
        }
    );
    assert_eq!(log.calls().first(), Some(&DriverCall::Begin));
    assert_eq!(log.calls().last(), Some(&DriverCall::End { present: true }));
}

#[test]
fn blend_change_starts_a_new_draw_in_the_same_upload() {
    let (thread, log) = spawn();
    let mut queue = CommandQueue::new();
    let scene = SceneResources::create(&mut queue);
    let first = quad_vertices(0.0, 0.0, 4.0, 4.0, [1.0; 4]);
    let second = quad_vertices(8.0, 0.0, 4.0, 4.0, [1.0; 4]);

    queue.enqueue_draw_triangles(scene.draw(&first, quad_indices()));
    let mut copy = scene.draw(&second, quad_indices());
    copy.blend = Blend::COPY;
    queue.enqueue_draw_triangles(copy);
    queue.flush(&thread, false).unwrap();

    let draws = log.draws();
    assert_eq!(draws.len(), 2);
    assert_eq!((draws[0].index_offset, draws[0].index_count), (0, 6));
    assert_eq!((draws[1].index_offset, draws[1].index_count), (6, 6));
    assert_eq!(draws[1].blend, Blend::COPY);
    assert_eq!(log.uploads().len(), 1);
    assert_eq!(log.calls().last(), Some(&DriverCall::End { present: false }));
}

#[test]
fn overlapping_even_odd_fills_are_not_merged() {
    let (thread, log) = spawn();
    let mut queue = CommandQueue::new();
    let scene = SceneResources::create(&mut queue);
    let first = quad_vertices(0.0, 0.0, 10.0, 10.0, [1.0; 4]);
    let second = quad_vertices(5.0, 5.0, 10.0, 10.0, [1.0; 4]);

    for vertices in [&first, &second] {
        let mut draw = scene.draw(vertices, quad_indices());
        draw.even_odd = true;
        queue.enqueue_draw_triangles(draw);
    }
    queue.flush(&thread, true).unwrap();

    let draws = log.draws();
    assert_eq!(draws.len(), 2);
    assert!(draws.iter().all(|draw| draw.even_odd));
    assert_eq!(draws[1].index_offset, 6);
}

#[test]
fn separated_even_odd_fills_merge() {
    let (thread, log) = spawn();
    let mut queue = CommandQueue::new();
    let scene = SceneResources::create(&mut queue);
    // 1.5 pixels apart: just outside the one pixel overlap margin.
    let first = quad_vertices(0.0, 0.0, 10.0, 10.0, [1.0; 4]);
    let second = quad_vertices(11.5, 0.0, 10.0, 10.0, [1.0; 4]);
    // Half a pixel apart: inside the margin.
    let third = quad_vertices(22.0, 0.0, 10.0, 10.0, [1.0; 4]);

    for vertices in [&first, &second, &third] {
        let mut draw = scene.draw(vertices, quad_indices());
        draw.even_odd = true;
        queue.enqueue_draw_triangles(draw);
    }
    queue.flush(&thread, true).unwrap();

    let draws = log.draws();
    assert_eq!(draws.len(), 2);
    assert!(draws.iter().all(|draw| draw.even_odd));
    assert_eq!((draws[0].index_offset, draws[0].index_count), (0, 12));
    assert_eq!((draws[1].index_offset, draws[1].index_count), (12, 6));
    assert_eq!(queue.last_flush_stats().merged_draws, 1);
}

#[test]
fn large_batches_are_split_into_separately_indexed_uploads() {
    let (thread, log) = spawn();
    let mut queue = CommandQueue::new();
    let scene = SceneResources::create(&mut queue);
    let (vertices, indices) = quad_row(2000, 0.0);

    for _ in 0..7 {
        queue.enqueue_draw_triangles(scene.draw(&vertices, &indices));
    }
    queue.flush(&thread, true).unwrap();

    // 12000 indices per draw: five fit one upload, the rest go to a second one.
    let uploads = log.uploads();
    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads[0].1.len(), 5 * indices.len());
    assert_eq!(uploads[1].1.len(), 2 * indices.len());
    for (upload_vertices, upload_indices) in &uploads {
        let vertex_count = upload_vertices.len() / VERTEX_FLOAT_COUNT;
        assert!(upload_indices.iter().all(|&index| (index as usize) < vertex_count));
    }

    // Undoing the rebasing gives back the indices of every enqueued draw.
    for (upload_vertices, upload_indices) in &uploads {
        let per_draw_vertices = vertices.len() / VERTEX_FLOAT_COUNT;
        assert_eq!(upload_vertices.len() / vertices.len() * indices.len(), upload_indices.len());
        for (draw, chunk) in upload_indices.chunks(indices.len()).enumerate() {
            let base = (draw * per_draw_vertices) as u16;
            let original: Vec<u16> = chunk.iter().map(|index| index - base).collect();
            assert_eq!(original, indices);
        }
    }

    let draws = log.draws();
    assert_eq!(draws.len(), 2);
    assert_eq!((draws[0].index_offset, draws[0].index_count), (0, 60000));
    assert_eq!((draws[1].index_offset, draws[1].index_count), (0, 24000));
    assert_eq!(queue.last_flush_stats().vertex_uploads, 2);
}

#[test]
fn failed_draw_still_ends_the_frame_and_resets_the_queue() {
    let (thread, log) = spawn();
    let mut queue = CommandQueue::new();
    let scene = SceneResources::create(&mut queue);
    let vertices = quad_vertices(0.0, 0.0, 4.0, 4.0, [1.0; 4]);

    log.fail_on(FailurePoint::DrawTriangles);
    queue.enqueue_draw_triangles(scene.draw(&vertices, quad_indices()));
    let error = queue.flush(&thread, true).unwrap_err();
    assert!(matches!(error, CommandError::Driver(_)));
    assert_eq!(log.calls().last(), Some(&DriverCall::End { present: true }));
    assert!(queue.is_empty());
    assert_eq!(queue.vertex_float_count(), 0);
    assert_eq!(queue.index_count(), 0);

    log.clear_failures();
    log.take();
    queue.enqueue_draw_triangles(scene.draw(&vertices, quad_indices()));
    queue.flush(&thread, true).unwrap();
    assert_eq!(log.draws().len(), 1);
}

#[test]
fn failed_begin_skips_the_rest_of_the_frame() {
    let (thread, log) = spawn();
    let mut queue = CommandQueue::new();
    let scene = SceneResources::create(&mut queue);
    let vertices = quad_vertices(0.0, 0.0, 4.0, 4.0, [1.0; 4]);
    queue.enqueue_draw_triangles(scene.draw(&vertices, quad_indices()));

    log.fail_on(FailurePoint::Begin);
    assert!(queue.flush(&thread, true).is_err());
    assert_eq!(log.calls(), [DriverCall::Begin]);
    assert!(queue.is_empty());
}

#[test]
fn end_failure_is_reported_when_nothing_failed_before() {
    let (thread, log) = spawn();
    let mut queue = CommandQueue::new();

    log.fail_on(FailurePoint::End);
    let error = queue.flush(&thread, true).unwrap_err();
    assert_eq!(error.to_string(), "graphics driver error: injected End failure");
}

#[test]
fn earlier_error_wins_over_end_failure() {
    let (thread, log) = spawn();
    let mut queue = CommandQueue::new();
    let scene = SceneResources::create(&mut queue);
    let vertices = quad_vertices(0.0, 0.0, 4.0, 4.0, [1.0; 4]);
    queue.enqueue_draw_triangles(scene.draw(&vertices, quad_indices()));

    log.fail_on(FailurePoint::SetVertices);
    log.fail_on(FailurePoint::End);
    let error = queue.flush(&thread, true).unwrap_err();
    assert_eq!(error.to_string(), "graphics driver error: injected SetVertices failure");
}

#[test]
fn empty_flush_only_touches_the_driver_at_frame_end() {
    let (thread, log) = spawn();
    let mut queue = CommandQueue::new();

    queue.flush(&thread, false).unwrap();
    assert!(log.calls().is_empty());

    queue.flush(&thread, true).unwrap();
    assert_eq!(
        log.calls(),
        [DriverCall::Begin, DriverCall::End { present: true }]
    );
}

#[test]
fn pool_keeps_at_most_its_capacity_after_a_flush() {
    let (thread, _log) = spawn();
    let mut queue = CommandQueue::new();
    let scene = SceneResources::create(&mut queue);
    let vertices = quad_vertices(0.0, 0.0, 4.0, 4.0, [1.0; 4]);

    for i in 0..1500 {
        let mut draw = scene.draw(&vertices, quad_indices());
        draw.blend = if i % 2 == 0 { Blend::SOURCE_OVER } else { Blend::COPY };
        queue.enqueue_draw_triangles(draw);
    }
    assert_eq!(queue.len(), 1502);
    queue.flush(&thread, true).unwrap();

    assert_eq!(queue.pooled_draw_commands(), CommandQueue::DEFAULT_POOL_CAPACITY);
}

#[test]
fn unreachable_uniforms_reach_the_driver_empty() {
    let (thread, log) = spawn();
    let mut queue = CommandQueue::new();
    let scene = SceneResources::create_with_program(
        &mut queue,
        TestProgram::with_unreachable([1, 4, 5, 6]),
    );
    let vertices = quad_vertices(0.0, 0.0, 4.0, 4.0, [1.0; 4]);
    let tint: &[f32] = &[0.5, 0.5, 0.5, 1.0];
    let uniforms = [tint];

    let mut draw = scene.draw(&vertices, quad_indices());
    draw.uniforms = &uniforms;
    queue.enqueue_draw_triangles(draw);
    queue.flush(&thread, true).unwrap();

    let draws = log.draws();
    let draw = &draws[0];
    assert_eq!(draw.uniforms.len(), 9);
    for index in [1, 4, 5, 6] {
        assert!(draw.uniforms[index].is_empty(), "uniform {index}");
    }
    assert_eq!(draw.uniforms[8], [0.5, 0.5, 0.5, 1.0]);
}

#[test]
fn draw_referencing_an_image_from_an_unflushed_queue_fails() {
    let (thread, _log) = spawn();
    let mut other = CommandQueue::new();
    let unflushed = SceneResources::create(&mut other);

    let mut queue = CommandQueue::new();
    let vertices = quad_vertices(0.0, 0.0, 4.0, 4.0, [1.0; 4]);
    queue.enqueue_draw_triangles(unflushed.draw(&vertices, quad_indices()));
    let error = queue.flush(&thread, true).unwrap_err();

    assert!(matches!(
        error,
        CommandError::UnrealizedImage(id) if id == unflushed.screen.id()
    ));
}

#[test]
fn vertex_backend_window_feeds_the_queue() {
    let (thread, log) = spawn();
    let mut queue = CommandQueue::new();
    let scene = SceneResources::create(&mut queue);
    let backend = VertexBackend::new();

    backend
        .lock_and_reset(|arena| {
            let vertices = arena.quad(
                [0.0, 0.0, 16.0, 16.0],
                [1.0, 0.0, 0.0, 1.0, 32.0, 32.0],
                [1.0; 4],
            );
            queue.enqueue_draw_triangles(scene.draw(vertices, quad_indices()));
            queue.flush(&thread, true)
        })
        .unwrap();

    let uploads = log.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(&uploads[0].0[..4], &[32.0, 32.0, 0.0, 0.0]);
    assert_eq!(&uploads[0].0[24..28], &[48.0, 48.0, 16.0, 16.0]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn replayed_draws_cover_every_enqueued_index(
        draws in prop::collection::vec((1usize..6, any::<bool>()), 1..24)
    ) {
        let (thread, log) = spawn();
        let mut queue = CommandQueue::new();
        let scene = SceneResources::create(&mut queue);

        let mut expected_indices = Vec::new();
        let mut expected_draw_calls = 0;
        let mut previous_blend = None;
        let mut vertex_base = 0u16;
        for (quads, copy) in &draws {
            let (vertices, indices) = quad_row(*quads, 0.0);
            let blend = if *copy { Blend::COPY } else { Blend::SOURCE_OVER };
            if previous_blend != Some(blend) {
                expected_draw_calls += 1;
            }
            previous_blend = Some(blend);
            expected_indices.extend(indices.iter().map(|index| index + vertex_base));
            vertex_base += (vertices.len() / VERTEX_FLOAT_COUNT) as u16;

            let mut draw = scene.draw(&vertices, &indices);
            draw.blend = blend;
            queue.enqueue_draw_triangles(draw);
        }
        queue.flush(&thread, true).unwrap();

        let recorded = log.draws();
        prop_assert_eq!(recorded.len(), expected_draw_calls);
        let mut offset = 0;
        for draw in &recorded {
            prop_assert_eq!(draw.index_offset, offset);
            offset += draw.index_count;
        }
        prop_assert_eq!(offset, expected_indices.len());
        let uploads = log.uploads();
        prop_assert_eq!(uploads.len(), 1);
        prop_assert_eq!(&uploads[0].1, &expected_indices);
    }
}
