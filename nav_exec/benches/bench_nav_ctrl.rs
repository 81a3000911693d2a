//! # Navigation Decision Benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use comms_if::eqpt::{
    drive::DriveCmd,
    marker::{BoundingBox, Detection},
};
use nav_lib::{
    cmd_debounce,
    data_store::CmdLog,
    drive_client::SimLink,
    steer_ctrl::calc_steer,
    target_sel::select_target,
};

const FRAME_WIDTH: u32 = 640;

/// Build a spread of detections of varying size across the frame.
fn dummy_detections(num: usize) -> Vec<Detection> {
    (0..num)
        .map(|i| {
            let size = 20 + (i as u32 * 37) % 180;
            let x = ((i as u32 * 113) % (FRAME_WIDTH - size)) as i32;
            Detection::new(BoundingBox::new(x, 50, size, size), "ROBOT_TARGET")
        })
        .collect()
}

fn decision_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_and_steer");

    for num in [0usize, 1, 4, 16, 64].iter() {
        let detections = dummy_detections(*num);

        group.bench_with_input(BenchmarkId::from_parameter(num), &detections, |b, dets| {
            b.iter(|| calc_steer(select_target(black_box(dets)), black_box(FRAME_WIDTH)))
        });
    }

    group.finish();

    // Debouncer fed with a repeating command sequence, mostly suppressed
    let cmds = [
        DriveCmd::Forward,
        DriveCmd::Forward,
        DriveCmd::Left,
        DriveCmd::Left,
        DriveCmd::Forward,
        DriveCmd::Stop,
    ];
    let now = chrono::Utc::now();

    c.bench_function("debounce", |b| {
        let mut log = CmdLog::default();
        let mut link = SimLink::default();
        b.iter(|| {
            for cmd in cmds.iter() {
                cmd_debounce::submit(&mut log, &mut link, black_box(*cmd), now);
            }
        })
    });
}

criterion_group!(benches, decision_benchmark);
criterion_main!(benches);
