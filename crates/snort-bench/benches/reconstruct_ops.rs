//! Criterion benchmarks for state reconstruction and cross-file validation.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use snort_bench::{build_recording, machine_registry, synthetic_frames};
use snort_replay::{validate_memory, ReplayFile};

fn recording(frames: usize, seed: u64) -> ReplayFile {
    let registry = machine_registry();
    ReplayFile::from_data(build_recording(
        &registry,
        &synthetic_frames(&registry, frames, 8, seed),
    ))
}

/// Benchmark: fold 2000 instructions into the final state.
fn bench_reconstruct_last(c: &mut Criterion) {
    let file = recording(2000, 3);
    c.bench_function("reconstruct_last_of_2000", |b| {
        b.iter(|| black_box(file.reconstruct(1999).unwrap()));
    });
}

/// Benchmark: step a cursor through every instruction.
fn bench_cursor_scrub(c: &mut Criterion) {
    let file = recording(2000, 3);
    c.bench_function("cursor_scrub_2000", |b| {
        b.iter(|| {
            let mut cursor = file.cursor().unwrap();
            while cursor.step_forward().is_ok() {}
            black_box(cursor.position());
        });
    });
}

/// Benchmark: validate two identical 2000-instruction recordings.
fn bench_validate_identical(c: &mut Criterion) {
    let left = recording(2000, 5);
    let right = recording(2000, 5);
    c.bench_function("validate_memory_2000", |b| {
        b.iter(|| black_box(validate_memory(&left, &right).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_reconstruct_last,
    bench_cursor_scrub,
    bench_validate_identical
);
criterion_main!(benches);
