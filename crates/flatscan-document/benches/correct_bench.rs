// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the flatscan-document crate. Measures the
// perspective correction pass on a synthetic camera-sized frame.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{Rgba, RgbaImage};

use flatscan_core::{Quadrilateral, Sensor};
use flatscan_document::{PerspectiveCorrector, RasterImage};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Benchmark the full correction pass on a 640x480 frame.
///
/// The quad is a perspective-skewed trapezoid covering most of the frame, so
/// the homography is genuinely projective and the output is roughly
/// 440x400 pixels.
fn bench_perspective_correction(c: &mut Criterion) {
    let frame = RasterImage::from_rgba(RgbaImage::from_fn(640, 480, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    }));
    let quad: Quadrilateral<Sensor> = Quadrilateral::from_tuples([
        (180.0, 40.0),
        (470.0, 60.0),
        (600.0, 440.0),
        (60.0, 430.0),
    ]);
    let corrector = PerspectiveCorrector::default();

    c.bench_function("perspective_correction (640x480)", |b| {
        b.iter(|| {
            let result = corrector.correct(black_box(&frame), black_box(&quad));
            black_box(result.ok());
        });
    });

    c.bench_function("correction_plan", |b| {
        b.iter(|| black_box(corrector.plan(black_box(&quad)).ok()));
    });
}

criterion_group!(benches, bench_perspective_correction);
criterion_main!(benches);
