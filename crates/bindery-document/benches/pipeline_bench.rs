// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the bindery-document pipeline. Measures the pure
// transform stage and levels remapping on a synthetic page-sized image.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use bindery_core::options::{Levels, Options};
use bindery_document::{apply_levels, transform};

/// Build a synthetic comic page: a gradient so resampling and levels have
/// real pixel variation to chew on.
fn synthetic_page(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let v = ((x + y) % 256) as u8;
        Rgb([v, v.wrapping_add(40), v.wrapping_add(80)])
    });
    DynamicImage::ImageRgb8(img)
}

/// Benchmark the full transform stage with a typical downscale-and-grayscale
/// configuration on a 1000x1500 page.
fn bench_transform(c: &mut Criterion) {
    let page = synthetic_page(1000, 1500);
    let opts = Options {
        width: 800,
        fit: true,
        grayscale: true,
        ..Options::default()
    };

    c.bench_function("transform fit+grayscale (1000x1500)", |b| {
        b.iter(|| {
            let out = transform(black_box(page.clone()), &opts);
            black_box(out);
        });
    });
}

/// Benchmark the levels lookup-table remap on a 1000x1500 page.
fn bench_levels(c: &mut Criterion) {
    let page = synthetic_page(1000, 1500);
    let levels = Levels {
        in_min: 20.0,
        in_max: 235.0,
        gamma: 1.2,
        out_min: 0.0,
        out_max: 255.0,
    };

    c.bench_function("levels remap (1000x1500)", |b| {
        b.iter(|| {
            let out = apply_levels(black_box(page.clone()), &levels);
            black_box(out);
        });
    });
}

criterion_group!(benches, bench_transform, bench_levels);
criterion_main!(benches);
