// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The pure transform stage. Composed in a fixed order: resize/fit, rotate,
// flip, brightness, contrast, grayscale. Each step is a no-op when its
// option holds the identity value.

use image::DynamicImage;
use image::imageops::FilterType;
use tracing::instrument;

use bindery_core::options::{Flip, Options, ResampleFilter};

fn filter_type(filter: ResampleFilter) -> FilterType {
    match filter {
        ResampleFilter::Nearest => FilterType::Nearest,
        ResampleFilter::Linear => FilterType::Triangle,
        ResampleFilter::CatmullRom => FilterType::CatmullRom,
        ResampleFilter::Gaussian => FilterType::Gaussian,
        ResampleFilter::Lanczos => FilterType::Lanczos3,
    }
}

/// Derive missing target dimensions from the source aspect ratio, rounded
/// to the nearest integer and never below 1.
fn derive_dims(src_w: u32, src_h: u32, width: u32, height: u32) -> (u32, u32) {
    match (width, height) {
        (0, 0) => (src_w, src_h),
        (0, h) => {
            let w = (h as f64 * src_w as f64 / src_h as f64 + 0.5).floor().max(1.0);
            (w as u32, h)
        }
        (w, 0) => {
            let h = (w as f64 * src_h as f64 / src_w as f64 + 0.5).floor().max(1.0);
            (w, h as u32)
        }
        (w, h) => (w, h),
    }
}

/// Resize to exactly the requested dimensions, deriving a missing one from
/// the aspect ratio.
pub fn resize(img: DynamicImage, width: u32, height: u32, filter: ResampleFilter) -> DynamicImage {
    let (dst_w, dst_h) = derive_dims(img.width(), img.height(), width, height);
    if dst_w == img.width() && dst_h == img.height() {
        return img;
    }
    img.resize_exact(dst_w, dst_h, filter_type(filter))
}

/// Fit inside the `width` x `height` bounding box, preserving aspect ratio.
/// Images already inside the box are returned unchanged; fit never upscales.
/// With only one dimension given, fit degrades to aspect-preserving resize.
pub fn fit(img: DynamicImage, width: u32, height: u32, filter: ResampleFilter) -> DynamicImage {
    if width == 0 || height == 0 {
        return resize(img, width, height, filter);
    }
    if img.width() <= width && img.height() <= height {
        return img;
    }
    img.resize(width, height, filter_type(filter))
}

/// Apply the configured geometric and tonal transforms to one page.
#[instrument(skip(img, opts), fields(w = img.width(), h = img.height()))]
pub fn transform(img: DynamicImage, opts: &Options) -> DynamicImage {
    let mut i = img;

    if opts.width > 0 || opts.height > 0 {
        i = if opts.fit {
            fit(i, opts.width, opts.height, opts.filter)
        } else {
            resize(i, opts.width, opts.height, opts.filter)
        };
    }

    i = match opts.rotate {
        90 => i.rotate90(),
        180 => i.rotate180(),
        270 => i.rotate270(),
        _ => i,
    };

    i = match opts.flip {
        Flip::None => i,
        Flip::Horizontal => i.fliph(),
        Flip::Vertical => i.flipv(),
    };

    if opts.brightness != 0.0 {
        // Percentage in [-100, 100] mapped onto the 8-bit channel range.
        let offset = (opts.brightness.clamp(-100.0, 100.0) / 100.0 * 255.0).round() as i32;
        i = i.brighten(offset);
    }

    if opts.contrast != 0.0 {
        i = i.adjust_contrast(opts.contrast.clamp(-100.0, 100.0));
    }

    if opts.grayscale {
        i = i.grayscale();
    }

    i
}
