// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Photoshop-style levels: remap input black/white points through a gamma
// curve onto output black/white points. Applied per RGB channel on the
// 0-255 scale; alpha passes through untouched.

use image::{DynamicImage, Rgba};
use tracing::debug;

use bindery_core::options::Levels;

/// Build the 256-entry remap table for the given parameters.
fn remap_table(levels: &Levels) -> [u8; 256] {
    let in_lo = levels.in_min.clamp(0.0, 255.0);
    let in_hi = levels.in_max.clamp(0.0, 255.0);
    let out_lo = levels.out_min.clamp(0.0, 255.0);
    let out_hi = levels.out_max.clamp(0.0, 255.0);
    // Degenerate input range collapses to the output low point.
    let in_span = (in_hi - in_lo).max(f32::EPSILON);
    let gamma = if levels.gamma > 0.0 { levels.gamma } else { 1.0 };

    let mut table = [0u8; 256];
    for (v, slot) in table.iter_mut().enumerate() {
        let normalized = ((v as f32 - in_lo) / in_span).clamp(0.0, 1.0);
        let curved = normalized.powf(1.0 / gamma);
        *slot = (out_lo + curved * (out_hi - out_lo)).round().clamp(0.0, 255.0) as u8;
    }
    table
}

/// Apply the levels operation to an image.
///
/// Callers skip this entirely for identity parameters; applying identity
/// levels is still a pixel-exact no-op.
pub fn apply_levels(img: DynamicImage, levels: &Levels) -> DynamicImage {
    let table = remap_table(levels);

    let mut rgba = img.to_rgba8();
    for Rgba([r, g, b, _a]) in rgba.pixels_mut() {
        *r = table[*r as usize];
        *g = table[*g as usize];
        *b = table[*b as usize];
    }

    debug!(
        in_min = levels.in_min,
        in_max = levels.in_max,
        gamma = levels.gamma,
        "levels applied"
    );
    DynamicImage::ImageRgba8(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn gradient() -> DynamicImage {
        let img = RgbaImage::from_fn(16, 1, |x, _| {
            let v = (x * 16) as u8;
            Rgba([v, v, v, 255])
        });
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn identity_parameters_leave_pixels_unchanged() {
        let src = gradient();
        let out = apply_levels(src.clone(), &Levels::default());
        assert_eq!(src.to_rgba8().as_raw(), out.to_rgba8().as_raw());
    }

    #[test]
    fn narrowing_input_range_stretches_contrast() {
        let levels = Levels {
            in_min: 64.0,
            in_max: 192.0,
            ..Levels::default()
        };
        let table = remap_table(&levels);
        assert_eq!(table[0], 0);
        assert_eq!(table[64], 0);
        assert_eq!(table[192], 255);
        assert_eq!(table[255], 255);
        // Midpoint of the input range lands at the midpoint of the output.
        assert_eq!(table[128], 128);
    }

    #[test]
    fn output_range_compresses_extremes() {
        let levels = Levels {
            out_min: 50.0,
            out_max: 200.0,
            ..Levels::default()
        };
        let table = remap_table(&levels);
        assert_eq!(table[0], 50);
        assert_eq!(table[255], 200);
    }

    #[test]
    fn gamma_brightens_midtones() {
        let levels = Levels {
            gamma: 2.0,
            ..Levels::default()
        };
        let table = remap_table(&levels);
        assert!(table[64] > 64);
        assert_eq!(table[0], 0);
        assert_eq!(table[255], 255);
    }

    #[test]
    fn alpha_is_untouched() {
        let mut img = RgbaImage::new(1, 1);
        img.put_pixel(0, 0, Rgba([10, 20, 30, 77]));
        let levels = Levels {
            gamma: 0.5,
            ..Levels::default()
        };
        let out = apply_levels(DynamicImage::ImageRgba8(img), &levels);
        assert_eq!(out.to_rgba8().get_pixel(0, 0)[3], 77);
    }
}
