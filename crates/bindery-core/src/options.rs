// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion options. One `Options` value is snapshotted per conversion
// session and never mutated afterwards.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::ImageFormat;

/// Resampling filter used for resize and fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleFilter {
    /// Fastest, no antialiasing.
    Nearest,
    /// Bilinear, smooth and reasonably fast.
    Linear,
    /// Sharp bicubic.
    CatmullRom,
    /// Gaussian blur, useful for noise removal.
    Gaussian,
    /// High-quality, slower than the cubic filters.
    Lanczos,
}

/// Mirror direction applied after rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flip {
    None,
    Horizontal,
    Vertical,
}

/// Output container for the assembled comic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputContainer {
    /// ZIP with Deflate members (`.cbz`).
    Zip,
    /// Plain TAR (`.cbt`).
    Tar,
}

impl OutputContainer {
    pub fn ext(&self) -> &'static str {
        match self {
            Self::Zip => "cbz",
            Self::Tar => "cbt",
        }
    }
}

/// Photoshop-style levels parameters, on a 0-255 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Levels {
    /// Shadow input point.
    pub in_min: f32,
    /// Highlight input point.
    pub in_max: f32,
    /// Midpoint gamma.
    pub gamma: f32,
    /// Shadow output point.
    pub out_min: f32,
    /// Highlight output point.
    pub out_max: f32,
}

impl Default for Levels {
    fn default() -> Self {
        Self {
            in_min: 0.0,
            in_max: 255.0,
            gamma: 1.0,
            out_min: 0.0,
            out_max: 255.0,
        }
    }
}

impl Levels {
    /// Identity parameters are a no-op, so application is skipped entirely.
    pub fn is_identity(&self) -> bool {
        self.in_min == 0.0
            && self.in_max == 255.0
            && self.gamma == 1.0
            && self.out_min == 0.0
            && self.out_max == 255.0
    }
}

/// Conversion settings for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    /// Target image format for converted pages.
    pub format: ImageFormat,
    /// Encode quality for lossy formats (1-100).
    pub quality: u8,
    /// Target width in pixels; zero derives it from the height.
    pub width: u32,
    /// Target height in pixels; zero derives it from the width.
    pub height: u32,
    /// Fit inside the width x height box preserving aspect ratio instead of
    /// resizing to the exact dimensions.
    pub fit: bool,
    pub filter: ResampleFilter,
    /// Convert the cover page like any other page. When false the cover is
    /// still transformed but keeps its original encoding and name.
    pub convert_cover: bool,
    /// Re-encode only grayscale images; RGB pages are copied through.
    pub no_rgb: bool,
    /// Copy image bytes through without any conversion.
    pub no_convert: bool,
    /// Drop allow-listed non-image files instead of carrying them over.
    pub no_non_image: bool,
    /// Suffix appended to the output file's base name.
    pub suffix: String,
    /// Output directory for assembled archives, covers, and thumbnails.
    pub out_dir: PathBuf,
    pub grayscale: bool,
    /// Rotation in degrees; valid values are 0, 90, 180, 270.
    pub rotate: u16,
    pub flip: Flip,
    /// Brightness adjustment in percent, -100 to 100.
    pub brightness: f32,
    /// Contrast adjustment in percent, -100 to 100.
    pub contrast: f32,
    /// Process subdirectories recursively.
    pub recursive: bool,
    /// Only process inputs of at least this many megabytes; zero disables.
    pub min_size_mb: u64,
    /// Cap on concurrently processed pages; zero means one per CPU plus one.
    pub workers: usize,
    pub container: OutputContainer,
    pub levels: Levels,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            format: ImageFormat::Jpeg,
            quality: 75,
            width: 0,
            height: 0,
            fit: false,
            filter: ResampleFilter::Lanczos,
            convert_cover: true,
            no_rgb: false,
            no_convert: false,
            no_non_image: false,
            suffix: String::new(),
            out_dir: PathBuf::from("."),
            grayscale: false,
            rotate: 0,
            flip: Flip::None,
            brightness: 0.0,
            contrast: 0.0,
            recursive: false,
            min_size_mb: 0,
            workers: 0,
            container: OutputContainer::Zip,
            levels: Levels::default(),
        }
    }
}
