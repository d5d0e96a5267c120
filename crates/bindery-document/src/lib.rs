// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bindery-document — Per-page image processing for the Bindery converter.
//
// Provides codec dispatch (decode with fallback, encode per target format),
// the pure transform stage (resize/fit, rotate, flip, brightness, contrast,
// grayscale), Photoshop-style levels, PDF page rendering, and the
// freedesktop thumbnail writer.

pub mod image;
pub mod pdf;
pub mod thumbnail;

// Re-export the primary entry points so callers can use
// `bindery_document::transform` etc.
pub use crate::image::codec::{decode, encode, is_grayscale};
pub use crate::image::levels::apply_levels;
pub use crate::image::transform::transform;
pub use crate::pdf::render::{DocumentRenderer, open_document};
pub use crate::thumbnail::write_thumbnail;
