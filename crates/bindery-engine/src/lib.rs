// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bindery-engine — The conversion engine front-ends drive.
//
// Discovery expands caller paths into sources; a `Converter` turns each
// source into a CBZ/CBT with bounded parallelism, and also handles cover
// extraction, thumbnails, and archive metadata. Cancellation and progress
// are exposed as handles so a CLI or GUI can wire them up without touching
// the internals.

pub mod convert;
pub mod cover;
pub mod files;
pub mod scheduler;
pub mod session;

pub use crate::convert::Converter;
pub use crate::files::discover;
pub use crate::session::Progress;

// The error and option types callers need to drive the engine.
pub use bindery_core::error::{BinderyError, Result};
pub use bindery_core::options::{Flip, Levels, Options, OutputContainer, ResampleFilter};
pub use bindery_core::types::{ImageFormat, SourceFile, SourceKind};
