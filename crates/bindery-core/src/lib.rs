// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bindery — Core types, options, and error definitions shared across all crates.

pub mod error;
pub mod natsort;
pub mod options;
pub mod types;

pub use error::BinderyError;
pub use options::{Flip, Levels, Options, OutputContainer, ResampleFilter};
pub use types::*;
