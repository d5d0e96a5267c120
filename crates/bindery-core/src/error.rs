// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Bindery.

use thiserror::Error;

/// Top-level error type for all Bindery operations.
#[derive(Debug, Error)]
pub enum BinderyError {
    // -- Input errors --
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("document error: {0}")]
    Document(String),

    // -- Pipeline errors --
    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("image encode failed: {0}")]
    Encode(String),

    #[error("worker task failed: {0}")]
    Worker(String),

    // -- Metadata operations --
    #[error("invalid glob pattern: {0}")]
    Pattern(String),

    // -- Storage --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The shared cancellation token fired. Not a failure: callers clean up
    /// and report nothing to the user.
    #[error("conversion cancelled")]
    Cancelled,
}

impl BinderyError {
    /// True when this error is a cancellation rather than a real failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BinderyError::Cancelled)
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BinderyError>;
