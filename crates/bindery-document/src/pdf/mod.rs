// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — page rendering for paginated documents.

pub mod render;

pub use render::{DocumentRenderer, PdfRenderer, open_document};
