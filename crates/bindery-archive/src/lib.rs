// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bindery-archive — Container I/O for the Bindery converter.
//
// Reading side: the `EntrySource` trait with ZIP, TAR, and directory
// implementations. Writing side: scratch-directory packing into CBZ/CBT
// plus in-place ZIP mutation (comment, member add/remove), both committed
// atomically via temp-file-then-rename.

pub mod mutate;
pub mod source;
pub mod writer;

pub use crate::mutate::{add_file, comment, remove_files, set_comment};
pub use crate::source::{EntrySource, RawEntry, open};
pub use crate::writer::{output_path, pack};
