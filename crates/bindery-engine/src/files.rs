// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Input discovery: expand the caller's paths into concrete conversion
// sources. Files classify by extension; directories expand to their
// matching children, or stand in as plain image directories when nothing
// inside classifies.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use bindery_core::error::Result;
use bindery_core::options::Options;
use bindery_core::types::{self, SourceFile, SourceKind};

/// Expand `paths` into conversion sources.
///
/// Plain files must classify as archives or documents and pass the size
/// filter; unmatched files are skipped with a warning. A directory expands
/// to its matching immediate children, or recursively to every matching
/// file in the tree plus any subdirectory holding more than one image
/// (treated as an unpacked comic). A directory with no matching children
/// at all becomes a single plain-image-directory source.
#[instrument(skip(paths, opts), fields(inputs = paths.len()))]
pub fn discover(paths: &[PathBuf], opts: &Options) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::new();
    for path in paths {
        let path = std::path::absolute(path)?;
        let meta = fs::metadata(&path)?;
        if meta.is_dir() {
            discover_dir(&path, opts, &mut sources)?;
        } else if let Some(found) = classify_file(&path, meta.len(), opts) {
            sources.push(found);
        }
    }
    debug!(sources = sources.len(), "discovery complete");
    Ok(sources)
}

fn classify_file(path: &Path, size: u64, opts: &Options) -> Option<SourceFile> {
    let Some(kind) = types::classify(path) else {
        warn!(path = %path.display(), "not a comic archive or document, skipping");
        return None;
    };
    if !types::size_ok(opts.min_size_mb, size) {
        debug!(path = %path.display(), size, "below size threshold, skipping");
        return None;
    }
    Some(SourceFile { path: path.to_path_buf(), kind, size })
}

fn discover_dir(dir: &Path, opts: &Options, sources: &mut Vec<SourceFile>) -> Result<()> {
    let before = sources.len();
    if opts.recursive {
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|err| {
                std::io::Error::other(format!("{}: {err}", dir.display()))
            })?;
            if entry.file_type().is_dir() {
                // A subdirectory holding more than one image is an unpacked
                // comic in its own right.
                if entry.path() != dir && image_count(entry.path())? > 1 {
                    sources.push(SourceFile {
                        path: entry.path().to_path_buf(),
                        kind: SourceKind::Directory,
                        size: 0,
                    });
                }
                continue;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            if let Some(found) = quiet_classify(entry.path(), size, opts) {
                sources.push(found);
            }
        }
    } else {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            if let Some(found) = quiet_classify(&entry.path(), meta.len(), opts) {
                sources.push(found);
            }
        }
        sources[before..].sort_by(|a, b| a.path.cmp(&b.path));
    }

    if sources.len() == before {
        // Nothing classified: treat the directory itself as a comic made of
        // loose images.
        sources.push(SourceFile {
            path: dir.to_path_buf(),
            kind: SourceKind::Directory,
            size: 0,
        });
    }
    Ok(())
}

/// Like `classify_file` but silent: directory scans see plenty of
/// non-comic files and should not warn about each one.
fn quiet_classify(path: &Path, size: u64, opts: &Options) -> Option<SourceFile> {
    let kind = types::classify(path)?;
    if !types::size_ok(opts.min_size_mb, size) {
        return None;
    }
    Some(SourceFile { path: path.to_path_buf(), kind, size })
}

/// Number of image files directly inside `dir`.
fn image_count(dir: &Path) -> Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() && types::is_image(&entry.path()) {
            count += 1;
        }
    }
    Ok(count)
}
