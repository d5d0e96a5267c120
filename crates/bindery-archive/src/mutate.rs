// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-place ZIP surgery: comment get/set, member add, member remove. Every
// mutation rewrites the archive by raw-copying kept members (no recompression
// round-trip) into a temp file beside the original, fsyncs it, and renames it
// over the original in one step.

use std::fs::File;
use std::io;
use std::path::Path;

use glob::Pattern;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use bindery_core::error::{BinderyError, Result};

/// Read the archive-level ZIP comment.
pub fn comment(path: &Path) -> Result<String> {
    let archive = ZipArchive::new(File::open(path)?)
        .map_err(|err| BinderyError::Archive(format!("{}: {err}", path.display())))?;
    Ok(String::from_utf8_lossy(archive.comment()).into_owned())
}

/// Replace the archive-level ZIP comment, keeping every member untouched.
#[instrument(fields(path = %path.display()))]
pub fn set_comment(path: &Path, body: &str) -> Result<()> {
    rewrite(path, Some(body), |_| true, |_| Ok(()))
}

/// Add `file` to the archive under its base name, replacing any member that
/// already carries that name. The new member is deflate-compressed; existing
/// members are raw-copied.
#[instrument(fields(path = %path.display(), file = %file.display()))]
pub fn add_file(path: &Path, file: &Path) -> Result<()> {
    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| BinderyError::Archive(format!("{}: unusable file name", file.display())))?
        .to_string();
    let mut src = File::open(file)?;
    let replaced = name.clone();
    rewrite(
        path,
        None,
        |entry| entry != replaced,
        move |writer| {
            let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            writer
                .start_file(&name, opts)
                .map_err(|err| BinderyError::Archive(err.to_string()))?;
            io::copy(&mut src, writer)?;
            info!(member = %name, "member added");
            Ok(())
        },
    )
}

/// Remove every member whose full stored name matches the glob `pattern`
/// (e.g. `*.xml`).
#[instrument(fields(path = %path.display(), pattern))]
pub fn remove_files(path: &Path, pattern: &str) -> Result<()> {
    let matcher = Pattern::new(pattern)
        .map_err(|err| BinderyError::Pattern(format!("{pattern}: {err}")))?;
    rewrite(path, None, |entry| !matcher.matches(entry), |_| Ok(()))
}

/// Rewrite `path` member by member. Members for which `keep` returns false
/// are dropped; `tail` runs after the copies to append new members. The
/// original comment survives unless `new_comment` overrides it.
fn rewrite<K, T>(path: &Path, new_comment: Option<&str>, mut keep: K, tail: T) -> Result<()>
where
    K: FnMut(&str) -> bool,
    T: FnOnce(&mut ZipWriter<File>) -> Result<()>,
{
    let mut archive = ZipArchive::new(File::open(path)?)
        .map_err(|err| BinderyError::Archive(format!("{}: {err}", path.display())))?;

    let parent = path
        .parent()
        .ok_or_else(|| BinderyError::Archive(format!("{}: no parent directory", path.display())))?;
    let tmp = NamedTempFile::new_in(parent)?;
    let mut writer = ZipWriter::new(tmp.reopen()?);

    match new_comment {
        Some(body) => writer.set_comment(body),
        None => {
            let existing = String::from_utf8_lossy(archive.comment()).into_owned();
            writer.set_comment(existing);
        }
    }

    let mut kept = 0usize;
    for i in 0..archive.len() {
        let entry = archive
            .by_index_raw(i)
            .map_err(|err| BinderyError::Archive(err.to_string()))?;
        if !keep(entry.name()) {
            debug!(member = entry.name(), "member dropped");
            continue;
        }
        writer
            .raw_copy_file(entry)
            .map_err(|err| BinderyError::Archive(err.to_string()))?;
        kept += 1;
    }

    tail(&mut writer)?;

    writer
        .finish()
        .map_err(|err| BinderyError::Archive(err.to_string()))?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|err| BinderyError::Archive(format!("{}: {}", path.display(), err.error)))?;
    debug!(kept, "archive rewritten");
    Ok(())
}
