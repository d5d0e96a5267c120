// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Final assembly: pack a scratch directory of converted pages into the
// destination CBZ or CBT. The archive is built in a temp file beside the
// destination, fsynced, then renamed into place, so a crash or cancellation
// mid-pack never leaves a truncated output behind.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use bindery_core::error::{BinderyError, Result};
use bindery_core::options::{Options, OutputContainer};
use bindery_core::types::base_no_ext;

/// Destination path for a converted source: `<out_dir>[/<rel_dir>]/<base><suffix>.<ext>`.
///
/// `rel_dir` mirrors the source's directory below the input root when
/// converting recursively. A `.tar` secondary suffix in the source name is
/// stripped along with the extension, so `book.tar.gz` becomes `book.cbz`.
pub fn output_path(source: &Path, rel_dir: Option<&Path>, opts: &Options) -> PathBuf {
    let mut dir = opts.out_dir.clone();
    if let Some(rel) = rel_dir {
        dir = dir.join(rel);
    }
    let name = format!("{}{}.{}", base_no_ext(source), opts.suffix, opts.container.ext());
    dir.join(name)
}

/// Pack every file under `scratch` into an archive at `dest`, entries in
/// lexical name order.
#[instrument(skip(opts), fields(dest = %dest.display()))]
pub fn pack(scratch: &Path, dest: &Path, opts: &Options) -> Result<()> {
    let files = collect(scratch)?;
    debug!(entries = files.len(), "packing scratch directory");

    let parent = dest
        .parent()
        .ok_or_else(|| BinderyError::Archive(format!("{}: no parent directory", dest.display())))?;
    std::fs::create_dir_all(parent)?;
    let tmp = NamedTempFile::new_in(parent)?;

    match opts.container {
        OutputContainer::Zip => pack_zip(scratch, &files, tmp.reopen()?)?,
        OutputContainer::Tar => pack_tar(scratch, &files, tmp.reopen()?)?,
    }

    tmp.as_file().sync_all()?;
    tmp.persist(dest)
        .map_err(|err| BinderyError::Archive(format!("{}: {}", dest.display(), err.error)))?;
    info!(dest = %dest.display(), "archive written");
    Ok(())
}

/// Relative paths of every file under `scratch`, lexically sorted.
fn collect(scratch: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(scratch).sort_by_file_name() {
        let entry =
            entry.map_err(|err| BinderyError::Archive(format!("{}: {err}", scratch.display())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(scratch)
            .map_err(|err| BinderyError::Archive(err.to_string()))?;
        files.push(rel.to_path_buf());
    }
    Ok(files)
}

fn pack_zip(scratch: &Path, files: &[PathBuf], out: File) -> Result<()> {
    let mut writer = ZipWriter::new(out);
    let zip_opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for rel in files {
        let name = rel.to_string_lossy().replace('\\', "/");
        writer
            .start_file(name, zip_opts)
            .map_err(|err| BinderyError::Archive(err.to_string()))?;
        let mut src = File::open(scratch.join(rel))?;
        io::copy(&mut src, &mut writer)?;
    }
    writer
        .finish()
        .map_err(|err| BinderyError::Archive(err.to_string()))?
        .flush()?;
    Ok(())
}

fn pack_tar(scratch: &Path, files: &[PathBuf], out: File) -> Result<()> {
    let mut builder = tar::Builder::new(out);
    for rel in files {
        builder.append_path_with_name(scratch.join(rel), rel)?;
    }
    builder.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn scratch_with(entries: &[(&str, &[u8])]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        for (name, data) in entries {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("mkdir");
            }
            std::fs::write(path, data).expect("write page");
        }
        dir
    }

    #[test]
    fn output_path_builds_name_from_source_and_options() {
        let opts = Options {
            out_dir: PathBuf::from("/out"),
            suffix: "_converted".to_string(),
            ..Options::default()
        };
        let dest = output_path(Path::new("/library/Vol 1.cbr"), None, &opts);
        assert_eq!(dest, PathBuf::from("/out/Vol 1_converted.cbz"));

        let nested = output_path(Path::new("/library/s1/Vol 2.cbr"), Some(Path::new("s1")), &opts);
        assert_eq!(nested, PathBuf::from("/out/s1/Vol 2_converted.cbz"));
    }

    #[test]
    fn packs_zip_in_lexical_order() {
        let scratch = scratch_with(&[("002.jpg", b"two"), ("001.jpg", b"one")]);
        let out = tempfile::tempdir().expect("tempdir");
        let dest = out.path().join("book.cbz");

        let opts = Options::default();
        pack(scratch.path(), &dest, &opts).expect("pack");

        let mut archive = ZipArchive::new(File::open(&dest).expect("open")).expect("zip");
        assert_eq!(archive.len(), 2);
        let mut first = archive.by_index(0).expect("entry");
        assert_eq!(first.name(), "001.jpg");
        let mut data = Vec::new();
        first.read_to_end(&mut data).expect("read");
        assert_eq!(data, b"one");
    }

    #[test]
    fn packs_tar_when_configured() {
        let scratch = scratch_with(&[("001.png", b"page")]);
        let out = tempfile::tempdir().expect("tempdir");
        let dest = out.path().join("book.cbt");

        let opts = Options {
            container: OutputContainer::Tar,
            ..Options::default()
        };
        pack(scratch.path(), &dest, &opts).expect("pack");

        let mut archive = tar::Archive::new(File::open(&dest).expect("open"));
        let names: Vec<String> = archive
            .entries()
            .expect("entries")
            .map(|e| {
                e.expect("entry")
                    .path()
                    .expect("path")
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        assert_eq!(names, ["001.png"]);
    }

    #[test]
    fn creates_missing_destination_directories() {
        let scratch = scratch_with(&[("001.jpg", b"p")]);
        let out = tempfile::tempdir().expect("tempdir");
        let dest = out.path().join("deep/nested/book.cbz");

        pack(scratch.path(), &dest, &Options::default()).expect("pack");
        assert!(dest.exists());
    }
}
