// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Entry streaming over the three source shapes Bindery converts from: ZIP
// archives (cbz/zip), TAR archives (cbt/tar), and plain image directories.
// Each source yields named byte blobs in a stable order and supports a
// by-name lookup for cover extraction.

use std::collections::VecDeque;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};
use walkdir::WalkDir;
use zip::ZipArchive;

use bindery_core::error::{BinderyError, Result};
use bindery_core::types;

/// A single named entry pulled out of a source.
#[derive(Debug)]
pub struct RawEntry {
    /// Entry name as stored (archive member path, or path relative to the
    /// directory root).
    pub name: String,
    pub data: Vec<u8>,
}

/// Sequential access to the file entries of an archive or directory.
///
/// `names` is fixed at open time and lists every file entry in source order;
/// `next_entry` walks that same order. Directory members of archives are
/// never surfaced.
pub trait EntrySource: Send {
    /// Every file entry name, in the order `next_entry` will yield them.
    fn names(&self) -> &[String];

    /// The next entry, or `None` once the source is exhausted.
    fn next_entry(&mut self) -> Result<Option<RawEntry>>;

    /// Read one entry by its stored name.
    fn read(&mut self, name: &str) -> Result<Vec<u8>>;

    fn len(&self) -> usize {
        self.names().len()
    }

    fn is_empty(&self) -> bool {
        self.names().is_empty()
    }
}

/// Open the right source for `path`. Rar and 7z containers classify as
/// archives but have no reader here, so they fail at open with a clear
/// error rather than at classification.
#[instrument(fields(path = %path.display()))]
pub fn open(path: &Path) -> Result<Box<dyn EntrySource>> {
    if path.is_dir() {
        return Ok(Box::new(DirSource::open(path)?));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "zip" | "cbz" => Ok(Box::new(ZipSource::open(path)?)),
        "tar" | "cbt" => Ok(Box::new(TarSource::open(path)?)),
        "rar" | "cbr" => Err(BinderyError::UnsupportedSource(format!(
            "{}: rar extraction is not available",
            path.display()
        ))),
        "7z" | "cb7" => Err(BinderyError::UnsupportedSource(format!(
            "{}: 7z extraction is not available",
            path.display()
        ))),
        other => Err(BinderyError::UnsupportedSource(format!(
            "{}: unrecognized container .{other}",
            path.display()
        ))),
    }
}

// ---------------------------------------------------------------------------
// ZIP
// ---------------------------------------------------------------------------

pub struct ZipSource {
    archive: ZipArchive<File>,
    /// Indices of file (non-directory) members, in archive order.
    indices: Vec<usize>,
    names: Vec<String>,
    cursor: usize,
}

impl ZipSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)
            .map_err(|err| BinderyError::Archive(format!("{}: {err}", path.display())))?;
        let mut indices = Vec::new();
        let mut names = Vec::new();
        for i in 0..archive.len() {
            let entry = archive
                .by_index_raw(i)
                .map_err(|err| BinderyError::Archive(format!("{}: {err}", path.display())))?;
            if entry.is_dir() {
                continue;
            }
            indices.push(i);
            names.push(entry.name().to_string());
        }
        debug!(entries = names.len(), "zip source opened");
        Ok(Self { archive, indices, names, cursor: 0 })
    }
}

impl EntrySource for ZipSource {
    fn names(&self) -> &[String] {
        &self.names
    }

    fn next_entry(&mut self) -> Result<Option<RawEntry>> {
        let Some(&index) = self.indices.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        let mut entry = self
            .archive
            .by_index(index)
            .map_err(|err| BinderyError::Archive(err.to_string()))?;
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        Ok(Some(RawEntry { name: entry.name().to_string(), data }))
    }

    fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut entry = self
            .archive
            .by_name(name)
            .map_err(|err| BinderyError::Archive(format!("{name}: {err}")))?;
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        Ok(data)
    }
}

// ---------------------------------------------------------------------------
// TAR
// ---------------------------------------------------------------------------

/// Tar has no central directory and no random access, so the whole archive
/// is buffered at open. Comic archives are a few hundred megabytes at worst,
/// and the entries are consumed exactly once anyway.
pub struct TarSource {
    entries: VecDeque<RawEntry>,
    names: Vec<String>,
}

impl TarSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut archive = tar::Archive::new(file);
        let mut entries = VecDeque::new();
        let mut names = Vec::new();
        let iter = archive
            .entries()
            .map_err(|err| BinderyError::Archive(format!("{}: {err}", path.display())))?;
        for entry in iter {
            let mut entry =
                entry.map_err(|err| BinderyError::Archive(format!("{}: {err}", path.display())))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = entry
                .path()
                .map_err(|err| BinderyError::Archive(err.to_string()))?
                .to_string_lossy()
                .into_owned();
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            names.push(name.clone());
            entries.push_back(RawEntry { name, data });
        }
        debug!(entries = names.len(), "tar source opened");
        Ok(Self { entries, names })
    }
}

impl EntrySource for TarSource {
    fn names(&self) -> &[String] {
        &self.names
    }

    fn next_entry(&mut self) -> Result<Option<RawEntry>> {
        Ok(self.entries.pop_front())
    }

    fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.data.clone())
            .ok_or_else(|| BinderyError::Archive(format!("{name}: no such entry")))
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// A directory of loose images. Image and allow-listed non-image files are
/// surfaced; everything else in the tree is ignored. Names are paths
/// relative to the root so nested pages keep their structure.
pub struct DirSource {
    root: PathBuf,
    names: Vec<String>,
    cursor: usize,
}

impl DirSource {
    pub fn open(root: &Path) -> Result<Self> {
        let mut names = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|err| {
                BinderyError::Archive(format!("{}: {err}", root.display()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if !types::is_image(entry.path()) && !types::is_passthrough(entry.path()) {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(root)
                .map_err(|err| BinderyError::Archive(err.to_string()))?;
            names.push(rel.to_string_lossy().into_owned());
        }
        debug!(entries = names.len(), "directory source opened");
        Ok(Self { root: root.to_path_buf(), names, cursor: 0 })
    }
}

impl EntrySource for DirSource {
    fn names(&self) -> &[String] {
        &self.names
    }

    fn next_entry(&mut self) -> Result<Option<RawEntry>> {
        let Some(name) = self.names.get(self.cursor).cloned() else {
            return Ok(None);
        };
        self.cursor += 1;
        let data = std::fs::read(self.root.join(&name))?;
        Ok(Some(RawEntry { name, data }))
    }

    fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.root.join(name))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn fixture_zip(dir: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.join("fixture.cbz");
        let file = File::create(&path).expect("create zip");
        let mut writer = zip::ZipWriter::new(file);
        for (name, data) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start file");
            writer.write_all(data).expect("write entry");
        }
        writer.finish().expect("finish zip");
        path
    }

    #[test]
    fn zip_source_streams_in_archive_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = fixture_zip(
            dir.path(),
            &[("b.jpg", b"bbb"), ("a.jpg", b"aaa"), ("notes.txt", b"hi")],
        );

        let mut source = open(&path).expect("open");
        assert_eq!(source.names(), &["b.jpg", "a.jpg", "notes.txt"]);

        let first = source.next_entry().expect("next").expect("entry");
        assert_eq!(first.name, "b.jpg");
        assert_eq!(first.data, b"bbb");

        let by_name = source.read("a.jpg").expect("read");
        assert_eq!(by_name, b"aaa");
    }

    #[test]
    fn zip_source_skips_directory_members() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("dirs.cbz");
        let file = File::create(&path).expect("create zip");
        let mut writer = zip::ZipWriter::new(file);
        writer
            .add_directory("pages/", SimpleFileOptions::default())
            .expect("add dir");
        writer
            .start_file("pages/001.png", SimpleFileOptions::default())
            .expect("start file");
        writer.write_all(b"png").expect("write");
        writer.finish().expect("finish");

        let source = open(&path).expect("open");
        assert_eq!(source.names(), &["pages/001.png"]);
    }

    #[test]
    fn tar_source_buffers_file_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fixture.cbt");
        let file = File::create(&path).expect("create tar");
        let mut builder = tar::Builder::new(file);
        let mut header = tar::Header::new_gnu();
        header.set_size(4);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "page1.jpg", &b"jpeg"[..])
            .expect("append");
        builder.finish().expect("finish tar");
        drop(builder);

        let mut source = open(&path).expect("open");
        assert_eq!(source.names(), &["page1.jpg"]);
        let entry = source.next_entry().expect("next").expect("entry");
        assert_eq!(entry.data, b"jpeg");
        assert!(source.next_entry().expect("next").is_none());
    }

    #[test]
    fn dir_source_lists_images_and_passthrough_relative_to_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("book");
        std::fs::create_dir_all(root.join("ch1")).expect("mkdir");
        std::fs::write(root.join("ch1/02.png"), b"p2").expect("write");
        std::fs::write(root.join("01.png"), b"p1").expect("write");
        std::fs::write(root.join("info.nfo"), b"meta").expect("write");
        std::fs::write(root.join("thumbs.db"), b"no").expect("write");

        let mut source = open(&root).expect("open");
        assert_eq!(source.names(), &["01.png", "ch1/02.png", "info.nfo"]);
        let entry = source.next_entry().expect("next").expect("entry");
        assert_eq!(entry.name, "01.png");
        assert_eq!(entry.data, b"p1");
    }

    #[test]
    fn unreadable_containers_error_at_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("book.cbr");
        std::fs::write(&path, b"Rar!").expect("write");
        assert!(matches!(
            open(&path),
            Err(BinderyError::UnsupportedSource(_))
        ));
    }
}
