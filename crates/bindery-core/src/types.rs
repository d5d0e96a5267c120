// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Bindery comic converter: source classification
// by extension, output image formats, and the per-input source descriptor.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What kind of input a path is, decided purely by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// Comic archive (`.rar .zip .7z .tar .cbr .cbz .cb7 .cbt`).
    Archive,
    /// Paginated document (`.pdf .epub .xps .mobi`).
    Document,
    /// Plain directory of image files.
    Directory,
}

/// One discovered conversion input.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: SourceKind,
    /// File size in bytes; zero for directories.
    pub size: u64,
}

const ARCHIVE_EXTS: &[&str] = &["rar", "zip", "7z", "tar", "cbr", "cbz", "cb7", "cbt"];
const DOCUMENT_EXTS: &[&str] = &["pdf", "epub", "xps", "mobi"];
const IMAGE_EXTS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp", "avif", "jxl",
];
/// Non-image extensions that ride along into the output archive unless the
/// caller asks for them to be stripped.
const PASSTHROUGH_EXTS: &[&str] = &["nfo", "xml", "txt"];

fn ext_lower(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase())
}

fn has_ext_in(path: &Path, table: &[&str]) -> bool {
    ext_lower(path).is_some_and(|e| table.contains(&e.as_str()))
}

/// True when the path has a comic-archive extension.
pub fn is_archive(path: &Path) -> bool {
    has_ext_in(path, ARCHIVE_EXTS)
}

/// True when the path has a paginated-document extension.
pub fn is_document(path: &Path) -> bool {
    has_ext_in(path, DOCUMENT_EXTS)
}

/// True when the path has a decodable image extension.
pub fn is_image(path: &Path) -> bool {
    has_ext_in(path, IMAGE_EXTS)
}

/// True when the path is an allow-listed non-image file (`.nfo .xml .txt`).
pub fn is_passthrough(path: &Path) -> bool {
    has_ext_in(path, PASSTHROUGH_EXTS)
}

/// Classify a regular file; directories are classified by the caller.
pub fn classify(path: &Path) -> Option<SourceKind> {
    if is_archive(path) {
        Some(SourceKind::Archive)
    } else if is_document(path) {
        Some(SourceKind::Document)
    } else {
        None
    }
}

/// Inclusive size filter: `true` when `size` is at least `min_mb` megabytes.
/// A threshold of zero disables filtering.
pub fn size_ok(min_mb: u64, size: u64) -> bool {
    min_mb == 0 || size >= min_mb * 1024 * 1024
}

/// Base name without its extension. A secondary `.tar` suffix is stripped
/// too, so `book.tar.gz`-style names do not leak `.tar` into output names.
pub fn base_no_ext(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.strip_suffix(".tar").map(str::to_owned).unwrap_or(stem)
}

/// MIME type guessed from the extension, for the thumbnail `Thumb::Mimetype`
/// field. Returns `None` for extensions outside the supported set.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = ext_lower(path)?;
    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "epub" => "application/epub+zip",
        "zip" | "cbz" => "application/zip",
        "rar" | "cbr" => "application/vnd.rar",
        "7z" | "cb7" => "application/x-7z-compressed",
        "tar" | "cbt" => "application/x-tar",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tiff" | "tif" => "image/tiff",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "jxl" => "image/jxl",
        _ => return None,
    };
    Some(mime)
}

/// Output image formats the converter can re-encode pages into.
///
/// A closed set: each variant owns exactly one encode binding in
/// `bindery-document`, so the choice of backing codec lives in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Tiff,
    Bmp,
    Webp,
    Avif,
    Jxl,
}

impl ImageFormat {
    /// File extension used for converted pages.
    pub fn ext(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
            Self::Bmp => "bmp",
            Self::Webp => "webp",
            Self::Avif => "avif",
            Self::Jxl => "jxl",
        }
    }

    /// Parse a user-facing format name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "tiff" | "tif" => Some(Self::Tiff),
            "bmp" => Some(Self::Bmp),
            "webp" => Some(Self::Webp),
            "avif" => Some(Self::Avif),
            "jxl" => Some(Self::Jxl),
            _ => None,
        }
    }

    /// Map an existing file extension onto a format, for the cover path that
    /// keeps the original encoding instead of re-selecting the target format.
    pub fn from_ext(ext: &str) -> Option<Self> {
        Self::from_name(ext)
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
            Self::Bmp => "bmp",
            Self::Webp => "webp",
            Self::Avif => "avif",
            Self::Jxl => "jxl",
        };
        write!(f, "{name}")
    }
}
