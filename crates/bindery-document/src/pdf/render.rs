// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document page rendering. The converter only needs two things from a
// paginated document: the page count up front, and random access to any
// page as a decoded image (random access is what lets the scheduler
// rasterize pages out of order).
//
// The bundled backend uses `lopdf` and extracts the dominant raster
// embedded in each page, which is exactly what comic-book PDFs contain:
// one full-page image per page. PDFs with vector-only pages are rejected
// rather than approximated.

use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info, instrument};

use bindery_core::error::{BinderyError, Result};
use bindery_core::types::is_document;

/// Random-access page rasterization, the collaborator interface consumed by
/// the conversion engine.
pub trait DocumentRenderer: Send + Sync {
    /// Total number of pages, known before any rendering happens.
    fn page_count(&self) -> usize;

    /// Render the zero-based `index`-th page as a decoded image.
    fn render_page(&self, index: usize) -> Result<DynamicImage>;
}

/// Open a renderer for the document at `path`, dispatching on extension.
///
/// Only PDF has a bundled backend; the other document extensions classify
/// as documents but need an external renderer, so opening them is an input
/// error that aborts just this input.
pub fn open_document(path: &Path) -> Result<Arc<dyn DocumentRenderer>> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => Ok(Arc::new(PdfRenderer::open(path)?)),
        _ if is_document(path) => Err(BinderyError::Document(format!(
            "no bundled renderer for .{ext} documents: {}",
            path.display()
        ))),
        _ => Err(BinderyError::UnsupportedSource(path.display().to_string())),
    }
}

/// Extracts the dominant embedded image of each PDF page.
pub struct PdfRenderer {
    document: Document,
    /// Page object ids in page-number order.
    pages: Vec<ObjectId>,
}

impl PdfRenderer {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = Document::load(path).map_err(|err| {
            BinderyError::Document(format!("failed to open {}: {err}", path.display()))
        })?;

        // BTreeMap keyed by 1-based page number, already in order.
        let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
        info!(pages = pages.len(), "PDF loaded");

        Ok(Self { document, pages })
    }

    /// Follow a reference if `obj` is one, otherwise return it as-is.
    fn resolve<'a>(&'a self, obj: &'a Object) -> Result<&'a Object> {
        match obj {
            Object::Reference(id) => self
                .document
                .get_object(*id)
                .map_err(|err| BinderyError::Document(format!("dangling reference: {err}"))),
            other => Ok(other),
        }
    }

    /// The page's Resources dictionary, following one level of inheritance
    /// from the parent Pages node when the page itself has none.
    fn page_resources(&self, page_id: ObjectId) -> Result<&Dictionary> {
        let page = self
            .document
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|err| BinderyError::Document(format!("bad page object: {err}")))?;

        let holder = if page.has(b"Resources") {
            page
        } else {
            let parent = page
                .get(b"Parent")
                .map_err(|err| BinderyError::Document(format!("page without resources: {err}")))?;
            self.resolve(parent)?
                .as_dict()
                .map_err(|err| BinderyError::Document(format!("bad parent node: {err}")))?
        };

        let resources = holder
            .get(b"Resources")
            .map_err(|err| BinderyError::Document(format!("missing Resources: {err}")))?;
        self.resolve(resources)?
            .as_dict()
            .map_err(|err| BinderyError::Document(format!("bad Resources: {err}")))
    }

    /// Decode one image XObject stream, returning `(area, image)` so the
    /// caller can pick the dominant raster on the page.
    fn decode_xobject(&self, obj: &Object) -> Result<Option<(u64, DynamicImage)>> {
        let stream = match self.resolve(obj)?.as_stream() {
            Ok(s) => s,
            Err(_) => return Ok(None),
        };

        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(name) if name == b"Image" => {}
            _ => return Ok(None),
        }

        let width = dict_i64(&stream.dict, b"Width")?;
        let height = dict_i64(&stream.dict, b"Height")?;
        let area = (width as u64) * (height as u64);

        if has_filter(&stream.dict, b"DCTDecode") || has_filter(&stream.dict, b"JPXDecode") {
            // JPEG / JPEG2000 payloads decode directly.
            let img = image::load_from_memory(&stream.content)
                .map_err(|err| BinderyError::Decode(format!("embedded page image: {err}")))?;
            return Ok(Some((area, img)));
        }

        // Flate or unfiltered: raw 8-bit samples in DeviceRGB or DeviceGray.
        let bits = dict_i64(&stream.dict, b"BitsPerComponent").unwrap_or(8);
        if bits != 8 {
            return Err(BinderyError::Document(format!(
                "unsupported page image depth: {bits} bits per component"
            )));
        }

        let data = stream
            .decompressed_content()
            .map_err(|err| BinderyError::Document(format!("page image stream: {err}")))?;

        let colorspace = stream
            .dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|cs| self.resolve(cs).ok())
            .and_then(|cs| cs.as_name().ok())
            .unwrap_or(b"DeviceRGB");

        let (w, h) = (width as u32, height as u32);
        let img = if colorspace == b"DeviceRGB" {
            RgbImage::from_raw(w, h, data)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| {
                    BinderyError::Document("page image sample buffer too short".into())
                })?
        } else if colorspace == b"DeviceGray" {
            GrayImage::from_raw(w, h, data)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| {
                    BinderyError::Document("page image sample buffer too short".into())
                })?
        } else {
            return Err(BinderyError::Document(format!(
                "unsupported page image colorspace: {}",
                String::from_utf8_lossy(colorspace)
            )));
        };

        Ok(Some((area, img)))
    }
}

impl DocumentRenderer for PdfRenderer {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn render_page(&self, index: usize) -> Result<DynamicImage> {
        let page_id = *self.pages.get(index).ok_or_else(|| {
            BinderyError::Document(format!(
                "page {index} out of range ({} pages)",
                self.pages.len()
            ))
        })?;

        let resources = self.page_resources(page_id)?;
        let xobjects = match resources.get(b"XObject") {
            Ok(x) => self
                .resolve(x)?
                .as_dict()
                .map_err(|err| BinderyError::Document(format!("bad XObject dict: {err}")))?,
            Err(_) => {
                return Err(BinderyError::Document(format!(
                    "page {index} has no embedded images"
                )));
            }
        };

        // The page raster is the largest image XObject; small ones are
        // decorations or watermarks.
        let mut best: Option<(u64, DynamicImage)> = None;
        for (_name, obj) in xobjects.iter() {
            if let Some((area, img)) = self.decode_xobject(obj)? {
                if best.as_ref().is_none_or(|(a, _)| area > *a) {
                    best = Some((area, img));
                }
            }
        }

        debug!(index, "page rendered");
        best.map(|(_, img)| img).ok_or_else(|| {
            BinderyError::Document(format!("page {index} has no decodable raster"))
        })
    }
}

fn dict_i64(dict: &Dictionary, key: &[u8]) -> Result<i64> {
    dict.get(key)
        .and_then(Object::as_i64)
        .map_err(|err| BinderyError::Document(format!(
            "missing {} entry: {err}",
            String::from_utf8_lossy(key)
        )))
}

/// True when the stream's Filter entry names `filter`, directly or inside
/// a filter array.
fn has_filter(dict: &Dictionary, filter: &[u8]) -> bool {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => name == filter,
        Ok(Object::Array(items)) => items
            .iter()
            .any(|o| matches!(o, Object::Name(name) if name == filter)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_document_rejects_unknown_extensions() {
        assert!(matches!(
            open_document(Path::new("comic.exe")),
            Err(BinderyError::UnsupportedSource(_))
        ));
    }

    #[test]
    fn open_document_reports_missing_backend() {
        assert!(matches!(
            open_document(Path::new("book.epub")),
            Err(BinderyError::Document(_))
        ));
    }

    #[test]
    fn filter_matching_handles_name_and_array() {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
        assert!(has_filter(&dict, b"DCTDecode"));

        let mut dict = Dictionary::new();
        dict.set(
            "Filter",
            Object::Array(vec![
                Object::Name(b"FlateDecode".to_vec()),
                Object::Name(b"DCTDecode".to_vec()),
            ]),
        );
        assert!(has_filter(&dict, b"DCTDecode"));
        assert!(!has_filter(&dict, b"JPXDecode"));
    }
}
