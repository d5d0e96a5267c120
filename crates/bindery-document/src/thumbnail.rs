// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Freedesktop thumbnail output: a PNG named by the MD5 of the source file
// URI, carrying `tEXt` metadata chunks right after the header chunk. The
// `png` crate is used directly because the `image` crate's PNG encoder has
// no text-chunk surface.

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use image::DynamicImage;
use tracing::{info, instrument};

use bindery_core::error::{BinderyError, Result};
use bindery_core::options::Options;
use bindery_core::types::mime_for_path;

use crate::image::transform;

/// Product name written into the `Software` chunk.
const SOFTWARE: &str = "Bindery";

/// Long-edge size used when the caller configures no dimensions.
const DEFAULT_EDGE: u32 = 256;

/// Write a freedesktop-spec thumbnail for `source` from its decoded cover.
///
/// The output lands at `explicit` when given, otherwise at
/// `<out_dir>/<md5-of-file-uri>.png`. Returns the written path.
#[instrument(skip(cover, opts), fields(source = %source.display()))]
pub fn write_thumbnail(
    source: &Path,
    cover: DynamicImage,
    opts: &Options,
    explicit: Option<&Path>,
) -> Result<PathBuf> {
    let meta = fs::metadata(source)?;
    let mtime = meta
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let absolute = std::path::absolute(source)?;
    let uri = format!("file://{}", absolute.display());

    let thumb = if opts.width > 0 || opts.height > 0 {
        if opts.fit {
            transform::fit(cover, opts.width, opts.height, opts.filter)
        } else {
            transform::resize(cover, opts.width, opts.height, opts.filter)
        }
    } else {
        transform::fit(cover, DEFAULT_EDGE, DEFAULT_EDGE, opts.filter)
    };

    let out_path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let digest = md5::compute(uri.as_bytes());
            opts.out_dir.join(format!("{digest:x}.png"))
        }
    };

    let rgba = thumb.to_rgba8();
    let file = fs::File::create(&out_path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), rgba.width(), rgba.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);

    // Chunk order follows the freedesktop thumbnail spec.
    let chunks = [
        ("Software".to_string(), SOFTWARE.to_string()),
        ("Description".to_string(), format!("Thumbnail of {uri}")),
        ("Thumb::URI".to_string(), uri.clone()),
        ("Thumb::MTime".to_string(), mtime.to_string()),
        ("Thumb::Size".to_string(), meta.len().to_string()),
    ];
    for (keyword, text) in chunks {
        encoder
            .add_text_chunk(keyword, text)
            .map_err(|err| BinderyError::Encode(format!("thumbnail text chunk: {err}")))?;
    }
    if let Some(mime) = mime_for_path(source) {
        encoder
            .add_text_chunk("Thumb::Mimetype".to_string(), mime.to_string())
            .map_err(|err| BinderyError::Encode(format!("thumbnail text chunk: {err}")))?;
    }

    let mut writer = encoder
        .write_header()
        .map_err(|err| BinderyError::Encode(format!("thumbnail header: {err}")))?;
    writer
        .write_image_data(rgba.as_raw())
        .map_err(|err| BinderyError::Encode(format!("thumbnail data: {err}")))?;
    writer
        .finish()
        .map_err(|err| BinderyError::Encode(format!("thumbnail finish: {err}")))?;

    info!(path = %out_path.display(), "thumbnail written");
    Ok(out_path)
}
