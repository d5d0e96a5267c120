// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Codec dispatch — decode raw entry bytes into a working image and encode
// a working image into the target format. All pixel work is delegated to
// the `image` crate; this module only owns the format decision.

use std::io::Cursor;

use image::DynamicImage;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use jxl_oxide::integration::JxlDecoder;
use tracing::{debug, warn};
use zune_core::bit_depth::BitDepth;
use zune_core::colorspace::ColorSpace;
use zune_core::options::EncoderOptions;
use zune_jpegxl::JxlSimpleEncoder;

use bindery_core::error::{BinderyError, Result};
use bindery_core::types::ImageFormat;

/// Bare JPEG XL codestream, and the ISOBMFF container wrapping one.
const JXL_CODESTREAM_SIG: &[u8] = &[0xff, 0x0a];
const JXL_CONTAINER_SIG: &[u8] = b"\x00\x00\x00\x0cJXL \x0d\x0a\x87\x0a";

fn looks_like_jxl(data: &[u8]) -> bool {
    data.starts_with(JXL_CODESTREAM_SIG) || data.starts_with(JXL_CONTAINER_SIG)
}

fn decode_jxl(data: &[u8], name: &str) -> Result<DynamicImage> {
    let decoder = JxlDecoder::new(Cursor::new(data))
        .map_err(|err| BinderyError::Decode(format!("{name}: {err}")))?;
    DynamicImage::from_decoder(decoder)
        .map_err(|err| BinderyError::Decode(format!("{name}: {err}")))
}

/// Decode an image from raw bytes.
///
/// The first attempt sniffs the format from the byte content. When sniffing
/// fails and the entry name carries a known extension, a second attempt
/// forces that format; some in-the-wild comic pages have misleading magic
/// bytes but honest extensions. JPEG XL is sniffed and decoded separately
/// because the `image` crate has no codec for it.
pub fn decode(data: &[u8], name: &str) -> Result<DynamicImage> {
    if looks_like_jxl(data) {
        return decode_jxl(data, name);
    }
    match image::load_from_memory(data) {
        Ok(img) => Ok(img),
        Err(err) => {
            let ext = name.rsplit('.').next().map(str::to_ascii_lowercase);
            if ext.as_deref() == Some("jxl") {
                warn!(name, %err, "decoder sniffing failed, forcing format from extension");
                return decode_jxl(data, name);
            }
            let forced = ext.as_deref().and_then(image::ImageFormat::from_extension);
            if let Some(format) = forced {
                warn!(name, %err, "decoder sniffing failed, forcing format from extension");
                image::load_from_memory_with_format(data, format)
                    .map_err(|err| BinderyError::Decode(format!("{name}: {err}")))
            } else {
                Err(BinderyError::Decode(format!("{name}: {err}")))
            }
        }
    }
}

/// Encode an image into `format`, returning the raw bytes.
///
/// `quality` applies to lossy formats (1-100) and is ignored elsewhere.
pub fn encode(img: &DynamicImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();

    match format {
        ImageFormat::Jpeg => {
            let rgb = img.to_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
            rgb.write_with_encoder(encoder)
                .map_err(|err| BinderyError::Encode(format!("jpeg: {err}")))?;
        }
        ImageFormat::Avif => {
            let rgba = img.to_rgba8();
            let encoder = AvifEncoder::new_with_speed_quality(&mut buffer, 4, quality.clamp(1, 100));
            rgba.write_with_encoder(encoder)
                .map_err(|err| BinderyError::Encode(format!("avif: {err}")))?;
        }
        ImageFormat::Jxl => {
            // Lossless modular encoding; `quality` has no effect here.
            let rgb = img.to_rgb8();
            let opts = EncoderOptions::new(
                rgb.width() as usize,
                rgb.height() as usize,
                ColorSpace::RGB,
                BitDepth::Eight,
            );
            let mut encoder = JxlSimpleEncoder::new(rgb.as_raw(), opts);
            buffer = encoder
                .encode()
                .map_err(|err| BinderyError::Encode(format!("jxl: {err:?}")))?;
        }
        other => {
            let target = match other {
                ImageFormat::Png => image::ImageFormat::Png,
                ImageFormat::Gif => image::ImageFormat::Gif,
                ImageFormat::Tiff => image::ImageFormat::Tiff,
                ImageFormat::Bmp => image::ImageFormat::Bmp,
                ImageFormat::Webp => image::ImageFormat::WebP,
                ImageFormat::Jpeg | ImageFormat::Avif | ImageFormat::Jxl => unreachable!(),
            };
            img.write_to(&mut Cursor::new(&mut buffer), target)
                .map_err(|err| BinderyError::Encode(format!("{other}: {err}")))?;
        }
    }

    debug!(format = %format, bytes = buffer.len(), "image encoded");
    Ok(buffer)
}

/// True when the decoded image carries no color channel.
pub fn is_grayscale(img: &DynamicImage) -> bool {
    !img.color().has_color()
}
