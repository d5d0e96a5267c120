// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cover selection and extraction. Selection is a pure function over entry
// names so the same archive always yields the same cover regardless of
// worker count or platform.

use std::path::Path;

use image::DynamicImage;
use tracing::instrument;

use bindery_core::error::Result;
use bindery_core::natsort;
use bindery_core::types::{self, SourceFile, SourceKind};
use bindery_document::{decode, open_document};

/// Pick the most likely cover from image entry names.
///
/// Two-phase: an early-exit scan for names starting with `cover`/`front`,
/// or whose extension-less base ends with either word (case-insensitive);
/// failing that, the naturally-smallest lower-cased name wins and the
/// matching original-cased name is returned. Empty input gives `None`.
pub fn select(names: &[String]) -> Option<String> {
    if names.is_empty() {
        return None;
    }

    let lower: Vec<String> = names.iter().map(|n| n.to_ascii_lowercase()).collect();
    for (idx, low) in lower.iter().enumerate() {
        let base = types::base_no_ext(Path::new(low));
        if low.starts_with("cover")
            || low.starts_with("front")
            || base.ends_with("cover")
            || base.ends_with("front")
        {
            return Some(names[idx].clone());
        }
    }

    let mut sorted = lower.clone();
    natsort::sort(&mut sorted);
    let winner = &sorted[0];
    lower
        .iter()
        .position(|low| low == winner)
        .map(|idx| names[idx].clone())
}

/// Resolve and decode the cover image of any source kind.
///
/// Archives and directories go through entry-name selection; documents use
/// their first page.
#[instrument(fields(source = %source.path.display()))]
pub fn cover_image(source: &SourceFile) -> Result<DynamicImage> {
    match source.kind {
        SourceKind::Document => {
            let renderer = open_document(&source.path)?;
            renderer.render_page(0)
        }
        SourceKind::Archive | SourceKind::Directory => {
            let mut entries = bindery_archive::open(&source.path)?;
            let images: Vec<String> = entries
                .names()
                .iter()
                .filter(|n| types::is_image(Path::new(n.as_str())))
                .cloned()
                .collect();
            let name = select(&images).ok_or_else(|| {
                bindery_core::error::BinderyError::Archive(format!(
                    "{}: no image entries",
                    source.path.display()
                ))
            })?;
            let data = entries.read(&name)?;
            decode(&data, &name)
        }
    }
}
