// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The conversion front door. A `Converter` snapshots its options once,
// exposes progress and cancellation to the caller, and turns each
// discovered source into a CBZ/CBT through a private session: stream
// entries, process pages on the worker pool, pack the scratch directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use bindery_archive::RawEntry;
use bindery_core::error::{BinderyError, Result};
use bindery_core::options::Options;
use bindery_core::types::{self, ImageFormat, SourceFile, SourceKind};
use bindery_document::image::transform as xform;
use bindery_document::{DocumentRenderer, apply_levels, decode, encode, is_grayscale, transform};

use crate::cover;
use crate::files;
use crate::scheduler::WorkerPool;
use crate::session::{Progress, Session};

/// Converts comic sources according to one immutable `Options` snapshot.
pub struct Converter {
    opts: Arc<Options>,
    progress: Arc<Progress>,
    token: CancellationToken,
}

impl Converter {
    pub fn new(opts: Options) -> Self {
        Self {
            opts: Arc::new(opts),
            progress: Arc::new(Progress::default()),
            token: CancellationToken::new(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    /// Shared progress counters, safe to poll from another thread.
    pub fn progress(&self) -> Arc<Progress> {
        Arc::clone(&self.progress)
    }

    /// Token front-ends trigger to abort all in-flight conversions.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Expand input paths into sources and prime the file counter.
    pub fn discover(&self, paths: &[PathBuf]) -> Result<Vec<SourceFile>> {
        let sources = files::discover(paths, &self.opts)?;
        self.progress.set_total_files(sources.len());
        Ok(sources)
    }

    /// Convert one source into an archive in the output directory.
    ///
    /// `rel_dir` mirrors the source's directory below the input root into
    /// the output tree when converting recursively. On cancellation the
    /// scratch directory is discarded and no output file appears.
    #[instrument(skip(self), fields(source = %source.path.display()))]
    pub async fn convert(
        &self,
        source: &SourceFile,
        rel_dir: Option<&Path>,
    ) -> Result<PathBuf> {
        if self.token.is_cancelled() {
            return Err(BinderyError::Cancelled);
        }
        self.progress.file_started();

        let session = Session::new(&self.token)?;
        match source.kind {
            SourceKind::Archive | SourceKind::Directory => {
                self.convert_entries(source, &session).await?;
            }
            SourceKind::Document => {
                self.convert_document(source, &session).await?;
            }
        }

        let dest = bindery_archive::output_path(&source.path, rel_dir, &self.opts);
        let scratch = session.scratch().to_path_buf();
        let opts = Arc::clone(&self.opts);
        let target = dest.clone();
        tokio::task::spawn_blocking(move || bindery_archive::pack(&scratch, &target, &opts))
            .await
            .map_err(|err| BinderyError::Worker(err.to_string()))??;
        session.finish()?;
        info!(dest = %dest.display(), "source converted");
        Ok(dest)
    }

    /// Decode the cover, apply any configured resize, and write it as a
    /// JPEG next to the other outputs.
    #[instrument(skip(self), fields(source = %source.path.display()))]
    pub fn extract_cover(&self, source: &SourceFile) -> Result<PathBuf> {
        self.progress.file_started();
        let mut img = cover::cover_image(source)?;
        if self.opts.width > 0 || self.opts.height > 0 {
            img = if self.opts.fit {
                xform::fit(img, self.opts.width, self.opts.height, self.opts.filter)
            } else {
                xform::resize(img, self.opts.width, self.opts.height, self.opts.filter)
            };
        }
        let data = encode(&img, ImageFormat::Jpeg, self.opts.quality)?;
        fs::create_dir_all(&self.opts.out_dir)?;
        let dest = self
            .opts
            .out_dir
            .join(format!("{}.jpg", types::base_no_ext(&source.path)));
        fs::write(&dest, data)?;
        info!(dest = %dest.display(), "cover extracted");
        Ok(dest)
    }

    /// Write a freedesktop thumbnail for the source's cover.
    #[instrument(skip(self), fields(source = %source.path.display()))]
    pub fn extract_thumbnail(
        &self,
        source: &SourceFile,
        explicit: Option<&Path>,
    ) -> Result<PathBuf> {
        self.progress.file_started();
        let img = cover::cover_image(source)?;
        fs::create_dir_all(&self.opts.out_dir)?;
        bindery_document::write_thumbnail(&source.path, img, &self.opts, explicit)
    }

    // Metadata operations forwarded so front-ends deal with one type.

    pub fn comment(&self, path: &Path) -> Result<String> {
        bindery_archive::comment(path)
    }

    pub fn set_comment(&self, path: &Path, body: &str) -> Result<()> {
        bindery_archive::set_comment(path, body)
    }

    pub fn add_file(&self, path: &Path, file: &Path) -> Result<()> {
        bindery_archive::add_file(path, file)
    }

    pub fn remove_files(&self, path: &Path, pattern: &str) -> Result<()> {
        bindery_archive::remove_files(path, pattern)
    }

    async fn convert_entries(&self, source: &SourceFile, session: &Session) -> Result<()> {
        let mut entries = bindery_archive::open(&source.path)?;
        let names: Vec<String> = entries
            .names()
            .iter()
            .filter(|n| !is_junk(n))
            .cloned()
            .collect();
        let images: Vec<String> = names
            .iter()
            .filter(|n| types::is_image(Path::new(n.as_str())))
            .cloned()
            .collect();
        let cover = cover::select(&images);
        debug!(entries = names.len(), cover = cover.as_deref(), "entry stream ready");
        self.progress.reset_entries(names.len());

        let mut pool = self.worker_pool(session);
        let mut stems = StemAllocator::default();
        let mut dispatch_err = None;
        loop {
            // Entry decompression blocks, so it runs off the runtime thread;
            // the cursor ping-pongs back for the next iteration.
            let (cursor, next) = tokio::task::spawn_blocking(move || {
                let next = entries.next_entry();
                (entries, next)
            })
            .await
            .map_err(|err| BinderyError::Worker(err.to_string()))?;
            entries = cursor;
            let Some(entry) = next? else {
                break;
            };
            if is_junk(&entry.name) {
                continue;
            }
            let stem = stems.claim(&types::base_no_ext(Path::new(&entry.name)));
            let is_cover = cover.as_deref() == Some(entry.name.as_str());
            let ctx = self.job_ctx(session);
            if let Err(err) = pool
                .dispatch(move || process_entry(entry, &stem, is_cover, &ctx))
                .await
            {
                dispatch_err = Some(err);
                break;
            }
        }
        pool.join().await?;
        match dispatch_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn convert_document(&self, source: &SourceFile, session: &Session) -> Result<()> {
        let renderer = bindery_document::open_document(&source.path)?;
        let count = renderer.page_count();
        debug!(pages = count, "document opened");
        self.progress.reset_entries(count);

        let mut pool = self.worker_pool(session);
        let mut dispatch_err = None;
        for index in 0..count {
            let renderer = Arc::clone(&renderer);
            let ctx = self.job_ctx(session);
            if let Err(err) = pool
                .dispatch(move || process_page(renderer.as_ref(), index, &ctx))
                .await
            {
                dispatch_err = Some(err);
                break;
            }
        }
        pool.join().await?;
        match dispatch_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn worker_pool(&self, session: &Session) -> WorkerPool {
        match self.opts.workers {
            0 => WorkerPool::new(session.token()),
            n => WorkerPool::with_permits(n, session.token()),
        }
    }

    fn job_ctx(&self, session: &Session) -> JobCtx {
        JobCtx {
            opts: Arc::clone(&self.opts),
            scratch: session.scratch().to_path_buf(),
            token: session.token(),
            progress: Arc::clone(&self.progress),
        }
    }
}

/// Everything a worker job needs, cloned per dispatch.
struct JobCtx {
    opts: Arc<Options>,
    scratch: PathBuf,
    token: CancellationToken,
    progress: Arc<Progress>,
}

/// macOS filesystem droppings that never belong in a comic.
fn is_junk(name: &str) -> bool {
    name.contains("__MACOSX")
        || Path::new(name)
            .file_name()
            .is_some_and(|f| f == ".DS_Store")
}

/// Hands out unique scratch stems: a repeated base name (case-insensitive,
/// as scratch may live on a case-insensitive filesystem) gets a numeric
/// suffix. Assignment happens on the dispatch thread in entry order, so
/// names do not depend on worker scheduling.
#[derive(Default)]
struct StemAllocator(HashMap<String, usize>);

impl StemAllocator {
    fn claim(&mut self, stem: &str) -> String {
        let seen = self.0.entry(stem.to_ascii_lowercase()).or_insert(0);
        *seen += 1;
        if *seen == 1 {
            stem.to_string()
        } else {
            format!("{stem}_{}", *seen - 1)
        }
    }
}

/// One archive or directory entry: policy branches, then the pipeline.
fn process_entry(entry: RawEntry, stem: &str, is_cover: bool, ctx: &JobCtx) -> Result<()> {
    if ctx.token.is_cancelled() {
        return Err(BinderyError::Cancelled);
    }
    let opts = &ctx.opts;
    let path = Path::new(&entry.name);
    let orig_ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    if !types::is_image(path) {
        if types::is_passthrough(path) && !opts.no_non_image {
            write_entry(ctx, &format!("{stem}.{orig_ext}"), &entry.data)?;
        }
        ctx.progress.entry_done();
        return Ok(());
    }

    if opts.no_convert {
        write_entry(ctx, &format!("{stem}.{orig_ext}"), &entry.data)?;
        ctx.progress.entry_done();
        return Ok(());
    }

    let img = decode(&entry.data, &entry.name)?;

    if opts.no_rgb && !is_grayscale(&img) {
        write_entry(ctx, &format!("{stem}.{orig_ext}"), &entry.data)?;
        ctx.progress.entry_done();
        return Ok(());
    }

    let img = transform(img, opts);
    let img = if opts.levels.is_identity() {
        img
    } else {
        apply_levels(img, &opts.levels)
    };

    // A cover exempt from conversion is still transformed but keeps its
    // original encoding and extension.
    let (format, ext) = match ImageFormat::from_ext(&orig_ext) {
        Some(original) if is_cover && !opts.convert_cover => (original, orig_ext.clone()),
        _ => (opts.format, opts.format.ext().to_string()),
    };
    let data = encode(&img, format, opts.quality)?;
    write_entry(ctx, &format!("{stem}.{ext}"), &data)?;
    ctx.progress.entry_done();
    Ok(())
}

/// One rendered document page.
fn process_page(renderer: &dyn DocumentRenderer, index: usize, ctx: &JobCtx) -> Result<()> {
    if ctx.token.is_cancelled() {
        return Err(BinderyError::Cancelled);
    }
    let opts = &ctx.opts;
    let img = renderer.render_page(index)?;
    let img = transform(img, opts);
    let img = if opts.levels.is_identity() {
        img
    } else {
        apply_levels(img, &opts.levels)
    };
    let data = encode(&img, opts.format, opts.quality)?;
    write_entry(ctx, &format!("{index:03}.{}", opts.format.ext()), &data)?;
    ctx.progress.entry_done();
    Ok(())
}

fn write_entry(ctx: &JobCtx, name: &str, data: &[u8]) -> Result<()> {
    if ctx.token.is_cancelled() {
        return Err(BinderyError::Cancelled);
    }
    fs::write(ctx.scratch.join(name), data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::options::OutputContainer;
    use image::{DynamicImage, Rgb, RgbImage};

    fn page(w: u32, h: u32, shade: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([shade, shade, shade])))
    }

    /// Build a real CBZ fixture: pages as PNG plus a pass-through text file.
    fn fixture_cbz(dir: &Path) -> PathBuf {
        let pages = dir.join("pages");
        fs::create_dir_all(&pages).expect("mkdir");
        page(24, 36, 40).save(pages.join("page1.png")).expect("save");
        page(24, 36, 90).save(pages.join("page2.png")).expect("save");
        page(24, 36, 140).save(pages.join("page10.png")).expect("save");
        fs::write(pages.join("info.txt"), b"release notes").expect("write");

        let path = dir.join("test.cbz");
        let opts = Options::default();
        bindery_archive::pack(&pages, &path, &opts).expect("pack fixture");
        fs::remove_dir_all(&pages).expect("cleanup");
        path
    }

    fn archive_names(path: &Path) -> Vec<String> {
        bindery_archive::open(path).expect("open").names().to_vec()
    }

    #[tokio::test]
    async fn converts_cbz_to_png_and_strips_non_images() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = fixture_cbz(dir.path());

        let conv = Converter::new(Options {
            format: bindery_core::types::ImageFormat::Png,
            no_non_image: true,
            out_dir: dir.path().join("out"),
            ..Options::default()
        });
        let sources = conv.discover(&[src]).expect("discover");
        assert_eq!(sources.len(), 1);

        let dest = conv.convert(&sources[0], None).await.expect("convert");
        assert_eq!(dest, dir.path().join("out/test.cbz"));

        let mut names = archive_names(&dest);
        names.sort();
        assert_eq!(names, ["page1.png", "page10.png", "page2.png"]);

        let (current, total) = conv.progress().entries();
        assert_eq!((current, total), (4, 4));
    }

    #[tokio::test]
    async fn unconverted_cover_keeps_its_name_and_encoding() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pages = dir.path().join("pages");
        fs::create_dir_all(&pages).expect("mkdir");
        page(24, 36, 40).save(pages.join("cover.png")).expect("save");
        page(24, 36, 90).save(pages.join("page1.png")).expect("save");
        let src = dir.path().join("book.cbz");
        bindery_archive::pack(&pages, &src, &Options::default()).expect("pack");

        let conv = Converter::new(Options {
            convert_cover: false,
            out_dir: dir.path().join("out"),
            ..Options::default()
        });
        let sources = conv.discover(&[src]).expect("discover");
        let dest = conv.convert(&sources[0], None).await.expect("convert");

        let mut names = archive_names(&dest);
        names.sort();
        assert_eq!(names, ["cover.png", "page1.jpg"]);
    }

    #[tokio::test]
    async fn directory_source_converts_like_an_archive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let book = dir.path().join("loose");
        fs::create_dir_all(&book).expect("mkdir");
        page(24, 36, 40).save(book.join("001.png")).expect("save");
        page(24, 36, 90).save(book.join("002.png")).expect("save");

        let conv = Converter::new(Options {
            out_dir: dir.path().join("out"),
            container: OutputContainer::Tar,
            ..Options::default()
        });
        let sources = conv.discover(&[book]).expect("discover");
        assert_eq!(sources[0].kind, SourceKind::Directory);

        let dest = conv.convert(&sources[0], None).await.expect("convert");
        assert_eq!(dest, dir.path().join("out/loose.cbt"));
        let mut names = archive_names(&dest);
        names.sort();
        assert_eq!(names, ["001.jpg", "002.jpg"]);
    }

    #[tokio::test]
    async fn cancellation_leaves_no_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = fixture_cbz(dir.path());

        let conv = Converter::new(Options {
            out_dir: dir.path().join("out"),
            ..Options::default()
        });
        let sources = conv.discover(&[src]).expect("discover");
        conv.cancel_handle().cancel();

        let err = conv.convert(&sources[0], None).await.expect_err("cancelled");
        assert!(err.is_cancelled());
        assert!(!dir.path().join("out/test.cbz").exists());
    }

    #[tokio::test]
    async fn duplicate_base_names_stay_distinct() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pages = dir.path().join("pages");
        fs::create_dir_all(pages.join("a")).expect("mkdir");
        fs::create_dir_all(pages.join("b")).expect("mkdir");
        page(24, 36, 40).save(pages.join("a/01.png")).expect("save");
        page(24, 36, 90).save(pages.join("b/01.png")).expect("save");
        let src = dir.path().join("dup.cbz");
        bindery_archive::pack(&pages, &src, &Options::default()).expect("pack");

        let conv = Converter::new(Options {
            out_dir: dir.path().join("out"),
            ..Options::default()
        });
        let sources = conv.discover(&[src]).expect("discover");
        let dest = conv.convert(&sources[0], None).await.expect("convert");

        let mut names = archive_names(&dest);
        names.sort();
        assert_eq!(names, ["01.jpg", "01_1.jpg"]);
    }

    #[tokio::test]
    async fn repeated_conversion_is_byte_identical() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = fixture_cbz(dir.path());

        let mut outputs = Vec::new();
        for out in ["out1", "out2"] {
            let conv = Converter::new(Options {
                out_dir: dir.path().join(out),
                ..Options::default()
            });
            let sources = conv.discover(std::slice::from_ref(&src)).expect("discover");
            let dest = conv.convert(&sources[0], None).await.expect("convert");
            outputs.push(fs::read(dest).expect("read output"));
        }
        assert_eq!(outputs[0], outputs[1]);
    }

    #[tokio::test]
    async fn worker_cap_does_not_change_output_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = fixture_cbz(dir.path());

        let mut outputs = Vec::new();
        for (out, workers) in [("serial", 1), ("parallel", 4)] {
            let conv = Converter::new(Options {
                out_dir: dir.path().join(out),
                workers,
                ..Options::default()
            });
            let sources = conv.discover(std::slice::from_ref(&src)).expect("discover");
            let dest = conv.convert(&sources[0], None).await.expect("convert");
            outputs.push(fs::read(dest).expect("read output"));
        }
        assert_eq!(outputs[0], outputs[1]);
    }

    #[tokio::test]
    async fn extract_cover_writes_jpeg_named_after_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = fixture_cbz(dir.path());

        let conv = Converter::new(Options {
            out_dir: dir.path().join("out"),
            ..Options::default()
        });
        let sources = conv.discover(&[src]).expect("discover");
        let cover = conv.extract_cover(&sources[0]).expect("cover");
        assert_eq!(cover, dir.path().join("out/test.jpg"));

        let img = image::open(&cover).expect("decode cover");
        // Natural sort picks page1.png, a 24x36 image.
        assert_eq!((img.width(), img.height()), (24, 36));
    }
}
