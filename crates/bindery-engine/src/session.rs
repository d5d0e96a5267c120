// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-input conversion session: a private scratch directory plus a child
// cancellation token. The scratch directory is deleted exactly once, either
// explicitly on success or by drop on every failure and cancellation path.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use bindery_core::error::Result;

/// Shared progress counters, updated atomically from worker threads.
///
/// `current` counters never exceed their `total` counterparts: totals are
/// fixed before any work is dispatched and currents only advance when a
/// unit completes.
#[derive(Debug, Default)]
pub struct Progress {
    total_files: AtomicUsize,
    current_file: AtomicUsize,
    total_entries: AtomicUsize,
    current_entry: AtomicUsize,
}

impl Progress {
    pub fn set_total_files(&self, total: usize) {
        self.total_files.store(total, Ordering::SeqCst);
        self.current_file.store(0, Ordering::SeqCst);
    }

    pub fn file_started(&self) {
        self.current_file.fetch_add(1, Ordering::SeqCst);
    }

    /// Reset the per-input entry counters for a new source.
    pub fn reset_entries(&self, total: usize) {
        self.total_entries.store(total, Ordering::SeqCst);
        self.current_entry.store(0, Ordering::SeqCst);
    }

    pub fn entry_done(&self) {
        self.current_entry.fetch_add(1, Ordering::SeqCst);
    }

    pub fn files(&self) -> (usize, usize) {
        (
            self.current_file.load(Ordering::SeqCst),
            self.total_files.load(Ordering::SeqCst),
        )
    }

    pub fn entries(&self) -> (usize, usize) {
        (
            self.current_entry.load(Ordering::SeqCst),
            self.total_entries.load(Ordering::SeqCst),
        )
    }
}

/// One conversion session for one input.
pub struct Session {
    scratch: TempDir,
    token: CancellationToken,
}

impl Session {
    /// Create a fresh scratch directory and a token that fires when the
    /// converter-wide token does.
    pub fn new(parent: &CancellationToken) -> Result<Self> {
        let scratch = TempDir::with_prefix("bindery-")?;
        debug!(scratch = %scratch.path().display(), "session opened");
        Ok(Self {
            scratch,
            token: parent.child_token(),
        })
    }

    pub fn scratch(&self) -> &Path {
        self.scratch.path()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Delete the scratch directory after a successful conversion. Failure
    /// paths skip this and rely on drop instead.
    pub fn finish(self) -> Result<()> {
        self.scratch.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_is_private_and_removed_on_drop() {
        let parent = CancellationToken::new();
        let a = Session::new(&parent).expect("session a");
        let b = Session::new(&parent).expect("session b");
        assert_ne!(a.scratch(), b.scratch());

        let path = a.scratch().to_path_buf();
        assert!(path.is_dir());
        drop(a);
        assert!(!path.exists());

        let path = b.scratch().to_path_buf();
        b.finish().expect("finish");
        assert!(!path.exists());
    }

    #[test]
    fn child_token_follows_parent() {
        let parent = CancellationToken::new();
        let session = Session::new(&parent).expect("session");
        assert!(!session.token().is_cancelled());
        parent.cancel();
        assert!(session.token().is_cancelled());
    }

    #[test]
    fn progress_counters_track_units() {
        let progress = Progress::default();
        progress.set_total_files(2);
        progress.file_started();
        assert_eq!(progress.files(), (1, 2));

        progress.reset_entries(5);
        progress.entry_done();
        progress.entry_done();
        assert_eq!(progress.entries(), (2, 5));

        progress.reset_entries(3);
        assert_eq!(progress.entries(), (0, 3));
    }
}
