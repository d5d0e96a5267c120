// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded-parallel execution of CPU-bound page jobs. Each conversion
// session owns its own pool; nothing here is shared across sessions, so
// cancelling one conversion never stalls another.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use bindery_core::error::{BinderyError, Result};

/// A pool that runs blocking jobs with at most `available_parallelism + 1`
/// in flight. The extra permit keeps a job queued behind the CPUs so a
/// worker never idles waiting on the dispatch loop.
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    token: CancellationToken,
    tasks: JoinSet<Result<()>>,
}

impl WorkerPool {
    pub fn new(token: CancellationToken) -> Self {
        let permits = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            + 1;
        Self::with_permits(permits, token)
    }

    /// Pool bounded at exactly `permits` in-flight jobs (minimum one).
    pub fn with_permits(permits: usize, token: CancellationToken) -> Self {
        let permits = permits.max(1);
        debug!(permits, "worker pool created");
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            token,
            tasks: JoinSet::new(),
        }
    }

    /// Submit one blocking job, waiting until a permit is free.
    ///
    /// Returns `Cancelled` without running the job once the token has
    /// fired, so a dispatch loop stops on the first failed page.
    pub async fn dispatch<F>(&mut self, job: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        if self.token.is_cancelled() {
            return Err(BinderyError::Cancelled);
        }
        let permit = tokio::select! {
            _ = self.token.cancelled() => return Err(BinderyError::Cancelled),
            permit = self.semaphore.clone().acquire_owned() => {
                permit.map_err(|err| BinderyError::Worker(err.to_string()))?
            }
        };

        let token = self.token.clone();
        self.tasks.spawn(async move {
            let _permit = permit;
            if token.is_cancelled() {
                return Err(BinderyError::Cancelled);
            }
            let result = tokio::task::spawn_blocking(job)
                .await
                .map_err(|err| BinderyError::Worker(err.to_string()))?;
            if let Err(err) = &result {
                if !err.is_cancelled() {
                    warn!(%err, "job failed, cancelling session");
                    token.cancel();
                }
            }
            result
        });
        Ok(())
    }

    /// Wait for every dispatched job. Returns the first real error, or
    /// `Cancelled` when the token fired without a job failing (external
    /// cancellation).
    pub async fn join(mut self) -> Result<()> {
        let mut first_error: Option<BinderyError> = None;
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    if first_error.is_none() && !err.is_cancelled() {
                        first_error = Some(err);
                    }
                }
                Err(err) => {
                    self.token.cancel();
                    if first_error.is_none() {
                        first_error = Some(BinderyError::Worker(err.to_string()));
                    }
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None if self.token.is_cancelled() => Err(BinderyError::Cancelled),
            None => Ok(()),
        }
    }
}
