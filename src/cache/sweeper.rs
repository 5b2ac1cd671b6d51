//! Periodic cache cleanup task.
//!
//! Runs a sweep on a fixed interval, independent of render calls. The first
//! pass happens as soon as the task starts. Each pass takes the cache's
//! write lock, so renders storing at that moment wait for it to finish.

use super::{CacheError, CacheManager, SweepReport};
use crate::constants::SWEEPER_TASK_NAME;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct CacheSweeper {
    cache: Arc<CacheManager>,
    interval: Duration,
    /// Shutdown sender (Some while the task is running)
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CacheSweeper {
    pub fn new(cache: Arc<CacheManager>, interval: Duration) -> Self {
        Self {
            cache,
            interval,
            shutdown: Mutex::new(None),
            handle: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        SWEEPER_TASK_NAME
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.lock().is_some()
    }

    /// Run one cleanup pass on the calling thread and log the result.
    pub fn run_once(&self) -> Result<SweepReport, CacheError> {
        run_pass(&self.cache)
    }

    /// Spawn the interval task on the current tokio runtime.
    ///
    /// Calling this while the task is already running is a no-op.
    pub fn start(&self) {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        {
            let mut guard = self.shutdown.lock();
            if guard.is_some() {
                tracing::debug!(task = SWEEPER_TASK_NAME, "Cache sweeper already running, skipping duplicate start");
                return;
            }
            *guard = Some(shutdown_tx);
        }

        let cache = Arc::clone(&self.cache);
        let interval = self.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Directory walks and deletes block; keep them off the async workers.
                        let cache = Arc::clone(&cache);
                        match tokio::task::spawn_blocking(move || run_pass(&cache)).await {
                            Ok(_) => {}
                            Err(e) => {
                                tracing::error!(task = SWEEPER_TASK_NAME, error = %e, "Cache sweep task panicked");
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::debug!(task = SWEEPER_TASK_NAME, "Cache sweeper shutting down");
                        break;
                    }
                }
            }
        });
        *self.handle.lock() = Some(handle);

        tracing::info!(
            task = SWEEPER_TASK_NAME,
            interval_secs = interval.as_secs(),
            ttl_secs = self.cache.ttl().as_secs(),
            "Started cache sweeper"
        );
    }

    /// Signal the task to stop after its current pass.
    pub fn stop(&self) {
        if let Some(shutdown_tx) = self.shutdown.lock().take() {
            let _ = shutdown_tx.send(());
        }
    }

    /// Stop the task and wait for it to exit.
    pub async fn shutdown(&self) {
        self.stop();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_pass(cache: &CacheManager) -> Result<SweepReport, CacheError> {
    tracing::info!(task = SWEEPER_TASK_NAME, root = %cache.root().display(), "Cleaning watermark cache");
    match cache.sweep() {
        Ok(report) => {
            tracing::info!(
                task = SWEEPER_TASK_NAME,
                removed = report.removed,
                cache_size = report.remaining_bytes,
                unit = "bytes",
                "Watermark cache cleanup finished"
            );
            Ok(report)
        }
        Err(e) => {
            tracing::error!(task = SWEEPER_TASK_NAME, error = %e, "Watermark cache cleanup failed");
            Err(e)
        }
    }
}
