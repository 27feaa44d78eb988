//! Background worker fed by a bounded queue.
//!
//! Provides a generic `BackgroundWorker<R>` that processes tasks from an mpsc channel
//! via a `BackgroundRunnable` implementation, with periodic tick callbacks.
//! The worker handle is shareable: `try_submit` and `stop_within` both take
//! `&self`. Submission never waits: a full queue is reported to the caller.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Why a task was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    #[error("worker queue is full")]
    Full,
    #[error("worker is stopped")]
    Closed,
}

// ---------------------------------------------------------------------------
// BackgroundRunnable trait
// ---------------------------------------------------------------------------

/// Trait for task handlers executed by `BackgroundWorker`.
///
/// Implementors define how individual tasks are processed, what happens on each
/// periodic tick, and how to clean up on shutdown.
#[async_trait]
pub trait BackgroundRunnable: Send + 'static {
    /// The type of task this runnable processes.
    type Task: Send + 'static;

    /// Process a single task.
    async fn run(&mut self, task: Self::Task);

    /// Called periodically (on each tick interval). Default is a no-op.
    async fn on_tick(&mut self) {}

    /// Called exactly once, after the queue has been drained. Default is a no-op.
    async fn shutdown(&mut self) {}
}

// ---------------------------------------------------------------------------
// BackgroundWorker
// ---------------------------------------------------------------------------

/// Generic background worker that processes tasks via a bounded mpsc channel.
///
/// The worker spawns a tokio task that:
/// 1. Listens for tasks on the channel, one at a time
/// 2. Calls `BackgroundRunnable::run()` for each task
/// 3. Periodically calls `BackgroundRunnable::on_tick()` at the configured interval
/// 4. Once the channel is closed and empty, calls `BackgroundRunnable::shutdown()`
pub struct BackgroundWorker<R: BackgroundRunnable> {
    tx: RwLock<Option<mpsc::Sender<R::Task>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    capacity: usize,
}

impl<R: BackgroundRunnable> BackgroundWorker<R> {
    /// Start the background worker with the given runnable, queue capacity,
    /// and tick interval. Must be called from within a tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn start(mut runnable: R, capacity: usize, tick_interval: Duration) -> Self {
        let (tx, mut rx) = mpsc::channel::<R::Task>(capacity);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick_interval);
            // Skip the first immediate tick so on_tick doesn't fire at startup.
            ticker.tick().await;

            loop {
                tokio::select! {
                    task = rx.recv() => {
                        match task {
                            Some(t) => runnable.run(t).await,
                            None => break, // Closed and drained.
                        }
                    }
                    _ = ticker.tick() => {
                        runnable.on_tick().await;
                    }
                }
            }

            runnable.shutdown().await;
        });

        Self {
            tx: RwLock::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
            capacity,
        }
    }

    /// Queue a task without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Full`] when the queue has no free slot and
    /// [`WorkerError::Closed`] once the worker has been stopped.
    pub fn try_submit(&self, task: R::Task) -> Result<(), WorkerError> {
        let guard = self.tx.read();
        let Some(tx) = guard.as_ref() else {
            return Err(WorkerError::Closed);
        };
        tx.try_send(task).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => WorkerError::Full,
            mpsc::error::TrySendError::Closed(_) => WorkerError::Closed,
        })
    }

    /// Number of tasks queued but not yet picked up.
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.tx
            .read()
            .as_ref()
            .map_or(0, |tx| self.capacity.saturating_sub(tx.capacity()))
    }

    /// Returns `true` until `stop_within()` has been called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.tx.read().is_some()
    }

    /// Stop accepting tasks and let the worker drain what is queued, waiting
    /// at most `limit`. A worker still busy after `limit` is aborted and its
    /// `shutdown` hook does not run.
    ///
    /// Returns `false` if the worker had to be aborted. Calling it again is a
    /// no-op that returns `true`.
    pub async fn stop_within(&self, limit: Duration) -> bool {
        // Closing the sender lets the loop drain the queue and exit.
        self.tx.write().take();
        let Some(mut handle) = self.handle.lock().await.take() else {
            return true;
        };
        if tokio::time::timeout(limit, &mut handle).await.is_ok() {
            true
        } else {
            handle.abort();
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
