//! Queue runtime owning the worker task.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backend::DownloadBackend;
use crate::config::QueueConfig;
use crate::error::{QueueError, Result};
use crate::job::JobDescriptor;
use crate::queue::JobQueue;
use crate::status::StatusSnapshot;
use crate::worker::Worker;

/// Combines the job queue with its background worker.
pub struct TorrentRuntime {
    queue: Arc<JobQueue>,
    backend: Arc<dyn DownloadBackend>,
    config: QueueConfig,
    /// Handle to the worker task.
    worker_handle: Option<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    started: bool,
}

impl TorrentRuntime {
    /// Create a runtime. The worker does not run until [`start`](Self::start).
    pub fn new(backend: Arc<dyn DownloadBackend>, config: QueueConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            queue: Arc::new(JobQueue::new(config.status_preview_len)),
            backend,
            config,
            worker_handle: None,
            shutdown_tx,
            shutdown_rx,
            started: false,
        }
    }

    /// Spawn the worker task.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(QueueError::AlreadyStarted);
        }

        info!("starting torrent runtime");

        let mut worker = Worker::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.backend),
            self.config.clone(),
            self.shutdown_rx.clone(),
        );
        self.worker_handle = Some(tokio::spawn(async move {
            worker.run().await;
        }));
        self.started = true;

        Ok(())
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// Queued jobs are dropped with the runtime; nothing is persisted.
    pub async fn shutdown(&mut self) -> Result<()> {
        if !self.started {
            return Err(QueueError::NotStarted);
        }

        info!("shutting down torrent runtime");

        self.shutdown_tx.send(true).map_err(|e| {
            QueueError::Shutdown(format!("failed to send shutdown signal: {}", e))
        })?;

        if let Some(handle) = self.worker_handle.take() {
            debug!("waiting for worker to stop");
            handle
                .await
                .map_err(|e| QueueError::Shutdown(format!("worker task panicked: {}", e)))?;
        }

        self.started = false;
        Ok(())
    }

    /// Queue a job. Returns its 1-based position.
    pub async fn submit(&self, job: JobDescriptor) -> usize {
        self.queue.enqueue(job).await
    }

    /// Snapshot of the active job and queue.
    pub async fn status(&self) -> StatusSnapshot {
        self.queue.snapshot().await
    }

    pub fn queue(&self) -> Arc<JobQueue> {
        Arc::clone(&self.queue)
    }

    pub fn backend(&self) -> Arc<dyn DownloadBackend> {
        Arc::clone(&self.backend)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl Drop for TorrentRuntime {
    fn drop(&mut self) {
        if self.started {
            let _ = self.shutdown_tx.send(true);
        }
    }
}
