//! FIFO job queue and the single processing slot.
//!
//! The pending list and the active job live behind one mutex. Critical
//! sections never await anything but the lock itself.

use std::collections::VecDeque;

use tokio::sync::Mutex;
use tracing::debug;

use crate::job::{ActiveJob, JobDescriptor};
use crate::status::{ActiveJobView, StatusSnapshot};

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<JobDescriptor>,
    active: Option<ActiveJob>,
}

/// Pending jobs plus the at-most-one active job.
///
/// Outside this crate the queue can only be appended to and read. Claiming,
/// updating and releasing the slot belong to the [`Worker`](crate::Worker):
///
/// ```compile_fail
/// # async fn release(queue: &seedbot_queue::JobQueue) {
/// queue.clear_slot().await;
/// # }
/// ```
#[derive(Debug)]
pub struct JobQueue {
    state: Mutex<QueueState>,
    preview_len: usize,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new(3)
    }
}

impl JobQueue {
    /// Creates an empty queue whose snapshots list up to `preview_len` names.
    pub fn new(preview_len: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            preview_len,
        }
    }

    /// Append a job. Returns its 1-based position; 1 means next.
    ///
    /// Unbounded: this never rejects.
    pub async fn enqueue(&self, job: JobDescriptor) -> usize {
        let name = job.display_name().to_string();
        let position = {
            let mut state = self.state.lock().await;
            state.pending.push_back(job);
            state.pending.len()
        };
        debug!(job = %name, position, "job queued");
        position
    }

    /// Atomically claim the head of the queue if the slot is free.
    ///
    /// On success the slot holds a fresh [`ActiveJob`] in `Starting`.
    pub(crate) async fn dequeue_if_slot_free(&self) -> Option<JobDescriptor> {
        let mut state = self.state.lock().await;
        if state.active.is_some() {
            return None;
        }
        let job = state.pending.pop_front()?;
        state.active = Some(ActiveJob::from_descriptor(&job));
        Some(job)
    }

    /// Mutate the active job. Returns `None` if the slot is empty.
    pub(crate) async fn update_active<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut ActiveJob) -> R,
    {
        let mut state = self.state.lock().await;
        state.active.as_mut().map(f)
    }

    /// Release the slot, returning the job that held it.
    pub(crate) async fn clear_slot(&self) -> Option<ActiveJob> {
        self.state.lock().await.active.take()
    }

    /// Read the slot and the head of the queue.
    pub async fn snapshot(&self) -> StatusSnapshot {
        let state = self.state.lock().await;
        StatusSnapshot {
            active: state.active.as_ref().map(ActiveJobView::from),
            queued: state.pending.len(),
            upcoming: state
                .pending
                .iter()
                .take(self.preview_len)
                .map(|job| job.display_name().to_string())
                .collect(),
        }
    }

    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn is_slot_free(&self) -> bool {
        self.state.lock().await.active.is_none()
    }
}
