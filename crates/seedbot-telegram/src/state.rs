//! Shared state for the Telegram handlers.

use std::collections::HashSet;
use std::sync::Arc;

use seedbot_queue::{DownloadBackend, JobQueue, Notifier, Requester};

/// State shared across handlers.
///
/// Handlers may only append to the queue and read snapshots of it.
pub struct BotState {
    queue: Arc<JobQueue>,
    backend: Arc<dyn DownloadBackend>,
    notifier: Arc<dyn Notifier>,
    authorized_users: HashSet<u64>,
    /// Shown to the operator when the backend is unreachable.
    backend_url: String,
}

impl BotState {
    pub fn new(
        queue: Arc<JobQueue>,
        backend: Arc<dyn DownloadBackend>,
        notifier: Arc<dyn Notifier>,
        authorized_users: HashSet<u64>,
        backend_url: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            backend,
            notifier,
            authorized_users,
            backend_url: backend_url.into(),
        }
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn backend(&self) -> &dyn DownloadBackend {
        self.backend.as_ref()
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    /// Check a Telegram user id against the allow list.
    pub fn is_authorized(&self, user_id: u64) -> bool {
        self.authorized_users.contains(&user_id)
    }

    /// Notification route for jobs submitted from `chat_id`.
    pub fn requester(&self, chat_id: i64) -> Requester {
        Requester::new(chat_id, Arc::clone(&self.notifier))
    }
}
