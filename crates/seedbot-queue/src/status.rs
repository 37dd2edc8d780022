//! Point-in-time view of the slot and the queue.

use crate::job::ActiveJob;
use crate::notifier::{progress_bar, truncate_chars};

/// Width of the progress bar in status reports.
const STATUS_BAR_WIDTH: usize = 20;

/// Hash prefix length in status reports.
const HASH_PREFIX_LEN: usize = 16;

/// Name length for queued entries in status reports.
const QUEUED_NAME_LEN: usize = 30;

/// Read-only copy of the active job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveJobView {
    pub name: String,
    pub status: String,
    pub progress_percent: u8,
    pub backend_id: Option<String>,
}

impl From<&ActiveJob> for ActiveJobView {
    fn from(job: &ActiveJob) -> Self {
        Self {
            name: job.name.clone(),
            status: job.status.to_string(),
            progress_percent: job.progress_percent(),
            backend_id: job.backend_id.clone(),
        }
    }
}

/// Snapshot of {active job, queue} taken under the queue lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// The job in the slot, if any.
    pub active: Option<ActiveJobView>,
    /// Number of queued jobs.
    pub queued: usize,
    /// Display names at the head of the queue.
    pub upcoming: Vec<String>,
}

impl StatusSnapshot {
    /// Returns true when nothing is running or waiting.
    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.queued == 0
    }

    /// Format the snapshot for the operator.
    pub fn render(&self) -> String {
        let mut out = match &self.active {
            Some(job) => {
                let mut s = String::from("🔄 Active download:\n\n");
                s.push_str(&format!("Name: {}\n", truncate_chars(&job.name, 50)));
                s.push_str(&format!("Status: {}\n", job.status));
                s.push_str(&format!(
                    "Progress: {}% {}\n",
                    job.progress_percent,
                    progress_bar(job.progress_percent, STATUS_BAR_WIDTH)
                ));
                if let Some(hash) = job.backend_id.as_deref().filter(|h| !h.is_empty()) {
                    s.push_str(&format!("Hash: {}...\n", truncate_chars(hash, HASH_PREFIX_LEN)));
                }
                s.push_str(&format!("Queue: {} waiting", self.queued));
                s
            }
            None => format!("💤 No active download\n\nQueue: {} waiting", self.queued),
        };

        if !self.upcoming.is_empty() {
            out.push_str("\n\nQueued torrents:");
            for (i, name) in self.upcoming.iter().enumerate() {
                out.push_str(&format!("\n{}. {}", i + 1, truncate_chars(name, QUEUED_NAME_LEN)));
            }
            if self.queued > self.upcoming.len() {
                out.push_str(&format!("\n... and {} more", self.queued - self.upcoming.len()));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_idle() {
        let snapshot = StatusSnapshot::default();
        assert!(snapshot.is_idle());
        assert!(snapshot.render().contains("No active download"));
        assert!(snapshot.render().contains("Queue: 0 waiting"));
    }

    #[test]
    fn test_render_active_with_queue() {
        let snapshot = StatusSnapshot {
            active: Some(ActiveJobView {
                name: "ubuntu.iso".to_string(),
                status: "downloading".to_string(),
                progress_percent: 42,
                backend_id: Some("0123456789abcdef0123456789abcdef".to_string()),
            }),
            queued: 5,
            upcoming: vec!["a".into(), "b".into(), "c".into()],
        };

        let text = snapshot.render();
        assert!(text.contains("Name: ubuntu.iso"));
        assert!(text.contains("Progress: 42%"));
        assert!(text.contains("Hash: 0123456789abcdef..."));
        assert!(text.contains("Queue: 5 waiting"));
        assert!(text.contains("3. c"));
        assert!(text.contains("... and 2 more"));
    }

    #[test]
    fn test_render_hides_missing_hash() {
        let snapshot = StatusSnapshot {
            active: Some(ActiveJobView {
                name: "job".to_string(),
                status: "adding".to_string(),
                progress_percent: 0,
                backend_id: None,
            }),
            queued: 0,
            upcoming: vec![],
        };
        assert!(!snapshot.render().contains("Hash:"));
    }
}
