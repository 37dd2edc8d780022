//! Download backend abstraction.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::BackendError;

/// Backend states that mean the download phase is over.
const FINISHED_STATES: &[&str] = &[
    "stalledup",
    "forcedup",
    "uploading",
    "completed",
    "pausedup",
    "stoppedup",
];

/// Backend states that mean data is actively being fetched.
const DOWNLOADING_STATES: &[&str] = &["downloading", "stalleddl", "forceddl"];

/// An authenticated backend session. Valid for one job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendSession {
    cookie: Option<String>,
}

impl BackendSession {
    /// Creates a session carrying the given cookie header value.
    pub fn new(cookie: Option<String>) -> Self {
        Self { cookie }
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }
}

/// A job as reported by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobSnapshot {
    #[serde(default)]
    pub name: String,
    /// Completion fraction in `0.0..=1.0`.
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub save_path: String,
    #[serde(default)]
    pub hash: String,
    /// Unix timestamp (seconds).
    #[serde(default)]
    pub added_on: i64,
}

impl JobSnapshot {
    /// Progress as a whole percentage.
    pub fn progress_percent(&self) -> u8 {
        (self.progress * 100.0).clamp(0.0, 100.0) as u8
    }

    /// Returns true once the job has left the download phase.
    pub fn is_finished(&self) -> bool {
        let state = self.state.to_ascii_lowercase();
        FINISHED_STATES.contains(&state.as_str()) || self.progress_percent() >= 100
    }

    /// Returns true while data is being fetched.
    pub fn is_downloading(&self) -> bool {
        let state = self.state.to_ascii_lowercase();
        DOWNLOADING_STATES.contains(&state.as_str())
    }

    /// Returns true if the save path equals `path`, ignoring trailing slashes.
    pub fn saves_to(&self, path: &Path) -> bool {
        let ours = path.to_string_lossy();
        !self.save_path.is_empty()
            && self.save_path.trim_end_matches('/') == ours.trim_end_matches('/')
    }

    /// When the backend accepted the job.
    pub fn added_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.added_on, 0)
    }
}

/// Control API of an external download daemon.
///
/// No method retries internally; the worker owns retry policy.
#[async_trait]
pub trait DownloadBackend: Send + Sync {
    /// Log in and return a session.
    async fn authenticate(&self) -> Result<BackendSession, BackendError>;

    /// Add a magnet link saving into `destination`.
    async fn submit_magnet(
        &self,
        session: &BackendSession,
        magnet: &str,
        destination: &Path,
    ) -> Result<(), BackendError>;

    /// Add `.torrent` file content saving into `destination`.
    async fn submit_file(
        &self,
        session: &BackendSession,
        content: &[u8],
        destination: &Path,
    ) -> Result<(), BackendError>;

    /// List every job the backend knows about.
    async fn list_jobs(&self, session: &BackendSession) -> Result<Vec<JobSnapshot>, BackendError>;

    /// Save path passed with every submission.
    fn destination(&self) -> &Path;
}
