//! Job descriptors and the active job slot.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{QueueError, Result};
use crate::notifier::{truncate_chars, Notice, Notifier};

/// Maximum display name length.
pub const MAX_DISPLAY_NAME_LEN: usize = 50;

/// Display name used when a magnet carries no `dn` parameter.
const DEFAULT_MAGNET_NAME: &str = "magnet_download";

/// Kind of torrent job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// A `magnet:` URI.
    MagnetLink,
    /// Raw `.torrent` file content.
    TorrentFile,
}

/// What gets handed to the backend.
#[derive(Clone, PartialEq, Eq)]
pub enum JobPayload {
    Magnet(String),
    File(Vec<u8>),
}

impl fmt::Debug for JobPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobPayload::Magnet(uri) => f.debug_tuple("Magnet").field(uri).finish(),
            JobPayload::File(bytes) => write!(f, "File({} bytes)", bytes.len()),
        }
    }
}

/// Who asked for a job and how to reach them.
#[derive(Clone)]
pub struct Requester {
    /// Chat the job was submitted from.
    pub chat_id: i64,
    /// Where notices are delivered.
    pub notifier: Arc<dyn Notifier>,
}

impl fmt::Debug for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requester")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

impl Requester {
    /// Creates a new requester.
    pub fn new(chat_id: i64, notifier: Arc<dyn Notifier>) -> Self {
        Self { chat_id, notifier }
    }

    /// Deliver a notice, best effort.
    pub async fn notify(&self, notice: &Notice) -> bool {
        let delivered = self.notifier.send(self.chat_id, &notice.to_string()).await;
        if !delivered {
            debug!(chat_id = self.chat_id, ?notice, "notice not delivered");
        }
        delivered
    }
}

/// A pending unit of work. Immutable once built.
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    kind: JobKind,
    payload: JobPayload,
    display_name: String,
    /// Lowercase hex info hash, when the magnet carries one.
    info_hash: Option<String>,
    requester: Requester,
}

impl JobDescriptor {
    /// Build a magnet job. The display name comes from the `dn` parameter.
    pub fn magnet(uri: impl Into<String>, requester: Requester) -> Result<Self> {
        let uri = uri.into().trim().to_string();
        if !uri.starts_with("magnet:") {
            return Err(QueueError::InvalidMagnet(truncate_chars(
                &uri,
                MAX_DISPLAY_NAME_LEN,
            )));
        }

        let display_name = magnet_display_name(&uri);
        let info_hash = magnet_info_hash(&uri);
        Ok(Self {
            kind: JobKind::MagnetLink,
            payload: JobPayload::Magnet(uri),
            display_name,
            info_hash,
            requester,
        })
    }

    /// Build a job from uploaded `.torrent` content.
    pub fn torrent_file(
        file_name: &str,
        content: Vec<u8>,
        requester: Requester,
    ) -> Result<Self> {
        if !file_name.to_ascii_lowercase().ends_with(".torrent") {
            return Err(QueueError::InvalidTorrentFile(file_name.to_string()));
        }

        Ok(Self {
            kind: JobKind::TorrentFile,
            payload: JobPayload::File(content),
            display_name: truncate_chars(file_name, MAX_DISPLAY_NAME_LEN),
            info_hash: None,
            requester,
        })
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn payload(&self) -> &JobPayload {
        &self.payload
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Info hash the backend will list this job under, if known up front.
    pub fn info_hash(&self) -> Option<&str> {
        self.info_hash.as_deref()
    }

    pub fn requester(&self) -> &Requester {
        &self.requester
    }
}

/// Extract the decoded `dn` parameter of a magnet URI.
pub fn magnet_display_name(uri: &str) -> String {
    let name = url::Url::parse(uri).ok().and_then(|parsed| {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "dn")
            .map(|(_, value)| value.into_owned())
    });

    match name {
        Some(n) if !n.trim().is_empty() => truncate_chars(n.trim(), MAX_DISPLAY_NAME_LEN),
        _ => DEFAULT_MAGNET_NAME.to_string(),
    }
}

/// Extract a v1 info hash from the `xt=urn:btih:` parameter.
///
/// Only the 40-character hex form is recognised. qBittorrent reports hashes
/// as lowercase hex, so the result is lowercased.
pub fn magnet_info_hash(uri: &str) -> Option<String> {
    let parsed = url::Url::parse(uri).ok()?;
    let hash = parsed.query_pairs().find_map(|(key, value)| {
        if key != "xt" {
            return None;
        }
        let value = value.to_ascii_lowercase();
        value.strip_prefix("urn:btih:").map(str::to_string)
    })?;

    (hash.len() == 40 && hash.chars().all(|c| c.is_ascii_hexdigit())).then_some(hash)
}

/// Life-cycle tag of the active job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Starting,
    Authenticating,
    Adding,
    Downloading,
    /// A state string reported by the backend while polling.
    Backend(String),
    Completed,
    Failed(String),
}

impl JobStatus {
    /// Returns true for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed(_))
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Starting => write!(f, "starting"),
            JobStatus::Authenticating => write!(f, "authenticating"),
            JobStatus::Adding => write!(f, "adding"),
            JobStatus::Downloading => write!(f, "downloading"),
            JobStatus::Backend(state) => write!(f, "{}", state),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed(reason) => write!(f, "error: {}", reason),
        }
    }
}

/// The job occupying the processing slot.
#[derive(Debug, Clone)]
pub struct ActiveJob {
    /// Display name, replaced by the backend's name once known.
    pub name: String,
    /// Backend identifier (info hash) once matched.
    pub backend_id: Option<String>,
    /// Current status.
    pub status: JobStatus,
    progress_percent: u8,
    /// Notification route of the originating job.
    pub requester: Requester,
}

impl ActiveJob {
    /// Claim the slot for `job`.
    pub fn from_descriptor(job: &JobDescriptor) -> Self {
        Self {
            name: job.display_name().to_string(),
            backend_id: None,
            status: JobStatus::Starting,
            progress_percent: 0,
            requester: job.requester().clone(),
        }
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    /// Record a progress observation. Progress never goes backwards.
    pub fn record_progress(&mut self, percent: u8) -> u8 {
        self.progress_percent = self.progress_percent.max(percent.min(100));
        self.progress_percent
    }
}
