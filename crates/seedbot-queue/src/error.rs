//! Error types for the queue crate.

use thiserror::Error;

/// Errors reported by a download backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Credentials rejected or endpoint unreachable.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The backend refused the add request.
    #[error("failed to add job: {0}")]
    Submit(String),

    /// Listing jobs failed.
    #[error("failed to list jobs: {0}")]
    Query(String),
}

/// Errors that can occur in the queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Magnet URI does not start with `magnet:`.
    #[error("invalid magnet link: {0}")]
    InvalidMagnet(String),

    /// Uploaded file is not a `.torrent`.
    #[error("not a .torrent file: {0}")]
    InvalidTorrentFile(String),

    /// Worker already running.
    #[error("worker already started")]
    AlreadyStarted,

    /// Worker not running.
    #[error("worker not started")]
    NotStarted,

    /// Shutdown error.
    #[error("shutdown error: {0}")]
    Shutdown(String),
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
