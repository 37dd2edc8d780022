//! Queue and backend configuration.
//!
//! # Environment Variables
//!
//! - `QB_URL`: qBittorrent WebUI address (default: `http://127.0.0.1:8080`)
//! - `QB_USER`: WebUI username (required)
//! - `QB_PASS`: WebUI password (required)
//! - `DOWNLOAD_DIR`: Where the backend saves downloads (default: user download dir)
//! - `TORRENT_STAGING_DIR`: Where uploaded `.torrent` files are staged (default: temp dir)

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{QueueError, Result};

/// Environment variable for the WebUI address.
pub const QB_URL_ENV: &str = "QB_URL";

/// Environment variable for the WebUI username.
pub const QB_USER_ENV: &str = "QB_USER";

/// Environment variable for the WebUI password.
pub const QB_PASS_ENV: &str = "QB_PASS";

/// Environment variable for the download directory.
pub const DOWNLOAD_DIR_ENV: &str = "DOWNLOAD_DIR";

/// Environment variable for the staging directory.
pub const STAGING_DIR_ENV: &str = "TORRENT_STAGING_DIR";

const DEFAULT_QB_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_DOWNLOAD_SUBDIR: &str = "Downloads";

/// Configuration for the worker loop.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Sleep between claim attempts while nothing can be claimed.
    pub idle_interval: Duration,
    /// Pause after a successful add before the first poll.
    pub settle_delay: Duration,
    /// Poll interval while unmatched or in the metadata phase.
    pub fast_poll_interval: Duration,
    /// Poll interval once actively downloading.
    pub slow_poll_interval: Duration,
    /// Backoff after a failed job listing.
    pub query_retry_backoff: Duration,
    /// Minimum gap between progress notifications.
    pub progress_notify_interval: Duration,
    /// Delay before a finished job releases the slot.
    pub cooldown: Duration,
    /// Number of queued names shown in a status snapshot.
    pub status_preview_len: usize,
    /// Fail a job that has not finished within this long. `None` polls forever.
    pub max_job_duration: Option<Duration>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_secs(1),
            settle_delay: Duration::from_millis(500),
            fast_poll_interval: Duration::from_millis(500),
            slow_poll_interval: Duration::from_secs(2),
            query_retry_backoff: Duration::from_secs(1),
            progress_notify_interval: Duration::from_secs(30),
            cooldown: Duration::from_millis(500),
            status_preview_len: 3,
            max_job_duration: None,
        }
    }
}

impl QueueConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the idle interval.
    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    /// Sets the settle delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Sets the fast and slow poll intervals.
    pub fn with_poll_intervals(mut self, fast: Duration, slow: Duration) -> Self {
        self.fast_poll_interval = fast;
        self.slow_poll_interval = slow;
        self
    }

    /// Sets the query retry backoff.
    pub fn with_query_retry_backoff(mut self, backoff: Duration) -> Self {
        self.query_retry_backoff = backoff;
        self
    }

    /// Sets the progress notification interval.
    pub fn with_progress_notify_interval(mut self, interval: Duration) -> Self {
        self.progress_notify_interval = interval;
        self
    }

    /// Sets the cooldown.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Sets the status preview length.
    pub fn with_status_preview_len(mut self, len: usize) -> Self {
        self.status_preview_len = len;
        self
    }

    /// Sets the maximum job duration.
    pub fn with_max_job_duration(mut self, limit: Duration) -> Self {
        self.max_job_duration = Some(limit);
        self
    }

    /// Set the time limit in whole minutes. Saturates on overflow.
    pub fn with_max_job_minutes(self, minutes: u64) -> Self {
        self.with_max_job_duration(Duration::from_secs(minutes.saturating_mul(60)))
    }
}

/// Connection settings for the qBittorrent WebUI.
#[derive(Clone)]
pub struct BackendConfig {
    /// WebUI address, without the `/api/v2` suffix.
    pub base_url: String,
    /// WebUI username.
    pub username: String,
    /// WebUI password.
    pub password: String,
    /// Absolute save path handed to the backend.
    pub download_dir: PathBuf,
    /// Directory for transient `.torrent` files.
    pub staging_dir: PathBuf,
    /// Timeout for the login request.
    pub login_timeout: Duration,
    /// Timeout for a magnet add.
    pub add_magnet_timeout: Duration,
    /// Timeout for a file upload.
    pub add_file_timeout: Duration,
    /// Timeout for a job listing.
    pub list_timeout: Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("download_dir", &self.download_dir)
            .field("staging_dir", &self.staging_dir)
            .finish()
    }
}

impl BackendConfig {
    /// Creates a config with default timeouts.
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        download_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            download_dir: absolutize(download_dir.as_ref()),
            staging_dir: std::env::temp_dir(),
            login_timeout: Duration::from_secs(10),
            add_magnet_timeout: Duration::from_secs(30),
            add_file_timeout: Duration::from_secs(60),
            list_timeout: Duration::from_secs(10),
        }
    }

    /// Load settings from the environment.
    ///
    /// Fails if `QB_USER` or `QB_PASS` is missing or empty.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var(QB_URL_ENV).unwrap_or_else(|_| DEFAULT_QB_URL.to_string());
        let username = non_empty_env(QB_USER_ENV)?;
        let password = non_empty_env(QB_PASS_ENV)?;

        let download_dir = std::env::var(DOWNLOAD_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::download_dir().unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_SUBDIR))
            });

        let mut config = Self::new(base_url, username, password, download_dir);
        if let Ok(staging) = std::env::var(STAGING_DIR_ENV) {
            config.staging_dir = PathBuf::from(staging);
        }
        Ok(config)
    }

    /// Sets the staging directory.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    /// The `/api/v2` root of the WebUI.
    pub fn api_base(&self) -> String {
        format!("{}/api/v2", self.base_url.trim_end_matches('/'))
    }
}

fn non_empty_env(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(QueueError::Config(format!("{} is not set", key))),
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
