//! qBittorrent WebUI client.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::header::{COOKIE, REFERER, SET_COOKIE};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, RequestBuilder, Response};
use tracing::{debug, info, warn};

use crate::backend::{BackendSession, DownloadBackend, JobSnapshot};
use crate::config::BackendConfig;
use crate::error::BackendError;

/// Body the WebUI returns on a successful login.
const LOGIN_OK_BODY: &str = "Ok.";

/// Name of the WebUI session cookie.
const SESSION_COOKIE: &str = "SID";

/// Client for the qBittorrent WebUI API (`/api/v2`).
pub struct QbittorrentClient {
    http: reqwest::Client,
    config: BackendConfig,
}

impl QbittorrentClient {
    /// Creates a new client.
    pub fn new(config: BackendConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base(), path)
    }

    fn with_session(&self, req: RequestBuilder, session: &BackendSession) -> RequestBuilder {
        let req = req.header(REFERER, self.config.base_url.as_str());
        match session.cookie() {
            Some(cookie) => req.header(COOKIE, cookie),
            None => req,
        }
    }
}

/// Pull `SID=...` out of the login response headers.
fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .find(|pair| pair.starts_with(&format!("{}=", SESSION_COOKIE)))
        .map(str::to_string)
}

/// A `.torrent` written to disk for upload. Removed on drop.
struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    async fn write(dir: &Path, content: &[u8]) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let staged = Self {
            path: dir.join(format!("upload_{}.torrent", uuid::Uuid::new_v4())),
        };
        tokio::fs::write(&staged.path, content).await?;
        Ok(staged)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed staged torrent"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove staged torrent"),
        }
    }
}

#[async_trait]
impl DownloadBackend for QbittorrentClient {
    async fn authenticate(&self) -> Result<BackendSession, BackendError> {
        let url = self.endpoint("/auth/login");
        debug!(url = %url, user = %self.config.username, "logging in to qBittorrent");

        let response = self
            .http
            .post(&url)
            .header(REFERER, self.config.base_url.as_str())
            .form(&[
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
            ])
            .timeout(self.config.login_timeout)
            .send()
            .await
            .map_err(|e| BackendError::Auth(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Auth(format!("login returned {}", status)));
        }

        let cookie = session_cookie(&response);
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Auth(e.to_string()))?;

        if body.trim() != LOGIN_OK_BODY {
            return Err(BackendError::Auth(format!(
                "unexpected login response: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        info!(has_cookie = cookie.is_some(), "qBittorrent login successful");
        Ok(BackendSession::new(cookie))
    }

    async fn submit_magnet(
        &self,
        session: &BackendSession,
        magnet: &str,
        destination: &Path,
    ) -> Result<(), BackendError> {
        let save_path = destination.to_string_lossy();
        debug!(save_path = %save_path, "adding magnet");

        let req = self
            .http
            .post(self.endpoint("/torrents/add"))
            .form(&[
                ("urls", magnet),
                ("savepath", &*save_path),
                ("autoTMM", "false"),
            ])
            .timeout(self.config.add_magnet_timeout);

        let response = self
            .with_session(req, session)
            .send()
            .await
            .map_err(|e| BackendError::Submit(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Submit(format!("add returned {}", status)));
        }
        Ok(())
    }

    async fn submit_file(
        &self,
        session: &BackendSession,
        content: &[u8],
        destination: &Path,
    ) -> Result<(), BackendError> {
        let staged = StagedFile::write(&self.config.staging_dir, content)
            .await
            .map_err(|e| BackendError::Submit(format!("cannot stage torrent file: {}", e)))?;
        debug!(path = %staged.path.display(), "uploading staged torrent");

        let file = tokio::fs::File::open(&staged.path)
            .await
            .map_err(|e| BackendError::Submit(format!("cannot open staged torrent: {}", e)))?;

        let file_name = staged
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.torrent".to_string());

        let part = Part::stream_with_length(Body::from(file), content.len() as u64)
            .file_name(file_name)
            .mime_str("application/x-bittorrent")
            .map_err(|e| BackendError::Submit(e.to_string()))?;

        let form = Form::new()
            .text("savepath", destination.to_string_lossy().into_owned())
            .text("autoTMM", "false")
            .part("torrents", part);

        let req = self
            .http
            .post(self.endpoint("/torrents/add"))
            .multipart(form)
            .timeout(self.config.add_file_timeout);

        let response = self
            .with_session(req, session)
            .send()
            .await
            .map_err(|e| BackendError::Submit(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Submit(format!("upload returned {}", status)));
        }
        Ok(())
    }

    async fn list_jobs(&self, session: &BackendSession) -> Result<Vec<JobSnapshot>, BackendError> {
        let req = self
            .http
            .get(self.endpoint("/torrents/info"))
            .timeout(self.config.list_timeout);

        let response = self
            .with_session(req, session)
            .send()
            .await
            .map_err(|e| BackendError::Query(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Query(format!("info returned {}", status)));
        }

        response
            .json::<Vec<JobSnapshot>>()
            .await
            .map_err(|e| BackendError::Query(e.to_string()))
    }

    fn destination(&self) -> &Path {
        &self.config.download_dir
    }
}
