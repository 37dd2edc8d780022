//! Single-slot torrent download queue for Seedbot.
//!
//! Jobs (magnet links or uploaded `.torrent` files) are queued in FIFO order
//! and handed one at a time to a download daemon (qBittorrent) by a
//! background worker, which polls the daemon until the job finishes and
//! reports progress back to whoever submitted it.
//!
//! - `JobQueue` - pending jobs plus the single active slot, behind one lock
//! - `Worker` - claims jobs and drives them to completion or failure
//! - `QbittorrentClient` - the WebUI API client
//! - `TorrentRuntime` - main entry point owning the queue and worker task
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use seedbot_queue::{BackendConfig, JobDescriptor, QbittorrentClient, QueueConfig, Requester, TorrentRuntime};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Arc::new(QbittorrentClient::new(BackendConfig::from_env()?));
//!     let mut runtime = TorrentRuntime::new(backend, QueueConfig::default());
//!     runtime.start()?;
//!
//!     let requester = Requester::new(chat_id, notifier);
//!     let job = JobDescriptor::magnet("magnet:?xt=urn:btih:...&dn=debian", requester)?;
//!     let position = runtime.submit(job).await;
//!
//!     println!("{}", runtime.status().await.render());
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod job;
pub mod notifier;
pub mod qbittorrent;
pub mod queue;
pub mod runtime;
pub mod status;
pub mod worker;

pub use backend::{BackendSession, DownloadBackend, JobSnapshot};
pub use config::{BackendConfig, QueueConfig};
pub use error::{BackendError, QueueError, Result};
pub use job::{ActiveJob, JobDescriptor, JobKind, JobPayload, JobStatus, Requester};
pub use notifier::{Notice, Notifier};
pub use qbittorrent::QbittorrentClient;
pub use queue::JobQueue;
pub use runtime::TorrentRuntime;
pub use status::{ActiveJobView, StatusSnapshot};
pub use worker::Worker;
