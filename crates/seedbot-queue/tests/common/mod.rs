//! Shared fixtures for queue integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use seedbot_queue::job::{magnet_display_name, magnet_info_hash};
use seedbot_queue::{
    BackendError, BackendSession, DownloadBackend, JobDescriptor, JobSnapshot, Notifier,
    QueueConfig, Requester,
};

/// Save path reported by the mock backend.
pub const DESTINATION: &str = "/srv/downloads";

/// A job the mock backend has accepted.
struct MockJob {
    name: String,
    hash: String,
    added_on: i64,
    polls: usize,
}

/// In-memory download daemon.
///
/// Every listed job walks through `progression`, one step per `list_jobs`
/// call, and then stays on the last step.
pub struct MockBackend {
    destination: PathBuf,
    progression: Mutex<Vec<(f64, String)>>,
    jobs: Mutex<Vec<MockJob>>,
    reported_name: Mutex<Option<String>>,
    auth_failures: AtomicUsize,
    submit_failures: AtomicUsize,
    list_failures: AtomicUsize,
    pub auth_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub submitted: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            destination: PathBuf::from(DESTINATION),
            progression: Mutex::new(vec![
                (0.0, "metaDL".to_string()),
                (0.42, "downloading".to_string()),
                (1.0, "completed".to_string()),
            ]),
            jobs: Mutex::new(Vec::new()),
            reported_name: Mutex::new(None),
            auth_failures: AtomicUsize::new(0),
            submit_failures: AtomicUsize::new(0),
            list_failures: AtomicUsize::new(0),
            auth_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_progression(self, steps: &[(f64, &str)]) -> Self {
        self.set_progression(steps);
        self
    }

    pub fn set_progression(&self, steps: &[(f64, &str)]) {
        *self.progression.lock().unwrap() = steps
            .iter()
            .map(|(p, s)| (*p, s.to_string()))
            .collect();
    }

    /// A torrent the daemon already had before the test started.
    pub fn with_existing(self, name: &str, hash: &str, added_on: i64) -> Self {
        self.jobs.lock().unwrap().push(MockJob {
            name: name.to_string(),
            hash: hash.to_string(),
            added_on,
            polls: 0,
        });
        self
    }

    /// List accepted jobs under `name` instead of the submitted one.
    pub fn with_reported_name(self, name: &str) -> Self {
        *self.reported_name.lock().unwrap() = Some(name.to_string());
        self
    }

    /// Fail the next `n` logins.
    pub fn fail_auth(self, n: usize) -> Self {
        self.auth_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Fail the next `n` add requests.
    pub fn fail_submit(self, n: usize) -> Self {
        self.submit_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Fail the next `n` job listings.
    pub fn fail_list(self, n: usize) -> Self {
        self.list_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn accept(&self, name: String, hash: Option<String>) {
        let listed = self.reported_name.lock().unwrap().clone();
        let mut jobs = self.jobs.lock().unwrap();
        let n = jobs.len() as i64 + 1;
        jobs.push(MockJob {
            name: listed.unwrap_or_else(|| name.clone()),
            hash: hash.unwrap_or_else(|| format!("{:040x}", n)),
            added_on: 1_700_000_000 + n,
            polls: 0,
        });
        self.submitted.lock().unwrap().push(name);
    }
}

#[async_trait]
impl DownloadBackend for MockBackend {
    async fn authenticate(&self) -> Result<BackendSession, BackendError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.auth_failures) {
            return Err(BackendError::Auth("unexpected login response: Fails.".into()));
        }
        Ok(BackendSession::new(Some("SID=mock".to_string())))
    }

    async fn submit_magnet(
        &self,
        _session: &BackendSession,
        magnet: &str,
        _destination: &Path,
    ) -> Result<(), BackendError> {
        if Self::take_failure(&self.submit_failures) {
            return Err(BackendError::Submit("add returned 415".into()));
        }
        self.accept(magnet_display_name(magnet), magnet_info_hash(magnet));
        Ok(())
    }

    async fn submit_file(
        &self,
        _session: &BackendSession,
        content: &[u8],
        _destination: &Path,
    ) -> Result<(), BackendError> {
        if Self::take_failure(&self.submit_failures) {
            return Err(BackendError::Submit("upload returned 415".into()));
        }
        self.accept(format!("file-{}-bytes", content.len()), None);
        Ok(())
    }

    async fn list_jobs(&self, _session: &BackendSession) -> Result<Vec<JobSnapshot>, BackendError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.list_failures) {
            return Err(BackendError::Query("connection reset".into()));
        }

        let progression = self.progression.lock().unwrap().clone();
        let mut jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .iter_mut()
            .map(|job| {
                let (progress, state) = progression[job.polls.min(progression.len() - 1)].clone();
                job.polls += 1;
                JobSnapshot {
                    name: job.name.clone(),
                    progress,
                    state,
                    save_path: DESTINATION.to_string(),
                    hash: job.hash.clone(),
                    added_on: job.added_on,
                }
            })
            .collect())
    }

    fn destination(&self) -> &Path {
        &self.destination
    }
}

/// Notifier that records everything it is asked to send.
pub struct RecordingNotifier {
    messages: Mutex<Vec<(i64, String)>>,
    deliver: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            deliver: true,
        }
    }

    /// A notifier whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            deliver: false,
        }
    }

    pub fn messages(&self) -> Vec<(i64, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn texts_for(&self, chat_id: i64) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(id, _)| *id == chat_id)
            .map(|(_, text)| text)
            .collect()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.messages()
            .iter()
            .filter(|(_, text)| text.contains(needle))
            .count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, chat_id: i64, text: &str) -> bool {
        self.messages.lock().unwrap().push((chat_id, text.to_string()));
        self.deliver
    }
}

/// Timings small enough for tests.
pub fn fast_config() -> QueueConfig {
    QueueConfig::new()
        .with_idle_interval(Duration::from_millis(5))
        .with_settle_delay(Duration::from_millis(1))
        .with_poll_intervals(Duration::from_millis(2), Duration::from_millis(5))
        .with_query_retry_backoff(Duration::from_millis(2))
        .with_progress_notify_interval(Duration::ZERO)
        .with_cooldown(Duration::from_millis(20))
}

pub fn magnet(name: &str, chat_id: i64, notifier: &Arc<RecordingNotifier>) -> JobDescriptor {
    let requester = Requester::new(chat_id, Arc::clone(notifier) as Arc<dyn Notifier>);
    JobDescriptor::magnet(format!("magnet:?xt=urn:btih:{}&dn={}", chat_id, name), requester)
        .expect("valid magnet")
}

/// Poll `check` until it holds or five seconds pass.
pub async fn wait_for<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    false
}
