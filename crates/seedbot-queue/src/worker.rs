//! Background worker draining the queue one job at a time.
//!
//! Each job moves through `Starting → Authenticating → Adding → Downloading`
//! and ends `Completed` or `Failed`, after which the slot is released
//! following a short cooldown. Every loop iteration runs one [`Phase`] step
//! and then suspends exactly once, on the step's delay or shutdown.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::backend::{BackendSession, DownloadBackend, JobSnapshot};
use crate::config::QueueConfig;
use crate::job::{JobDescriptor, JobPayload, JobStatus};
use crate::notifier::Notice;
use crate::queue::JobQueue;

/// Minimum gap between progress log lines.
const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Failure reason when login fails.
pub const REASON_CONNECT: &str = "cannot connect to backend";

/// Failure reason when the add request fails.
pub const REASON_ADD: &str = "failed to add job";

/// Failure reason when a job exceeds `max_job_duration`.
pub const REASON_TIMEOUT: &str = "timed out";

/// A claimed job and when it was claimed.
struct JobContext {
    job: JobDescriptor,
    claimed_at: Instant,
}

impl JobContext {
    async fn notify(&self, notice: Notice) {
        self.job.requester().notify(&notice).await;
    }
}

/// Per-job polling state.
struct Tracker {
    session: BackendSession,
    /// Best known name, overwritten by the backend's.
    name: String,
    backend_id: Option<String>,
    last_notice: Option<Instant>,
    last_log: Option<Instant>,
}

impl Tracker {
    fn new(session: BackendSession, name: &str, backend_id: Option<&str>) -> Self {
        Self {
            session,
            name: name.to_string(),
            backend_id: backend_id.map(str::to_string),
            last_notice: None,
            last_log: None,
        }
    }

    fn notice_due(&self, now: Instant, every: Duration) -> bool {
        self.last_notice.map_or(true, |t| now.duration_since(t) >= every)
    }

    fn log_due(&self, now: Instant) -> bool {
        self.last_log
            .map_or(true, |t| now.duration_since(t) >= PROGRESS_LOG_INTERVAL)
    }
}

/// Worker state between iterations.
enum Phase {
    Idle,
    Starting(JobContext),
    Authenticating(JobContext),
    Adding(JobContext, BackendSession),
    Downloading(JobContext, Tracker),
    Cooldown,
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Starting(_) => "starting",
            Phase::Authenticating(_) => "authenticating",
            Phase::Adding(..) => "adding",
            Phase::Downloading(..) => "downloading",
            Phase::Cooldown => "cooldown",
        }
    }
}

/// How a backend job was matched to ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    BackendId,
    Name,
    SavePath,
    Newest,
}

/// Pick the backend job that corresponds to ours.
///
/// A known backend id is authoritative: if it is not listed, nothing matches.
/// Without one, try the exact name, then the save path, then the most
/// recently added job. The last two are heuristics and can pick the wrong
/// job when several share a destination.
pub fn correlate<'a>(
    jobs: &'a [JobSnapshot],
    backend_id: Option<&str>,
    name: &str,
    destination: &Path,
) -> Option<(&'a JobSnapshot, MatchedBy)> {
    if let Some(id) = backend_id.filter(|id| !id.is_empty()) {
        return jobs
            .iter()
            .find(|j| j.hash.eq_ignore_ascii_case(id))
            .map(|j| (j, MatchedBy::BackendId));
    }

    jobs.iter()
        .find(|j| j.name == name)
        .map(|j| (j, MatchedBy::Name))
        .or_else(|| {
            jobs.iter()
                .find(|j| j.saves_to(destination))
                .map(|j| (j, MatchedBy::SavePath))
        })
        .or_else(|| {
            jobs.iter()
                .max_by_key(|j| j.added_on)
                .map(|j| (j, MatchedBy::Newest))
        })
}

/// Drains the queue and drives each job to a terminal state.
pub struct Worker {
    queue: Arc<JobQueue>,
    backend: Arc<dyn DownloadBackend>,
    config: QueueConfig,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    /// Creates a new worker.
    pub fn new(
        queue: Arc<JobQueue>,
        backend: Arc<dyn DownloadBackend>,
        config: QueueConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            queue,
            backend,
            config,
            shutdown,
        }
    }

    /// Run until the shutdown signal fires.
    pub async fn run(&mut self) {
        info!("torrent worker started");
        let mut phase = Phase::Idle;

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let (next, delay) = self.step(phase).await;
            trace!(phase = next.name(), delay_ms = delay.as_millis() as u64, "worker step");
            phase = next;

            if delay.is_zero() {
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        debug!("worker received shutdown signal");
                        break;
                    }
                }
            }
        }

        if !matches!(phase, Phase::Idle) {
            if let Some(job) = self.queue.clear_slot().await {
                warn!(job = %job.name, status = %job.status, "abandoning active job on shutdown");
            }
        }
        info!("torrent worker stopped");
    }

    async fn step(&self, phase: Phase) -> (Phase, Duration) {
        match phase {
            Phase::Idle => match self.queue.dequeue_if_slot_free().await {
                Some(job) => (
                    Phase::Starting(JobContext {
                        job,
                        claimed_at: Instant::now(),
                    }),
                    Duration::ZERO,
                ),
                None => (Phase::Idle, self.config.idle_interval),
            },

            Phase::Starting(ctx) => {
                info!(
                    job = %ctx.job.display_name(),
                    kind = ?ctx.job.kind(),
                    "processing torrent job"
                );
                ctx.notify(Notice::Started {
                    name: ctx.job.display_name().to_string(),
                })
                .await;
                (Phase::Authenticating(ctx), Duration::ZERO)
            }

            Phase::Authenticating(ctx) => {
                self.set_status(JobStatus::Authenticating).await;
                match self.backend.authenticate().await {
                    Ok(session) => (Phase::Adding(ctx, session), Duration::ZERO),
                    Err(e) => {
                        warn!(job = %ctx.job.display_name(), error = %e, "backend login failed");
                        self.fail(&ctx, REASON_CONNECT).await
                    }
                }
            }

            Phase::Adding(ctx, session) => self.add(ctx, session).await,

            Phase::Downloading(ctx, tracker) => self.poll(ctx, tracker).await,

            Phase::Cooldown => {
                if let Some(job) = self.queue.clear_slot().await {
                    info!(job = %job.name, status = %job.status, "torrent slot cleared");
                }
                (Phase::Idle, Duration::ZERO)
            }
        }
    }

    async fn add(&self, ctx: JobContext, session: BackendSession) -> (Phase, Duration) {
        self.set_status(JobStatus::Adding).await;
        ctx.notify(Notice::Submitting).await;

        let destination = self.backend.destination();
        let result = match ctx.job.payload() {
            JobPayload::Magnet(uri) => self.backend.submit_magnet(&session, uri, destination).await,
            JobPayload::File(content) => {
                self.backend
                    .submit_file(&session, content, destination)
                    .await
            }
        };

        if let Err(e) = result {
            warn!(job = %ctx.job.display_name(), error = %e, "adding torrent failed");
            return self.fail(&ctx, REASON_ADD).await;
        }

        self.set_status(JobStatus::Downloading).await;
        ctx.notify(Notice::Added).await;
        info!(job = %ctx.job.display_name(), "torrent added, watching progress");

        let tracker = Tracker::new(session, ctx.job.display_name(), ctx.job.info_hash());
        (Phase::Downloading(ctx, tracker), self.config.settle_delay)
    }

    async fn poll(&self, ctx: JobContext, mut tracker: Tracker) -> (Phase, Duration) {
        if let Some(limit) = self.config.max_job_duration {
            if ctx.claimed_at.elapsed() >= limit {
                warn!(job = %tracker.name, limit_secs = limit.as_secs(), "torrent job exceeded time limit");
                return self.fail(&ctx, REASON_TIMEOUT).await;
            }
        }

        let jobs = match self.backend.list_jobs(&tracker.session).await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(job = %tracker.name, error = %e, "error listing torrents, retrying");
                return (
                    Phase::Downloading(ctx, tracker),
                    self.config.query_retry_backoff,
                );
            }
        };

        let destination = self.backend.destination();
        let Some((matched, matched_by)) = correlate(
            &jobs,
            tracker.backend_id.as_deref(),
            &tracker.name,
            destination,
        ) else {
            trace!(job = %tracker.name, "torrent not listed yet");
            return (
                Phase::Downloading(ctx, tracker),
                self.config.fast_poll_interval,
            );
        };

        if matched_by != MatchedBy::BackendId {
            debug!(
                job = %tracker.name,
                matched = %matched.name,
                matched_by = ?matched_by,
                added_at = ?matched.added_at(),
                "correlated backend job"
            );
        }

        if !matched.name.is_empty() {
            tracker.name = matched.name.clone();
        }
        if !matched.hash.is_empty() {
            tracker.backend_id = Some(matched.hash.clone());
        }

        let state = matched.state.clone();
        let finished = matched.is_finished();
        let downloading = matched.is_downloading();
        let observed = matched.progress_percent();

        let name = tracker.name.clone();
        let backend_id = tracker.backend_id.clone();
        let progress = self
            .queue
            .update_active(|active| {
                active.name = name;
                active.backend_id = backend_id;
                active.status = JobStatus::Backend(state.clone());
                active.record_progress(observed)
            })
            .await
            .unwrap_or(observed);

        let now = Instant::now();
        if tracker.log_due(now) {
            debug!(job = %tracker.name, progress, state = %state, "torrent progress");
            tracker.last_log = Some(now);
        }

        if finished {
            self.queue
                .update_active(|active| {
                    active.status = JobStatus::Completed;
                    active.record_progress(100);
                })
                .await;
            info!(job = %tracker.name, "torrent completed");
            ctx.notify(Notice::Completed {
                name: tracker.name.clone(),
                save_path: destination.to_path_buf(),
            })
            .await;
            return (Phase::Cooldown, self.config.cooldown);
        }

        let active = downloading && progress > 0;
        if active
            && progress < 100
            && tracker.notice_due(now, self.config.progress_notify_interval)
        {
            ctx.notify(Notice::Progress {
                name: tracker.name.clone(),
                percent: progress,
                state,
            })
            .await;
            tracker.last_notice = Some(now);
        }

        let interval = if active {
            self.config.slow_poll_interval
        } else {
            self.config.fast_poll_interval
        };
        (Phase::Downloading(ctx, tracker), interval)
    }

    async fn fail(&self, ctx: &JobContext, reason: &str) -> (Phase, Duration) {
        self.set_status(JobStatus::Failed(reason.to_string())).await;
        ctx.notify(Notice::Failed {
            reason: reason.to_string(),
        })
        .await;
        (Phase::Cooldown, self.config.cooldown)
    }

    async fn set_status(&self, status: JobStatus) {
        self.queue.update_active(|active| active.status = status).await;
    }
}
