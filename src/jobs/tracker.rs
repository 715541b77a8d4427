//! Job polling state machine
//!
//! Owns the locally held job snapshot for one topic and the single pending
//! poll timer. Adopting a server response is the only way the snapshot
//! changes: actions (start/cancel/retry) and the polling loop both feed
//! their results through `adopt`, which stores the record and decides
//! whether another poll is warranted.
//!
//! Timer discipline: at most one pending timer exists at any instant.
//! Scheduling always aborts the previous handle first, and each timer task
//! carries a sequence id so a stale task that lost the slot to a newer one
//! exits without polling. Spawned tasks hold only a `Weak` reference to the
//! tracker, so teardown cannot be outlived by a poll.
//!
//! Actions are not serialized against an in-flight poll; whichever response
//! is adopted last wins. The server is authoritative per request, so a stale
//! snapshot corrects itself within one poll interval.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::types::{Job, JobParams};
use crate::api::JobsClient;
use crate::errors::{JobActionError, JobActionResult};
use crate::logger::{self, LogTag};

use super::states::JobPhase;

/// Delay between status polls while a job is queued or running
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2500);

/// The artifact format pushed to Telegram by the send action
pub const SEND_FORMAT: &str = "apkg";

struct PendingPoll {
    id: u64,
    handle: JoinHandle<()>,
}

struct TrackerInner {
    topic_id: Uuid,
    jobs: JobsClient,
    poll_interval: Duration,
    current: Mutex<Option<Job>>,
    timer: Mutex<Option<PendingPoll>>,
    timer_seq: AtomicU64,
    /// Last soft polling failure, for the presentation layer to pick up
    poll_error: Mutex<Option<JobActionError>>,
}

pub struct JobTracker {
    inner: Arc<TrackerInner>,
}

impl JobTracker {
    pub fn new(jobs: JobsClient, topic_id: Uuid, poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                topic_id,
                jobs,
                poll_interval,
                current: Mutex::new(None),
                timer: Mutex::new(None),
                timer_seq: AtomicU64::new(0),
                poll_error: Mutex::new(None),
            }),
        }
    }

    pub fn topic_id(&self) -> Uuid {
        self.inner.topic_id
    }

    /// Current lifecycle phase derived from the held snapshot
    pub fn phase(&self) -> JobPhase {
        TrackerInner::current_phase(&self.inner)
    }

    /// Clone of the held job snapshot
    pub fn current_job(&self) -> Option<Job> {
        self.inner
            .current
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }

    /// Whether a follow-up poll is armed
    pub fn has_pending_poll(&self) -> bool {
        self.inner
            .timer
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Take the last soft polling failure, clearing it (dismissible banner)
    pub fn take_poll_error(&self) -> Option<JobActionError> {
        self.inner
            .poll_error
            .lock()
            .ok()
            .and_then(|mut guard| guard.take())
    }

    /// Fetch the latest job for the topic and adopt it (mount / re-entry)
    pub async fn sync(&self) -> JobActionResult<JobPhase> {
        match self.inner.jobs.latest(self.inner.topic_id).await {
            Ok(job) => Ok(TrackerInner::adopt(&self.inner, job)),
            Err(e) => Err(JobActionError::Fetch(e.to_string())),
        }
    }

    /// Start a generation job and adopt the returned record
    ///
    /// On failure the prior snapshot stays in place; nothing is retried
    /// automatically.
    pub async fn start(&self, params: JobParams) -> JobActionResult<Job> {
        let job = self
            .inner
            .jobs
            .start(self.inner.topic_id, &params)
            .await
            .map_err(|e| JobActionError::Start(e.to_string()))?;

        logger::info(
            LogTag::Jobs,
            &format!("Generation started: job {} ({})", job.id, job.status),
        );
        TrackerInner::adopt(&self.inner, Some(job.clone()));
        Ok(job)
    }

    /// Cancel the current job; permitted only while queued or running
    pub async fn cancel(&self) -> JobActionResult<Job> {
        let phase = self.phase();
        if !phase.can_cancel() {
            return Err(JobActionError::Cancel(format!(
                "not permitted while {}",
                phase
            )));
        }
        let job_id = self
            .current_job_id()
            .ok_or_else(|| JobActionError::Cancel("no job loaded".to_string()))?;

        let job = self
            .inner
            .jobs
            .cancel(self.inner.topic_id, job_id)
            .await
            .map_err(|e| JobActionError::Cancel(e.to_string()))?;

        logger::info(LogTag::Jobs, &format!("Job {} cancelled", job.id));
        TrackerInner::adopt(&self.inner, Some(job.clone()));
        Ok(job)
    }

    /// Retry a failed or cancelled job and adopt whatever the server returns
    /// (the record may carry a brand new id)
    pub async fn retry(&self) -> JobActionResult<Job> {
        let phase = self.phase();
        if !phase.can_retry() {
            return Err(JobActionError::Retry(format!(
                "not permitted while {}",
                phase
            )));
        }
        let job_id = self
            .current_job_id()
            .ok_or_else(|| JobActionError::Retry("no job loaded".to_string()))?;

        let job = self
            .inner
            .jobs
            .retry(self.inner.topic_id, job_id)
            .await
            .map_err(|e| JobActionError::Retry(e.to_string()))?;

        logger::info(
            LogTag::Jobs,
            &format!("Job retried: new job {} ({})", job.id, job.status),
        );
        TrackerInner::adopt(&self.inner, Some(job.clone()));
        Ok(job)
    }

    /// Push the finished deck to the originating chat; one-shot, no
    /// phase transition
    pub async fn send(&self) -> JobActionResult<()> {
        let job = self.gated_done_job(SEND_FORMAT, JobActionError::Send)?;

        self.inner
            .jobs
            .send(self.inner.topic_id, job.id)
            .await
            .map_err(|e| JobActionError::Send(e.to_string()))?;

        logger::info(LogTag::Jobs, &format!("Deck for job {} sent to chat", job.id));
        Ok(())
    }

    /// Download an artifact's bytes; one-shot, no phase transition
    pub async fn download(&self, format: &str) -> JobActionResult<Vec<u8>> {
        let job = self.gated_done_job(format, JobActionError::Download)?;

        self.inner
            .jobs
            .download(self.inner.topic_id, job.id, format)
            .await
            .map_err(|e| JobActionError::Download(e.to_string()))
    }

    /// Cancel any pending poll timer; nothing fires after this returns
    pub fn shutdown(&self) {
        TrackerInner::cancel_pending(&self.inner);
        logger::debug(LogTag::Poll, "Polling stopped");
    }

    fn current_job_id(&self) -> Option<Uuid> {
        self.inner
            .current
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|job| job.id))
    }

    /// Client-side gate for send/download: job must be done and the named
    /// artifact present. Violations fail locally without a network call.
    fn gated_done_job(
        &self,
        format: &str,
        wrap: fn(String) -> JobActionError,
    ) -> JobActionResult<Job> {
        let job = self
            .current_job()
            .ok_or_else(|| wrap("no job loaded".to_string()))?;
        let phase = JobPhase::from(job.status);
        if phase != JobPhase::Done {
            return Err(wrap(format!("not permitted while {}", phase)));
        }
        if !job.has_artifact(format) {
            return Err(wrap(format!("{} file not found", format)));
        }
        Ok(job)
    }
}

impl Drop for JobTracker {
    fn drop(&mut self) {
        TrackerInner::cancel_pending(&self.inner);
    }
}

impl TrackerInner {
    fn current_phase(inner: &Arc<TrackerInner>) -> JobPhase {
        inner
            .current
            .lock()
            .map(|guard| JobPhase::of(guard.as_ref()))
            .unwrap_or(JobPhase::Idle)
    }

    /// Store a server response as the new snapshot and rearm or quiesce
    /// the poll timer based on the resulting phase
    fn adopt(inner: &Arc<TrackerInner>, job: Option<Job>) -> JobPhase {
        let phase = JobPhase::of(job.as_ref());

        if let Ok(mut current) = inner.current.lock() {
            *current = job;
        }

        match phase {
            JobPhase::Queued | JobPhase::Running => Self::schedule_poll(inner),
            JobPhase::Idle | JobPhase::Done | JobPhase::Failed | JobPhase::Cancelled => {
                Self::cancel_pending(inner)
            }
        }

        phase
    }

    /// Arm the single-slot timer, aborting whatever was pending before
    fn schedule_poll(inner: &Arc<TrackerInner>) {
        let id = inner.timer_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let weak: Weak<TrackerInner> = Arc::downgrade(inner);
        let delay = inner.poll_interval;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let Some(inner) = weak.upgrade() else {
                return;
            };

            // Consume our slot; a newer timer owning it means we lost the
            // race and must not poll
            {
                let Ok(mut slot) = inner.timer.lock() else {
                    return;
                };
                match slot.as_ref() {
                    Some(pending) if pending.id == id => *slot = None,
                    _ => return,
                }
            }

            Self::poll_once(&inner).await;
        });

        if let Ok(mut slot) = inner.timer.lock() {
            if let Some(previous) = slot.take() {
                previous.handle.abort();
            }
            *slot = Some(PendingPoll { id, handle });
        }
    }

    fn cancel_pending(inner: &Arc<TrackerInner>) {
        if let Ok(mut slot) = inner.timer.lock() {
            if let Some(pending) = slot.take() {
                pending.handle.abort();
            }
        }
    }

    /// One fetch of the latest job. Failures are soft: the snapshot stays,
    /// the error is surfaced, and the loop keeps trying while the last
    /// observed phase is active.
    async fn poll_once(inner: &Arc<TrackerInner>) {
        logger::debug(
            LogTag::Poll,
            &format!("Polling latest job for topic {}", inner.topic_id),
        );

        match inner.jobs.latest(inner.topic_id).await {
            Ok(job) => {
                let phase = Self::adopt(inner, job);
                logger::debug(LogTag::Poll, &format!("Observed phase: {}", phase));
            }
            Err(e) => {
                logger::warning(LogTag::Poll, &format!("Status poll failed: {}", e));
                if let Ok(mut slot) = inner.poll_error.lock() {
                    *slot = Some(JobActionError::Fetch(e.to_string()));
                }
                if Self::current_phase(inner).is_active() {
                    Self::schedule_poll(inner);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::JobStatus;
    use crate::api::ApiClient;
    use crate::config::ApiConfig;
    use crate::session::AuthSession;
    use crate::testutil::{job_json, job_json_with, MockApi, MockResponse};

    const POLL_MS: u64 = 60;

    fn tracker_for(mock: &MockApi) -> JobTracker {
        let dir = tempfile::tempdir().unwrap();
        let session = Arc::new(AuthSession::new(
            "ANKIGEN_TEST_UNSET_ENV",
            false,
            dir.into_path().join("session.token"),
        ));
        let config = ApiConfig {
            base_url: mock.base_url(),
            timeout_seconds: 5,
        };
        let api = Arc::new(ApiClient::new(&config, session).unwrap());
        JobTracker::new(
            JobsClient::new(api),
            "a1a2a3a4-b1b2-4c12-8d12-0123456789ab".parse().unwrap(),
            Duration::from_millis(POLL_MS),
        )
    }

    async fn settle(intervals: u64) {
        tokio::time::sleep(Duration::from_millis(POLL_MS * intervals + POLL_MS / 2)).await;
    }

    #[tokio::test]
    async fn test_idle_when_no_job_exists() {
        let mock = MockApi::start(vec![MockResponse::json(200, "null")]);
        let tracker = tracker_for(&mock);

        let phase = tracker.sync().await.unwrap();
        assert_eq!(phase, JobPhase::Idle);
        assert!(!tracker.has_pending_poll());
        assert!(tracker.current_job().is_none());

        settle(3).await;
        assert_eq!(mock.hits(), 1, "idle must not poll");
    }

    #[tokio::test]
    async fn test_active_job_polls_until_terminal() {
        let mock = MockApi::start(vec![
            MockResponse::json(200, &job_json("queued", "queued", 0)),
            MockResponse::json(200, &job_json("running", "generating", 40)),
            MockResponse::json(200, &job_json("done", "done", 100)),
        ]);
        let tracker = tracker_for(&mock);

        let phase = tracker.sync().await.unwrap();
        assert_eq!(phase, JobPhase::Queued);
        assert!(tracker.has_pending_poll());

        settle(4).await;
        assert_eq!(tracker.phase(), JobPhase::Done);
        assert!(!tracker.has_pending_poll());
        assert_eq!(mock.hits(), 3);

        // Quiescent: no further polls once terminal
        settle(3).await;
        assert_eq!(mock.hits(), 3);
    }

    #[tokio::test]
    async fn test_resync_replaces_pending_timer() {
        let mock = MockApi::start(vec![
            MockResponse::json(200, &job_json("queued", "queued", 0)),
            MockResponse::json(200, &job_json("queued", "queued", 0)),
            MockResponse::json(200, &job_json("done", "done", 100)),
        ]);
        let tracker = tracker_for(&mock);

        tracker.sync().await.unwrap();
        tracker.sync().await.unwrap();
        assert_eq!(mock.hits(), 2);
        assert!(tracker.has_pending_poll());

        // Exactly one timer fired from the two syncs
        settle(2).await;
        assert_eq!(mock.hits(), 3);
        assert_eq!(tracker.phase(), JobPhase::Done);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_pending_poll() {
        let mock = MockApi::start(vec![MockResponse::json(
            200,
            &job_json("running", "extracting", 15),
        )]);
        let tracker = tracker_for(&mock);

        tracker.sync().await.unwrap();
        assert!(tracker.has_pending_poll());

        tracker.shutdown();
        assert!(!tracker.has_pending_poll());

        settle(3).await;
        assert_eq!(mock.hits(), 1, "no poll may fire after shutdown");
    }

    #[tokio::test]
    async fn test_drop_cancels_pending_poll() {
        let mock = MockApi::start(vec![MockResponse::json(
            200,
            &job_json("queued", "queued", 0),
        )]);
        let tracker = tracker_for(&mock);

        tracker.sync().await.unwrap();
        assert!(tracker.has_pending_poll());
        drop(tracker);

        settle(3).await;
        assert_eq!(mock.hits(), 1);
    }

    #[tokio::test]
    async fn test_cancel_gated_by_phase() {
        let mock = MockApi::start(vec![MockResponse::json(
            200,
            &job_json_with("done", "done", 100, None, &[("apkg", "/exports/deck.apkg")]),
        )]);
        let tracker = tracker_for(&mock);
        tracker.sync().await.unwrap();
        assert_eq!(mock.hits(), 1);

        let err = tracker.cancel().await.unwrap_err();
        assert!(matches!(err, JobActionError::Cancel(_)));
        assert!(err.detail().contains("not permitted"));
        // Rejected locally: no network call was issued
        assert_eq!(mock.hits(), 1);
        assert_eq!(tracker.phase(), JobPhase::Done);
    }

    #[tokio::test]
    async fn test_retry_gated_by_phase() {
        let mock = MockApi::start(vec![MockResponse::json(
            200,
            &job_json("running", "generating", 40),
        )]);
        let tracker = tracker_for(&mock);
        tracker.sync().await.unwrap();

        let err = tracker.retry().await.unwrap_err();
        assert!(matches!(err, JobActionError::Retry(_)));
        assert_eq!(mock.hits(), 1);

        tracker.shutdown();
    }

    #[tokio::test]
    async fn test_cancel_adopts_terminal_record_and_stops_polling() {
        let mock = MockApi::start(vec![
            MockResponse::json(200, &job_json("running", "generating", 40)),
            MockResponse::json(
                200,
                &job_json_with("cancelled", "done", 100, Some("Cancelled by user"), &[]),
            ),
        ]);
        let tracker = tracker_for(&mock);
        tracker.sync().await.unwrap();
        assert!(tracker.has_pending_poll());

        let job = tracker.cancel().await.unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(tracker.phase(), JobPhase::Cancelled);
        assert!(!tracker.has_pending_poll());

        settle(3).await;
        assert_eq!(mock.hits(), 2);
    }

    #[tokio::test]
    async fn test_retry_resumes_polling() {
        let mock = MockApi::start(vec![
            MockResponse::json(
                200,
                &job_json_with("failed", "generating", 65, Some("LLM unavailable"), &[]),
            ),
            MockResponse::json(200, &job_json("queued", "queued", 0)),
            MockResponse::json(200, &job_json("done", "done", 100)),
        ]);
        let tracker = tracker_for(&mock);
        tracker.sync().await.unwrap();
        assert_eq!(tracker.phase(), JobPhase::Failed);
        assert!(!tracker.has_pending_poll());

        tracker.retry().await.unwrap();
        assert_eq!(tracker.phase(), JobPhase::Queued);
        assert!(tracker.has_pending_poll());

        settle(3).await;
        assert_eq!(tracker.phase(), JobPhase::Done);
    }

    #[tokio::test]
    async fn test_start_failure_preserves_prior_state() {
        let mock = MockApi::start(vec![
            MockResponse::json(
                200,
                &job_json_with("failed", "generating", 65, Some("boom"), &[]),
            ),
            MockResponse::text(429, "Rate limit exceeded"),
        ]);
        let tracker = tracker_for(&mock);
        tracker.sync().await.unwrap();

        let err = tracker
            .start(JobParams::new("merged", 20, "medium"))
            .await
            .unwrap_err();
        assert!(matches!(err, JobActionError::Start(_)));
        assert!(err.detail().contains("Rate limit exceeded"));

        // Snapshot untouched, no polling resumed
        assert_eq!(tracker.phase(), JobPhase::Failed);
        assert!(!tracker.has_pending_poll());
    }

    #[tokio::test]
    async fn test_start_adopts_queued_job_and_polls() {
        let mock = MockApi::start(vec![
            MockResponse::json(200, "null"),
            MockResponse::json(200, &job_json("queued", "queued", 0)),
            MockResponse::json(200, &job_json("done", "done", 100)),
        ]);
        let tracker = tracker_for(&mock);
        tracker.sync().await.unwrap();
        assert_eq!(tracker.phase(), JobPhase::Idle);

        let job = tracker
            .start(JobParams::new("merged", 20, "medium"))
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert!(tracker.has_pending_poll());

        settle(3).await;
        assert_eq!(tracker.phase(), JobPhase::Done);
    }

    #[tokio::test]
    async fn test_send_requires_apkg_artifact() {
        let mock = MockApi::start(vec![MockResponse::json(
            200,
            &job_json_with("done", "done", 100, None, &[("json", "/exports/deck.json")]),
        )]);
        let tracker = tracker_for(&mock);
        tracker.sync().await.unwrap();
        assert_eq!(mock.hits(), 1);

        let err = tracker.send().await.unwrap_err();
        assert!(matches!(err, JobActionError::Send(_)));
        assert!(err.detail().contains("not found"));
        assert_eq!(mock.hits(), 1, "artifact gate must not touch the network");
    }

    #[tokio::test]
    async fn test_download_missing_format_fails_locally() {
        let mock = MockApi::start(vec![MockResponse::json(
            200,
            &job_json_with("done", "done", 100, None, &[("json", "/exports/deck.json")]),
        )]);
        let tracker = tracker_for(&mock);
        tracker.sync().await.unwrap();

        let err = tracker.download("apkg").await.unwrap_err();
        assert!(matches!(err, JobActionError::Download(_)));
        assert!(err.detail().contains("file not found"));
        assert_eq!(mock.hits(), 1);
    }

    #[tokio::test]
    async fn test_download_fetches_artifact_bytes() {
        let mock = MockApi::start(vec![
            MockResponse::json(
                200,
                &job_json_with("done", "done", 100, None, &[("apkg", "/exports/deck.apkg")]),
            ),
            MockResponse::text(200, "deck bytes"),
        ]);
        let tracker = tracker_for(&mock);
        tracker.sync().await.unwrap();

        let bytes = tracker.download("apkg").await.unwrap();
        assert_eq!(bytes, b"deck bytes");
        // One-shot action: phase untouched, no polling started
        assert_eq!(tracker.phase(), JobPhase::Done);
        assert!(!tracker.has_pending_poll());
    }

    #[tokio::test]
    async fn test_poll_failure_is_soft_and_polling_continues() {
        let mock = MockApi::start(vec![
            MockResponse::json(200, &job_json("running", "generating", 40)),
            MockResponse::text(500, "transient database error"),
            MockResponse::json(200, &job_json("done", "done", 100)),
        ]);
        let tracker = tracker_for(&mock);
        tracker.sync().await.unwrap();

        settle(4).await;
        assert_eq!(tracker.phase(), JobPhase::Done);
        assert_eq!(mock.hits(), 3);

        let error = tracker.take_poll_error().expect("poll error surfaced");
        assert!(matches!(error, JobActionError::Fetch(_)));
        assert!(error.detail().contains("transient database error"));
        // Taking the error clears it
        assert!(tracker.take_poll_error().is_none());
    }

    #[tokio::test]
    async fn test_action_interleaving_keeps_single_timer() {
        let mock = MockApi::start(vec![
            MockResponse::json(200, &job_json("queued", "queued", 0)),
            MockResponse::json(200, &job_json("queued", "queued", 0)),
            MockResponse::json(200, &job_json("running", "generating", 40)),
            MockResponse::json(200, &job_json("done", "done", 100)),
        ]);
        let tracker = tracker_for(&mock);

        // Sync arms a timer; an immediate start replaces the snapshot and
        // the timer without waiting for the pending poll
        tracker.sync().await.unwrap();
        tracker
            .start(JobParams::new("merged", 20, "medium"))
            .await
            .unwrap();
        assert!(tracker.has_pending_poll());

        settle(5).await;
        assert_eq!(tracker.phase(), JobPhase::Done);
        assert!(!tracker.has_pending_poll());
    }

    #[tokio::test]
    async fn test_same_job_from_start_and_latest_maps_to_same_phase() {
        let payload = job_json("running", "generating", 40);
        let mock = MockApi::start(vec![
            MockResponse::json(200, &payload),
            MockResponse::json(200, &payload),
        ]);
        let tracker = tracker_for(&mock);

        let started = tracker
            .start(JobParams::new("merged", 20, "medium"))
            .await
            .unwrap();
        let phase_after_start = tracker.phase();
        tracker.shutdown();

        tracker.sync().await.unwrap();
        let fetched = tracker.current_job().unwrap();
        tracker.shutdown();

        assert_eq!(started.id, fetched.id);
        assert_eq!(phase_after_start, tracker.phase());
        assert_eq!(started.progress, fetched.progress);
        assert_eq!(started.stage, fetched.stage);
    }
}
