//! Asynchronous agent runs: status model and the poll-until-terminal loop.

use crate::error::FoundryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Default time between two status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default budget for a run to reach a terminal state.
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(60);

/// Lifecycle state of a remote run.
///
/// The remote service uses a few more names than we distinguish; they are
/// folded into `Pending` and `Running` on deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[serde(alias = "queued")]
    Pending,
    #[serde(alias = "in_progress", alias = "requires_action", alias = "cancelling")]
    Running,
    Completed,
    Failed,
    Cancelled,
    Expired,
    /// A status this crate does not know about. Treated as still in progress.
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Terminal states are never left again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled | RunStatus::Expired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Expired => "expired",
            RunStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error details reported by the service for a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// One observation of a run's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

/// Identifies a submitted run and remembers the last status seen for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    pub thread_id: String,
    pub run_id: String,
    pub status: RunStatus,
}

impl RunHandle {
    pub fn new(thread_id: impl Into<String>, snapshot: &RunSnapshot) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: snapshot.id.clone(),
            status: snapshot.status,
        }
    }
}

/// Result of driving a run to a terminal state.
///
/// A run that ends `failed`, `cancelled` or `expired` is an expected outcome
/// of the remote service, not a transport error, so it is reported here
/// rather than through [`FoundryError`].
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome<T> {
    Completed(T),
    Unsuccessful {
        status: RunStatus,
        last_error: Option<RunError>,
    },
}

impl<T> RunOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }

    /// Returns the completed value, discarding unsuccessful outcomes.
    pub fn completed(self) -> Option<T> {
        match self {
            RunOutcome::Completed(value) => Some(value),
            RunOutcome::Unsuccessful { .. } => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> RunOutcome<U> {
        match self {
            RunOutcome::Completed(value) => RunOutcome::Completed(f(value)),
            RunOutcome::Unsuccessful { status, last_error } => {
                RunOutcome::Unsuccessful { status, last_error }
            }
        }
    }
}

/// Polls a run at a fixed cadence until it reaches a terminal state.
///
/// # Examples
///
/// ```rust,ignore
/// let poller = RunPoller::new(Duration::from_secs(60));
/// let snapshot = poller
///     .wait(&mut handle, || service.get_run(&thread_id, &run_id))
///     .await?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPoller {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for RunPoller {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_RUN_TIMEOUT,
        }
    }
}

impl RunPoller {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Fetches the run status until it is terminal or the timeout elapses.
    ///
    /// `fetch` is called once per poll; its errors abort the wait unchanged.
    /// `handle.status` is updated after every successful fetch. Returns the
    /// terminal snapshot, or [`FoundryError::Timeout`] once the deadline
    /// `timeout` after the first poll has passed.
    ///
    /// The whole wait, slow fetches included, never exceeds `timeout` plus
    /// one `interval`: each fetch is cut off at that bound and the last
    /// sleep is shortened to end at the deadline.
    pub async fn wait<F, Fut>(
        &self,
        handle: &mut RunHandle,
        mut fetch: F,
    ) -> Result<RunSnapshot, FoundryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<RunSnapshot, FoundryError>>,
    {
        let start = Instant::now();
        let deadline = start + self.timeout;
        let mut polls: u32 = 0;

        loop {
            polls += 1;
            let budget = deadline.saturating_duration_since(Instant::now()) + self.interval;
            let snapshot = match tokio::time::timeout(budget, fetch()).await {
                Ok(result) => result?,
                Err(_) => return Err(self.timed_out(handle, polls)),
            };
            handle.status = snapshot.status;

            if snapshot.status.is_terminal() {
                info!(
                    run_id = %handle.run_id,
                    status = %snapshot.status,
                    polls,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Run reached terminal state"
                );
                return Ok(snapshot);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timed_out(handle, polls));
            }

            debug!(run_id = %handle.run_id, status = %snapshot.status, polls, "Run status");
            tokio::time::sleep(self.interval.min(remaining)).await;
        }
    }

    fn timed_out(&self, handle: &RunHandle, polls: u32) -> FoundryError {
        error!(
            run_id = %handle.run_id,
            status = %handle.status,
            polls,
            timeout_secs = self.timeout.as_secs(),
            "Run timed out"
        );
        FoundryError::Timeout {
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn snapshot(status: RunStatus) -> RunSnapshot {
        RunSnapshot {
            id: "run_1".to_string(),
            status,
            last_error: None,
        }
    }

    fn handle() -> RunHandle {
        RunHandle::new("thread_1", &snapshot(RunStatus::Pending))
    }

    #[test]
    fn test_status_deserializes_remote_names() {
        let cases = [
            ("\"queued\"", RunStatus::Pending),
            ("\"in_progress\"", RunStatus::Running),
            ("\"requires_action\"", RunStatus::Running),
            ("\"cancelling\"", RunStatus::Running),
            ("\"completed\"", RunStatus::Completed),
            ("\"failed\"", RunStatus::Failed),
            ("\"cancelled\"", RunStatus::Cancelled),
            ("\"expired\"", RunStatus::Expired),
            ("\"something_new\"", RunStatus::Unknown),
        ];
        for (raw, expected) in cases {
            let status: RunStatus = serde_json::from_str(raw).unwrap();
            assert_eq!(status, expected, "{raw}");
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
        assert!(RunStatus::Expired.is_terminal());
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(!RunStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_snapshot_with_last_error() {
        let json = r#"{
            "id": "run_abc",
            "status": "failed",
            "last_error": {"code": "rate_limit_exceeded", "message": "Quota hit"}
        }"#;
        let snap: RunSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.status, RunStatus::Failed);
        let err = snap.last_error.unwrap();
        assert_eq!(err.to_string(), "rate_limit_exceeded: Quota hit");
    }

    #[test]
    fn test_outcome_map_and_completed() {
        let done: RunOutcome<u32> = RunOutcome::Completed(2);
        assert_eq!(done.map(|v| v * 10).completed(), Some(20));

        let failed: RunOutcome<u32> = RunOutcome::Unsuccessful {
            status: RunStatus::Failed,
            last_error: None,
        };
        assert!(!failed.is_completed());
        assert_eq!(failed.completed(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_immediately_when_terminal() {
        let poller = RunPoller::new(Duration::from_secs(10));
        let mut handle = handle();
        let start = Instant::now();

        let snap = poller
            .wait(&mut handle, || async { Ok(snapshot(RunStatus::Completed)) })
            .await
            .unwrap();

        assert_eq!(snap.status, RunStatus::Completed);
        assert_eq!(handle.status, RunStatus::Completed);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_polls_until_terminal() {
        let poller = RunPoller::new(Duration::from_secs(10));
        let mut handle = handle();
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();

        let snap = poller
            .wait(&mut handle, move || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    Ok(snapshot(if n < 3 {
                        RunStatus::Running
                    } else {
                        RunStatus::Failed
                    }))
                }
            })
            .await
            .unwrap();

        assert_eq!(snap.status, RunStatus::Failed);
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_within_one_interval() {
        let poller = RunPoller::new(Duration::from_secs(5)).with_interval(Duration::from_secs(1));
        let mut handle = handle();
        let start = Instant::now();

        let result = poller
            .wait(&mut handle, || async { Ok(snapshot(RunStatus::Running)) })
            .await;

        let elapsed = start.elapsed();
        assert!(matches!(result, Err(FoundryError::Timeout { .. })));
        assert_eq!(handle.status, RunStatus::Running);
        assert!(elapsed >= poller.timeout);
        assert!(elapsed <= poller.timeout + poller.interval);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetches_stay_within_bound() {
        let poller = RunPoller::new(Duration::from_secs(5)).with_interval(Duration::from_secs(1));
        let mut handle = handle();
        let start = Instant::now();

        let result = poller
            .wait(&mut handle, || async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(snapshot(RunStatus::Running))
            })
            .await;

        assert!(matches!(result, Err(FoundryError::Timeout { .. })));
        assert!(start.elapsed() <= poller.timeout + poller.interval);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_fetch_is_cut_off_at_bound() {
        let poller = RunPoller::new(Duration::from_secs(5)).with_interval(Duration::from_secs(1));
        let mut handle = handle();
        let start = Instant::now();

        let result = poller
            .wait(&mut handle, || async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(snapshot(RunStatus::Completed))
            })
            .await;

        assert!(matches!(result, Err(FoundryError::Timeout { .. })));
        let elapsed = start.elapsed();
        assert!(elapsed > poller.timeout);
        assert!(elapsed <= poller.timeout + poller.interval);
        assert_eq!(handle.status, RunStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_propagates_fetch_error() {
        let poller = RunPoller::default();
        let mut handle = handle();

        let result = poller
            .wait(&mut handle, || async {
                Err(FoundryError::from_status(404, "run not found"))
            })
            .await;

        assert!(matches!(
            result,
            Err(FoundryError::Fatal {
                status_code: Some(404),
                ..
            })
        ));
    }
}
