//! Job lifecycle phases as seen by the client
//!
//! The server speaks a five-word status vocabulary; the client adds `Idle`
//! for "no job loaded yet" (before the first fetch resolves, or when the
//! topic has never had a job). Every transition site matches exhaustively on
//! this enum so a new server status cannot slip through unhandled.

use crate::api::types::{Job, JobStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Idle,
    Queued,
    Running,
    Done,
    Failed,
    Cancelled,
}

impl JobPhase {
    /// Phases that keep the polling loop alive
    pub fn is_active(&self) -> bool {
        matches!(self, JobPhase::Queued | JobPhase::Running)
    }

    /// Phases the server will never move out of on its own
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Done | JobPhase::Failed | JobPhase::Cancelled)
    }

    /// Cancel is only meaningful for jobs the worker may still touch
    pub fn can_cancel(&self) -> bool {
        matches!(self, JobPhase::Queued | JobPhase::Running)
    }

    /// Retry is only meaningful for jobs that stopped short of done
    pub fn can_retry(&self) -> bool {
        matches!(self, JobPhase::Failed | JobPhase::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Idle => "idle",
            JobPhase::Queued => "queued",
            JobPhase::Running => "running",
            JobPhase::Done => "done",
            JobPhase::Failed => "failed",
            JobPhase::Cancelled => "cancelled",
        }
    }

    /// Phase of an optional job snapshot: no job means Idle
    pub fn of(job: Option<&Job>) -> Self {
        match job {
            None => JobPhase::Idle,
            Some(job) => JobPhase::from(job.status),
        }
    }
}

impl From<JobStatus> for JobPhase {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Queued => JobPhase::Queued,
            JobStatus::Running => JobPhase::Running,
            JobStatus::Done => JobPhase::Done,
            JobStatus::Failed => JobPhase::Failed,
            JobStatus::Cancelled => JobPhase::Cancelled,
        }
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
