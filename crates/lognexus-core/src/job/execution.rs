use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ExecutionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Timeout,
    Warning,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

/// One run of a scheduled job, as reported by the executing agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobExecution {
    pub id: ExecutionId,
    pub job_id: String,
    pub server_name: String,
    pub status: ExecutionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
}

impl JobExecution {
    /// Still marked Running past the job's configured maximum duration.
    ///
    /// A deadline check, not a liveness probe: an execution whose
    /// completion callback was lost stays "running" until the deadline.
    pub fn is_overdue(&self, max_duration_ms: i64, now: DateTime<Utc>) -> bool {
        if self.status != ExecutionStatus::Running {
            return false;
        }
        match self.started_at {
            Some(started) => now - started > Duration::milliseconds(max_duration_ms),
            None => false,
        }
    }

    /// Transition Running → Timeout, stamping completion and duration.
    pub fn complete_as_timeout(&mut self, now: DateTime<Utc>, message: String) {
        self.status = ExecutionStatus::Timeout;
        self.completed_at = Some(now);
        if let Some(started) = self.started_at {
            self.duration_ms = Some((now - started).num_milliseconds());
        }
        self.error_message = Some(message);
    }
}
