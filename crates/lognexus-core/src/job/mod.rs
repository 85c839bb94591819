pub mod execution;
pub mod health;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use execution::{ExecutionStatus, JobExecution};
pub use health::health_score;

/// Scheduled-job aggregate as the engine reads it from the data store.
///
/// The aggregate fields (`last_execution_*`, `success_rate`,
/// `failure_count`) are maintained by the ingest pipeline; the engine only
/// consumes them for health scoring and rule evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub display_name: String,
    pub server_name: String,
    pub schedule: Option<String>,
    pub max_duration_ms: Option<i64>,
    pub is_active: bool,
    pub last_execution_at: Option<DateTime<Utc>>,
    pub last_execution_status: Option<ExecutionStatus>,
    /// Lifetime success percentage in `[0, 100]`, unknown until the job
    /// has completed at least once.
    pub success_rate: Option<f64>,
    pub failure_count: u64,
}
