use async_trait::async_trait;
use chrono::{DateTime, Utc};

use lognexus_core::ids::ExecutionId;
use lognexus_core::job::{ExecutionStatus, JobExecution};
use lognexus_ports::error::PortError;
use lognexus_ports::outbound::ExecutionStore;

use super::SqliteDb;

fn status_to_str(status: ExecutionStatus) -> &'static str {
    match status {
        ExecutionStatus::Pending => "Pending",
        ExecutionStatus::Running => "Running",
        ExecutionStatus::Completed => "Completed",
        ExecutionStatus::Failed => "Failed",
        ExecutionStatus::Cancelled => "Cancelled",
        ExecutionStatus::Timeout => "Timeout",
        ExecutionStatus::Warning => "Warning",
    }
}

fn str_to_status(s: &str) -> Result<ExecutionStatus, PortError> {
    match s {
        "Pending" => Ok(ExecutionStatus::Pending),
        "Running" => Ok(ExecutionStatus::Running),
        "Completed" => Ok(ExecutionStatus::Completed),
        "Failed" => Ok(ExecutionStatus::Failed),
        "Cancelled" => Ok(ExecutionStatus::Cancelled),
        "Timeout" => Ok(ExecutionStatus::Timeout),
        "Warning" => Ok(ExecutionStatus::Warning),
        other => Err(PortError::Persistence(format!(
            "unknown execution status: {other}"
        ))),
    }
}

type ExecutionRow = (
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    Option<i64>,
    Option<String>,
);

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, PortError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| PortError::Persistence(e.to_string()))
}

fn row_to_execution(row: ExecutionRow) -> Result<JobExecution, PortError> {
    let (id, job_id, server_name, status, started_at, completed_at, duration_ms, error_message) =
        row;
    Ok(JobExecution {
        id: ExecutionId::parse(&id).map_err(|e| PortError::Persistence(e.to_string()))?,
        job_id,
        server_name: server_name.unwrap_or_default(),
        status: str_to_status(&status)?,
        started_at: started_at.as_deref().map(parse_ts).transpose()?,
        completed_at: completed_at.as_deref().map(parse_ts).transpose()?,
        duration_ms,
        error_message,
    })
}

impl SqliteDb {
    /// Upsert an execution row. The ingest side of the store; the
    /// `ExecutionStore` port only reads and times out.
    pub async fn record_execution(&self, execution: &JobExecution) -> Result<(), PortError> {
        let id = execution.id.to_string();
        let status = status_to_str(execution.status);
        let started_at = execution.started_at.map(|t| t.to_rfc3339());
        let completed_at = execution.completed_at.map(|t| t.to_rfc3339());

        sqlx::query(
            "INSERT INTO job_executions
                (id, job_id, server_name, status, started_at, completed_at, duration_ms, error_message)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                completed_at = excluded.completed_at,
                duration_ms = excluded.duration_ms,
                error_message = excluded.error_message",
        )
        .bind(&id)
        .bind(&execution.job_id)
        .bind(&execution.server_name)
        .bind(status)
        .bind(&started_at)
        .bind(&completed_at)
        .bind(execution.duration_ms)
        .bind(&execution.error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl ExecutionStore for SqliteDb {
    async fn last_executions(&self, job_id: &str, n: u32) -> Result<Vec<JobExecution>, PortError> {
        let rows: Vec<ExecutionRow> = sqlx::query_as(
            "SELECT id, job_id, server_name, status, started_at, completed_at, duration_ms, error_message
             FROM job_executions
             WHERE job_id = ?
             ORDER BY started_at DESC
             LIMIT ?",
        )
            .bind(job_id)
            .bind(i64::from(n))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        rows.into_iter().map(row_to_execution).collect()
    }

    async fn running_with_deadline(&self) -> Result<Vec<(JobExecution, i64)>, PortError> {
        let rows: Vec<(
            String,
            String,
            Option<String>,
            String,
            Option<String>,
            Option<String>,
            Option<i64>,
            Option<String>,
            i64,
        )> = sqlx::query_as(
            "SELECT e.id, e.job_id, e.server_name, e.status, e.started_at, e.completed_at,
                    e.duration_ms, e.error_message, j.max_duration_ms
             FROM job_executions e
             JOIN jobs j ON j.job_id = e.job_id
             WHERE e.status = 'Running' AND j.max_duration_ms IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        let mut result = Vec::with_capacity(rows.len());
        for (id, job_id, server, status, started, completed, duration, error, max_ms) in rows {
            let execution = row_to_execution((
                id, job_id, server, status, started, completed, duration, error,
            ))?;
            result.push((execution, max_ms));
        }
        Ok(result)
    }

    async fn complete_as_timeout(
        &self,
        id: &ExecutionId,
        at: DateTime<Utc>,
        message: &str,
    ) -> Result<bool, PortError> {
        let id = id.to_string();
        let started: Option<(Option<String>,)> = sqlx::query_as(
            "SELECT started_at FROM job_executions WHERE id = ? AND status = 'Running'",
        )
        .bind(&id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        let Some((started_at,)) = started else {
            return Ok(false);
        };
        let duration_ms = match started_at.as_deref().map(parse_ts).transpose()? {
            Some(started) => Some((at - started).num_milliseconds()),
            None => None,
        };

        // Guarded on the source state so a concurrent completion or a
        // repeated sweep cannot overwrite a finished execution.
        let result = sqlx::query(
            "UPDATE job_executions
             SET status = 'Timeout', completed_at = ?, duration_ms = ?, error_message = ?
             WHERE id = ? AND status = 'Running'",
        )
        .bind(at.to_rfc3339())
        .bind(duration_ms)
        .bind(message)
        .bind(&id)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }
}
