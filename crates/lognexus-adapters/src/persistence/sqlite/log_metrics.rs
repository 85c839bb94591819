use async_trait::async_trait;
use chrono::{DateTime, Utc};

use lognexus_core::log::LogLevel;
use lognexus_ports::error::PortError;
use lognexus_ports::outbound::LogMetrics;

use super::SqliteDb;

/// Levels are stored as their ordinal so "at or above" is a single
/// integer comparison.
fn level_rank(level: LogLevel) -> i64 {
    match level {
        LogLevel::Trace => 0,
        LogLevel::Debug => 1,
        LogLevel::Information => 2,
        LogLevel::Warning => 3,
        LogLevel::Error => 4,
        LogLevel::Critical => 5,
    }
}

impl SqliteDb {
    /// Append one log entry. The ingest side of the metrics store.
    pub async fn record_log_entry(
        &self,
        timestamp: DateTime<Utc>,
        level: LogLevel,
        message: &str,
        job_id: Option<&str>,
        server_name: Option<&str>,
    ) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO log_entries (timestamp, level, message, job_id, server_name)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(timestamp.to_rfc3339())
        .bind(level_rank(level))
        .bind(message)
        .bind(job_id)
        .bind(server_name)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl LogMetrics for SqliteDb {
    async fn count_at_or_above(
        &self,
        since: DateTime<Utc>,
        min_level: LogLevel,
        job_id: Option<&str>,
        server_name: Option<&str>,
    ) -> Result<u64, PortError> {
        let mut sql =
            String::from("SELECT COUNT(*) FROM log_entries WHERE timestamp >= ? AND level >= ?");
        if job_id.is_some() {
            sql.push_str(" AND job_id = ?");
        }
        if server_name.is_some() {
            sql.push_str(" AND server_name = ?");
        }

        let mut query = sqlx::query_as::<_, (i64,)>(&sql)
            .bind(since.to_rfc3339())
            .bind(level_rank(min_level));
        if let Some(job_id) = job_id {
            query = query.bind(job_id);
        }
        if let Some(server_name) = server_name {
            query = query.bind(server_name);
        }

        let (count,) = query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(count as u64)
    }

    async fn count_matching(
        &self,
        since: DateTime<Utc>,
        pattern: &str,
        job_id: Option<&str>,
        server_name: Option<&str>,
    ) -> Result<u64, PortError> {
        let mut sql =
            String::from("SELECT COUNT(*) FROM log_entries WHERE timestamp >= ? AND message LIKE ?");
        if job_id.is_some() {
            sql.push_str(" AND job_id = ?");
        }
        if server_name.is_some() {
            sql.push_str(" AND server_name = ?");
        }

        let mut query = sqlx::query_as::<_, (i64,)>(&sql)
            .bind(since.to_rfc3339())
            .bind(format!("%{pattern}%"));
        if let Some(job_id) = job_id {
            query = query.bind(job_id);
        }
        if let Some(server_name) = server_name {
            query = query.bind(server_name);
        }

        let (count,) = query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(count as u64)
    }

    async fn count_for_query(&self, query: &str, since: DateTime<Utc>) -> Result<u64, PortError> {
        // Custom queries are LIKE expressions over the message column,
        // wildcards supplied by the definition author.
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM log_entries WHERE timestamp >= ? AND message LIKE ?",
        )
        .bind(since.to_rfc3339())
        .bind(query)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(count as u64)
    }
}
