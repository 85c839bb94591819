use async_trait::async_trait;

use lognexus_core::job::Job;
use lognexus_ports::error::PortError;
use lognexus_ports::outbound::JobRepository;

use super::SqliteDb;

impl SqliteDb {
    /// Upsert the job aggregate maintained by the ingest pipeline.
    pub async fn upsert_job(&self, job: &Job) -> Result<(), PortError> {
        let data = serde_json::to_string(job).map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "INSERT INTO jobs (job_id, is_active, max_duration_ms, data)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(job_id) DO UPDATE SET
                is_active = excluded.is_active,
                max_duration_ms = excluded.max_duration_ms,
                data = excluded.data",
        )
        .bind(&job.job_id)
        .bind(job.is_active as i32)
        .bind(job.max_duration_ms)
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl JobRepository for SqliteDb {
    async fn find_by_id(&self, job_id: &str) -> Result<Option<Job>, PortError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT data FROM jobs WHERE job_id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        match row {
            Some((data,)) => {
                let job: Job = serde_json::from_str(&data)
                    .map_err(|e| PortError::Persistence(e.to_string()))?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    async fn list_active(&self) -> Result<Vec<Job>, PortError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT data FROM jobs WHERE is_active = 1")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        let mut jobs = Vec::with_capacity(rows.len());
        for (data,) in rows {
            let job: Job =
                serde_json::from_str(&data).map_err(|e| PortError::Persistence(e.to_string()))?;
            jobs.push(job);
        }
        Ok(jobs)
    }
}
