use async_trait::async_trait;
use chrono::{DateTime, Utc};

use lognexus_core::alert::{AlertInstance, InstanceStatus, Severity};
use lognexus_core::ids::InstanceId;
use lognexus_ports::error::PortError;
use lognexus_ports::outbound::AlertInstanceRepository;
use lognexus_ports::types::{AlertSummary, InstanceFilter};

use super::SqliteDb;

fn str_to_status(s: &str) -> Result<InstanceStatus, PortError> {
    match s {
        "New" => Ok(InstanceStatus::New),
        "Acknowledged" => Ok(InstanceStatus::Acknowledged),
        "Resolved" => Ok(InstanceStatus::Resolved),
        "Suppressed" => Ok(InstanceStatus::Suppressed),
        other => Err(PortError::Persistence(format!("unknown status: {other}"))),
    }
}

fn str_to_severity(s: &str) -> Result<Severity, PortError> {
    match s {
        "Low" => Ok(Severity::Low),
        "Medium" => Ok(Severity::Medium),
        "High" => Ok(Severity::High),
        "Critical" => Ok(Severity::Critical),
        other => Err(PortError::Persistence(format!("unknown severity: {other}"))),
    }
}

impl SqliteDb {
    async fn upsert_instance(&self, instance: &AlertInstance) -> Result<(), PortError> {
        let id = instance.id().to_string();
        let definition_id = instance.definition_id().to_string();
        let status = instance.status().as_str();
        let severity = instance.severity().as_str();
        let triggered_at = instance.triggered_at().to_rfc3339();
        let data =
            serde_json::to_string(instance).map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "INSERT INTO alert_instances
                (id, definition_id, status, severity, job_id, server_name, triggered_at, data)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                data = excluded.data",
        )
        .bind(&id)
        .bind(&definition_id)
        .bind(status)
        .bind(severity)
        .bind(instance.job_id())
        .bind(instance.server_name())
        .bind(&triggered_at)
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl AlertInstanceRepository for SqliteDb {
    async fn create(&self, instance: &AlertInstance) -> Result<(), PortError> {
        self.upsert_instance(instance).await
    }

    async fn save(&self, instance: &AlertInstance) -> Result<(), PortError> {
        self.upsert_instance(instance).await
    }

    async fn find_by_id(&self, id: &InstanceId) -> Result<Option<AlertInstance>, PortError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT data FROM alert_instances WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        match row {
            Some((data,)) => {
                let instance: AlertInstance = serde_json::from_str(&data)
                    .map_err(|e| PortError::Persistence(e.to_string()))?;
                Ok(Some(instance))
            }
            None => Ok(None),
        }
    }

    async fn find_by_filter(
        &self,
        filter: &InstanceFilter,
    ) -> Result<Vec<AlertInstance>, PortError> {
        let mut sql = String::from("SELECT data FROM alert_instances WHERE 1=1");
        let mut binds: Vec<String> = Vec::new();

        if let Some(status) = &filter.status {
            sql.push_str(" AND status = ?");
            binds.push(status.as_str().to_string());
        }
        if let Some(severity) = &filter.severity {
            sql.push_str(" AND severity = ?");
            binds.push(severity.as_str().to_string());
        }
        if let Some(job_id) = &filter.job_id {
            sql.push_str(" AND job_id = ?");
            binds.push(job_id.clone());
        }
        if let Some(server_name) = &filter.server_name {
            sql.push_str(" AND server_name = ?");
            binds.push(server_name.clone());
        }

        sql.push_str(" ORDER BY triggered_at DESC");

        let per_page = if filter.per_page == 0 {
            50
        } else {
            filter.per_page
        };
        let offset = filter.page.saturating_sub(1) * per_page;
        sql.push_str(&format!(" LIMIT {per_page} OFFSET {offset}"));

        let mut query = sqlx::query_as::<_, (String,)>(&sql);
        for b in &binds {
            query = query.bind(b);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        let mut instances = Vec::with_capacity(rows.len());
        for (data,) in rows {
            let instance: AlertInstance =
                serde_json::from_str(&data).map_err(|e| PortError::Persistence(e.to_string()))?;
            instances.push(instance);
        }
        Ok(instances)
    }

    async fn count_by_status(&self) -> Result<Vec<(InstanceStatus, u64)>, PortError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM alert_instances GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| PortError::Persistence(e.to_string()))?;

        let mut counts = Vec::with_capacity(rows.len());
        for (status, count) in rows {
            counts.push((str_to_status(&status)?, count as u64));
        }
        Ok(counts)
    }

    async fn count_by_severity(&self) -> Result<Vec<(Severity, u64)>, PortError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT severity, COUNT(*) FROM alert_instances GROUP BY severity")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| PortError::Persistence(e.to_string()))?;

        let mut counts = Vec::with_capacity(rows.len());
        for (severity, count) in rows {
            counts.push((str_to_severity(&severity)?, count as u64));
        }
        Ok(counts)
    }

    async fn summary(&self) -> Result<AlertSummary, PortError> {
        let (total, new, critical, high): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*),
                    COALESCE(SUM(status = 'New'), 0),
                    COALESCE(SUM(severity = 'Critical'), 0),
                    COALESCE(SUM(severity = 'High'), 0)
             FROM alert_instances",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(AlertSummary {
            total: total as u64,
            new: new as u64,
            critical: critical as u64,
            high: high as u64,
        })
    }

    async fn purge_terminal_before(&self, cutoff: DateTime<Utc>) -> Result<u64, PortError> {
        let cutoff = cutoff.to_rfc3339();
        let result = sqlx::query(
            "DELETE FROM alert_instances
             WHERE status IN ('Resolved', 'Suppressed') AND triggered_at < ?",
        )
        .bind(&cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
