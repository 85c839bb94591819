use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use lognexus_core::alert::AlertDefinition;
use lognexus_core::ids::DefinitionId;
use lognexus_ports::error::PortError;
use lognexus_ports::outbound::AlertDefinitionRepository;

use super::SqliteDb;

/// Rebuild a definition from its JSON document, overlaying the throttle
/// columns. `mark_triggered` updates the columns without rewriting the
/// document, so the columns are authoritative.
fn hydrate(
    data: &str,
    last_triggered_at: Option<String>,
    trigger_count: i64,
) -> Result<AlertDefinition, PortError> {
    let mut definition: AlertDefinition =
        serde_json::from_str(data).map_err(|e| PortError::Persistence(e.to_string()))?;
    let last = match last_triggered_at {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(&raw)
                .map_err(|e| PortError::Persistence(e.to_string()))?
                .with_timezone(&Utc),
        ),
        None => None,
    };
    definition.sync_trigger_state(last, trigger_count as u64);
    Ok(definition)
}

#[async_trait]
impl AlertDefinitionRepository for SqliteDb {
    async fn save(&self, definition: &AlertDefinition) -> Result<(), PortError> {
        let id = definition.id().to_string();
        let is_active = definition.is_active() as i32;
        let last_triggered_at = definition.last_triggered_at().map(|t| t.to_rfc3339());
        let trigger_count = definition.trigger_count() as i64;
        let data =
            serde_json::to_string(definition).map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "INSERT INTO alert_definitions (id, is_active, last_triggered_at, trigger_count, data)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                is_active = excluded.is_active,
                data = excluded.data",
        )
        .bind(&id)
        .bind(is_active)
        .bind(&last_triggered_at)
        .bind(trigger_count)
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &DefinitionId) -> Result<Option<AlertDefinition>, PortError> {
        let row: Option<(String, Option<String>, i64)> = sqlx::query_as(
            "SELECT data, last_triggered_at, trigger_count FROM alert_definitions WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        match row {
            Some((data, last, count)) => Ok(Some(hydrate(&data, last, count)?)),
            None => Ok(None),
        }
    }

    async fn list_active(&self) -> Result<Vec<AlertDefinition>, PortError> {
        let rows: Vec<(String, Option<String>, i64)> = sqlx::query_as(
            "SELECT data, last_triggered_at, trigger_count
             FROM alert_definitions
             WHERE is_active = 1",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        let mut definitions = Vec::with_capacity(rows.len());
        for (data, last, count) in rows {
            definitions.push(hydrate(&data, last, count)?);
        }
        Ok(definitions)
    }

    async fn mark_triggered(
        &self,
        id: &DefinitionId,
        at: DateTime<Utc>,
        min_gap_minutes: u32,
    ) -> Result<bool, PortError> {
        // `last <= at - gap` is the complement of the throttle predicate.
        // RFC 3339 UTC strings compare lexicographically, so the guard runs
        // inside a single UPDATE and concurrent sweeps cannot both pass.
        let cutoff = (at - Duration::minutes(i64::from(min_gap_minutes))).to_rfc3339();
        let stamped = at.to_rfc3339();

        let result = sqlx::query(
            "UPDATE alert_definitions
             SET last_triggered_at = ?, trigger_count = trigger_count + 1
             WHERE id = ? AND is_active = 1
               AND (last_triggered_at IS NULL OR last_triggered_at <= ?)",
        )
        .bind(&stamped)
        .bind(id.to_string())
        .bind(&cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }
}
