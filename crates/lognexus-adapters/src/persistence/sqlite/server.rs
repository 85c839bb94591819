use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use lognexus_core::server::ServerStatus;
use lognexus_ports::error::PortError;
use lognexus_ports::outbound::ServerStatusProvider;

use super::SqliteDb;

/// A server with no heartbeat for this long is considered offline.
const OFFLINE_AFTER_SECS: i64 = 300;

fn status_from(
    last_heartbeat_at: Option<DateTime<Utc>>,
    in_maintenance: bool,
    now: DateTime<Utc>,
) -> ServerStatus {
    if in_maintenance {
        return ServerStatus::Maintenance;
    }
    match last_heartbeat_at {
        None => ServerStatus::Unknown,
        Some(beat) if now - beat > Duration::seconds(OFFLINE_AFTER_SECS) => ServerStatus::Offline,
        Some(_) => ServerStatus::Online,
    }
}

impl SqliteDb {
    pub async fn record_heartbeat(
        &self,
        server_name: &str,
        at: DateTime<Utc>,
    ) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO servers (server_name, last_heartbeat_at)
             VALUES (?, ?)
             ON CONFLICT(server_name) DO UPDATE SET
                last_heartbeat_at = excluded.last_heartbeat_at",
        )
        .bind(server_name)
        .bind(at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(())
    }

    pub async fn set_maintenance(
        &self,
        server_name: &str,
        in_maintenance: bool,
    ) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO servers (server_name, in_maintenance)
             VALUES (?, ?)
             ON CONFLICT(server_name) DO UPDATE SET
                in_maintenance = excluded.in_maintenance",
        )
        .bind(server_name)
        .bind(in_maintenance as i32)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ServerStatusProvider for SqliteDb {
    async fn computed_status(&self, server_name: &str) -> Result<ServerStatus, PortError> {
        let row: Option<(Option<String>, i32)> = sqlx::query_as(
            "SELECT last_heartbeat_at, in_maintenance FROM servers WHERE server_name = ?",
        )
        .bind(server_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        let Some((last_heartbeat_at, in_maintenance)) = row else {
            return Ok(ServerStatus::Unknown);
        };
        let beat = match last_heartbeat_at {
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| PortError::Persistence(e.to_string()))?
                    .with_timezone(&Utc),
            ),
            None => None,
        };
        Ok(status_from(beat, in_maintenance != 0, Utc::now()))
    }
}
