use async_trait::async_trait;
use chrono::{DateTime, Utc};

use lognexus_core::channel::Channel;
use lognexus_core::ids::InstanceId;
use lognexus_ports::error::PortError;
use lognexus_ports::outbound::NotificationQueue;
use lognexus_ports::types::{PendingNotification, QueueStatus};

use super::SqliteDb;

fn channel_to_str(ch: &Channel) -> &'static str {
    match ch {
        Channel::Email => "email",
        Channel::Webhook => "webhook",
        Channel::Slack => "slack",
    }
}

fn str_to_channel(s: &str) -> Result<Channel, PortError> {
    match s {
        "email" => Ok(Channel::Email),
        "webhook" => Ok(Channel::Webhook),
        "slack" => Ok(Channel::Slack),
        other => Err(PortError::Persistence(format!("unknown channel: {other}"))),
    }
}

fn status_to_str(s: &QueueStatus) -> &'static str {
    match s {
        QueueStatus::Pending => "pending",
        QueueStatus::Sent => "sent",
        QueueStatus::Failed => "failed",
        QueueStatus::Dead => "dead",
    }
}

fn str_to_queue_status(s: &str) -> Result<QueueStatus, PortError> {
    match s {
        "pending" => Ok(QueueStatus::Pending),
        "sent" => Ok(QueueStatus::Sent),
        "failed" => Ok(QueueStatus::Failed),
        "dead" => Ok(QueueStatus::Dead),
        other => Err(PortError::Persistence(format!(
            "unknown queue status: {other}"
        ))),
    }
}

#[async_trait]
impl NotificationQueue for SqliteDb {
    async fn enqueue(&self, notification: PendingNotification) -> Result<(), PortError> {
        let channel = channel_to_str(&notification.channel);
        let status = status_to_str(&notification.status);
        let instance_id = notification.instance_id.to_string();
        let next_attempt = notification.next_attempt_at.to_rfc3339();
        let created_at = notification.created_at.to_rfc3339();

        sqlx::query(
            "INSERT INTO notifications (id, instance_id, channel, payload, status, next_attempt_at, retry_count, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&notification.id)
        .bind(&instance_id)
        .bind(channel)
        .bind(&notification.payload)
        .bind(status)
        .bind(&next_attempt)
        .bind(notification.retry_count)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn poll_pending(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<PendingNotification>, PortError> {
        let due = now.to_rfc3339();
        let rows: Vec<(String, String, String, String, String, String, i32, String)> =
            sqlx::query_as(
                "SELECT id, instance_id, channel, payload, status, next_attempt_at, retry_count, created_at
                 FROM notifications
                 WHERE status IN ('pending', 'failed') AND next_attempt_at <= ?
                 ORDER BY next_attempt_at ASC",
            )
            .bind(&due)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        let mut result = Vec::with_capacity(rows.len());
        for (id, instance_id, channel, payload, status, next_attempt, retry_count, created_at) in
            rows
        {
            result.push(PendingNotification {
                id,
                instance_id: InstanceId::parse(&instance_id)
                    .map_err(|e| PortError::Persistence(e.to_string()))?,
                channel: str_to_channel(&channel)?,
                payload,
                status: str_to_queue_status(&status)?,
                next_attempt_at: DateTime::parse_from_rfc3339(&next_attempt)
                    .map_err(|e| PortError::Persistence(e.to_string()))?
                    .with_timezone(&Utc),
                retry_count: retry_count as u32,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|e| PortError::Persistence(e.to_string()))?
                    .with_timezone(&Utc),
            });
        }
        Ok(result)
    }

    async fn mark_sent(&self, id: &str) -> Result<(), PortError> {
        sqlx::query("UPDATE notifications SET status = 'sent' WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: &str,
        error: &str,
        next_attempt: DateTime<Utc>,
    ) -> Result<(), PortError> {
        let next = next_attempt.to_rfc3339();
        sqlx::query(
            "UPDATE notifications SET status = 'failed', next_attempt_at = ?, retry_count = retry_count + 1 WHERE id = ?",
        )
        .bind(&next)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        tracing::warn!(notification_id = id, error = error, "notification failed");

        Ok(())
    }

    async fn mark_dead(&self, id: &str) -> Result<(), PortError> {
        sqlx::query("UPDATE notifications SET status = 'dead' WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(())
    }
}
