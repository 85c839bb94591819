use chrono::{DateTime, Duration, Utc};

use lognexus_core::events::{DomainEvent, NotificationFailed, NotificationSent};
use lognexus_ports::outbound::{EventPublisher, NotificationQueue, Notifier};
use lognexus_ports::types::{Notification, PendingNotification};

use crate::error::AppError;

const MAX_RETRIES: u32 = 5;
const BASE_BACKOFF_SECS: i64 = 60;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub sent: u32,
    pub retried: u32,
    pub dead: u32,
}

/// Drains the outbound notification queue through the registered channel
/// notifiers.
///
/// Triggering only enqueues; delivery happens here on its own cadence, so
/// a slow or down channel backend never adds latency to the evaluation
/// sweep. Failures retry with exponential backoff until the attempt
/// budget is spent, then the item is parked as dead.
pub struct DispatchService<NQ, EP>
where
    NQ: NotificationQueue,
    EP: EventPublisher,
{
    queue: NQ,
    events: EP,
    notifiers: Vec<Box<dyn Notifier>>,
}

impl<NQ, EP> DispatchService<NQ, EP>
where
    NQ: NotificationQueue,
    EP: EventPublisher,
{
    pub fn new(queue: NQ, events: EP, notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self {
            queue,
            events,
            notifiers,
        }
    }

    pub async fn drain_pending(&self, now: DateTime<Utc>) -> Result<DispatchOutcome, AppError> {
        let pending = self.queue.poll_pending(now).await?;
        let mut outcome = DispatchOutcome::default();

        for item in pending {
            match self.dispatch_one(&item, now).await {
                Ok(Delivery::Sent) => outcome.sent += 1,
                Ok(Delivery::Retried) => outcome.retried += 1,
                Ok(Delivery::Dead) => outcome.dead += 1,
                Err(e) => {
                    tracing::warn!(notification_id = %item.id, error = %e, "dispatch item failed");
                }
            }
        }

        Ok(outcome)
    }

    async fn dispatch_one(
        &self,
        item: &PendingNotification,
        now: DateTime<Utc>,
    ) -> Result<Delivery, AppError> {
        let Some(notifier) = self.notifiers.iter().find(|n| n.channel() == item.channel) else {
            tracing::warn!(
                notification_id = %item.id,
                channel = ?item.channel,
                "no notifier registered for channel"
            );
            self.queue.mark_dead(&item.id).await?;
            return Ok(Delivery::Dead);
        };

        let notification: Notification = match serde_json::from_str(&item.payload) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(notification_id = %item.id, error = %e, "undecodable payload");
                self.queue.mark_dead(&item.id).await?;
                return Ok(Delivery::Dead);
            }
        };

        match notifier.notify(&notification).await {
            Ok(_) => {
                self.queue.mark_sent(&item.id).await?;
                self.publish(DomainEvent::NotificationSent(NotificationSent {
                    instance_id: item.instance_id.clone(),
                    channel: item.channel,
                    occurred_at: now,
                }))
                .await;
                Ok(Delivery::Sent)
            }
            Err(e) => {
                let attempts = item.retry_count + 1;
                if attempts >= MAX_RETRIES {
                    self.queue.mark_dead(&item.id).await?;
                    self.publish(DomainEvent::NotificationFailed(NotificationFailed {
                        instance_id: item.instance_id.clone(),
                        channel: item.channel,
                        error: e.to_string(),
                        occurred_at: now,
                    }))
                    .await;
                    Ok(Delivery::Dead)
                } else {
                    let backoff =
                        Duration::seconds(BASE_BACKOFF_SECS << item.retry_count.min(10));
                    self.queue
                        .mark_failed(&item.id, &e.to_string(), now + backoff)
                        .await?;
                    Ok(Delivery::Retried)
                }
            }
        }
    }

    async fn publish(&self, event: DomainEvent) {
        if let Err(e) = self.events.publish(vec![event]).await {
            tracing::warn!(error = %e, "failed to publish notification event");
        }
    }
}

enum Delivery {
    Sent,
    Retried,
    Dead,
}
