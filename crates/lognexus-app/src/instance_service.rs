use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use lognexus_core::alert::{AlertDefinition, AlertInstance, InstanceStatus, Severity};
use lognexus_core::events::DomainEvent;
use lognexus_core::ids::{DefinitionId, InstanceId};
use lognexus_ports::outbound::{
    AlertDefinitionRepository, AlertInstanceRepository, EventPublisher, NotificationQueue,
};
use lognexus_ports::types::{
    AlertSummary, InstanceFilter, Notification, PendingNotification, QueueStatus,
};

use crate::error::AppError;

/// Owns alert instance creation and its state machine.
///
/// The throttle decision lives entirely in the definition repository's
/// `mark_triggered` check-and-set, so concurrent `try_trigger` calls for
/// the same definition cannot double-fire within a window.
pub struct InstanceService<D, I, NQ, EP>
where
    D: AlertDefinitionRepository,
    I: AlertInstanceRepository,
    NQ: NotificationQueue,
    EP: EventPublisher,
{
    definitions: D,
    instances: I,
    notifications: NQ,
    events: EP,
}

impl<D, I, NQ, EP> InstanceService<D, I, NQ, EP>
where
    D: AlertDefinitionRepository,
    I: AlertInstanceRepository,
    NQ: NotificationQueue,
    EP: EventPublisher,
{
    pub fn new(definitions: D, instances: I, notifications: NQ, events: EP) -> Self {
        Self {
            definitions,
            instances,
            notifications,
            events,
        }
    }

    /// Active definitions, for the evaluation sweep.
    pub async fn active_definitions(&self) -> Result<Vec<AlertDefinition>, AppError> {
        Ok(self.definitions.list_active().await?)
    }

    /// Create an instance for a firing definition unless throttled.
    ///
    /// Returns `None` when the definition is missing, inactive, or inside
    /// its throttle window. Notification enqueue and event publishing are
    /// best-effort: their failure never rolls back the instance or the
    /// throttle stamp.
    pub async fn try_trigger(
        &self,
        definition_id: &DefinitionId,
        message: &str,
        context: Option<Value>,
        job_id: Option<&str>,
        server_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<AlertInstance>, AppError> {
        let Some(definition) = self.definitions.find_by_id(definition_id).await? else {
            return Ok(None);
        };
        if !definition.is_active() {
            return Ok(None);
        }

        let fired = self
            .definitions
            .mark_triggered(definition_id, now, definition.throttle_minutes())
            .await?;
        if !fired {
            tracing::debug!(definition_id = %definition_id, "trigger suppressed by throttle");
            return Ok(None);
        }

        let job_scope = job_id
            .map(str::to_string)
            .or_else(|| definition.job_id().map(str::to_string));
        let server_scope = server_name
            .map(str::to_string)
            .or_else(|| definition.server_name().map(str::to_string));

        let (instance, event) = AlertInstance::new(
            &definition,
            message.to_string(),
            context,
            job_scope,
            server_scope,
            now,
        );
        self.instances.create(&instance).await?;
        self.publish(vec![event]).await;

        for channel in definition.channels() {
            let notification = Notification {
                instance_id: instance.id().clone(),
                severity: instance.severity(),
                definition_name: definition.name().to_string(),
                message: instance.message().to_string(),
                job_id: instance.job_id().map(str::to_string),
                server_name: instance.server_name().map(str::to_string),
            };
            let payload = match serde_json::to_string(&notification) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(instance_id = %instance.id(), error = %e, "failed to encode notification payload");
                    continue;
                }
            };
            let pending = PendingNotification {
                id: Uuid::new_v4().to_string(),
                instance_id: instance.id().clone(),
                channel: *channel,
                payload,
                status: QueueStatus::Pending,
                next_attempt_at: now,
                retry_count: 0,
                created_at: now,
            };
            if let Err(e) = self.notifications.enqueue(pending).await {
                tracing::warn!(
                    instance_id = %instance.id(),
                    channel = ?channel,
                    error = %e,
                    "failed to enqueue notification"
                );
            }
        }

        Ok(Some(instance))
    }

    /// `New → Acknowledged`. `false` when the instance is missing or not
    /// in a valid source state.
    pub async fn acknowledge(
        &self,
        instance_id: &InstanceId,
        actor: &str,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        self.transition(instance_id, now, |instance, at| {
            instance.acknowledge(actor, note.clone(), at)
        })
        .await
    }

    /// `New | Acknowledged → Resolved`. Terminal.
    pub async fn resolve(
        &self,
        instance_id: &InstanceId,
        actor: &str,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        self.transition(instance_id, now, |instance, at| {
            instance.resolve(actor, note.clone(), at)
        })
        .await
    }

    /// `New | Acknowledged → Suppressed`. Terminal.
    pub async fn suppress(
        &self,
        instance_id: &InstanceId,
        actor: &str,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        self.transition(instance_id, now, |instance, at| {
            instance.suppress(actor, note.clone(), at)
        })
        .await
    }

    pub async fn bulk_acknowledge(
        &self,
        instance_ids: &[InstanceId],
        actor: &str,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut transitioned = 0;
        for id in instance_ids {
            match self.acknowledge(id, actor, note.clone(), now).await {
                Ok(true) => transitioned += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(instance_id = %id, error = %e, "bulk acknowledge item failed");
                }
            }
        }
        Ok(transitioned)
    }

    pub async fn bulk_resolve(
        &self,
        instance_ids: &[InstanceId],
        actor: &str,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut transitioned = 0;
        for id in instance_ids {
            match self.resolve(id, actor, note.clone(), now).await {
                Ok(true) => transitioned += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(instance_id = %id, error = %e, "bulk resolve item failed");
                }
            }
        }
        Ok(transitioned)
    }

    pub async fn list(&self, filter: &InstanceFilter) -> Result<Vec<AlertInstance>, AppError> {
        Ok(self.instances.find_by_filter(filter).await?)
    }

    pub async fn counts_by_status(&self) -> Result<Vec<(InstanceStatus, u64)>, AppError> {
        Ok(self.instances.count_by_status().await?)
    }

    pub async fn counts_by_severity(&self) -> Result<Vec<(Severity, u64)>, AppError> {
        Ok(self.instances.count_by_severity().await?)
    }

    pub async fn summary(&self) -> Result<AlertSummary, AppError> {
        Ok(self.instances.summary().await?)
    }

    /// Retention sweep: hard-delete resolved/suppressed instances older
    /// than `horizon`.
    pub async fn purge_resolved(
        &self,
        horizon: Duration,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        Ok(self.instances.purge_terminal_before(now - horizon).await?)
    }

    async fn transition<F>(
        &self,
        instance_id: &InstanceId,
        now: DateTime<Utc>,
        apply: F,
    ) -> Result<bool, AppError>
    where
        F: FnOnce(&mut AlertInstance, DateTime<Utc>) -> Option<DomainEvent>,
    {
        let Some(mut instance) = self.instances.find_by_id(instance_id).await? else {
            return Ok(false);
        };
        let Some(event) = apply(&mut instance, now) else {
            return Ok(false);
        };
        self.instances.save(&instance).await?;
        self.publish(vec![event]).await;
        Ok(true)
    }

    async fn publish(&self, events: Vec<DomainEvent>) {
        if let Err(e) = self.events.publish(events).await {
            tracing::warn!(error = %e, "failed to publish domain events");
        }
    }
}
