use async_trait::async_trait;
use chrono::{DateTime, Utc};

use lognexus_core::alert::{AlertDefinition, AlertInstance, InstanceStatus, Severity};
use lognexus_core::channel::Channel;
use lognexus_core::events::DomainEvent;
use lognexus_core::ids::{DefinitionId, ExecutionId, InstanceId};
use lognexus_core::job::{Job, JobExecution};
use lognexus_core::log::LogLevel;
use lognexus_core::server::ServerStatus;

use crate::error::{NotifyError, PortError};
use crate::types::{AlertSummary, InstanceFilter, Notification, NotifyResult, PendingNotification};

#[async_trait]
pub trait AlertDefinitionRepository: Send + Sync {
    async fn save(&self, definition: &AlertDefinition) -> Result<(), PortError>;
    async fn find_by_id(&self, id: &DefinitionId) -> Result<Option<AlertDefinition>, PortError>;
    async fn list_active(&self) -> Result<Vec<AlertDefinition>, PortError>;

    /// Atomic throttle check-and-set: stamps `last_triggered_at = at` and
    /// increments `trigger_count` only if the previous trigger is at least
    /// `min_gap_minutes` old (or absent), as one guarded update. Returns
    /// `false` when the definition is throttled, inactive, or missing.
    async fn mark_triggered(
        &self,
        id: &DefinitionId,
        at: DateTime<Utc>,
        min_gap_minutes: u32,
    ) -> Result<bool, PortError>;
}

#[async_trait]
pub trait AlertInstanceRepository: Send + Sync {
    async fn create(&self, instance: &AlertInstance) -> Result<(), PortError>;
    async fn save(&self, instance: &AlertInstance) -> Result<(), PortError>;
    async fn find_by_id(&self, id: &InstanceId) -> Result<Option<AlertInstance>, PortError>;
    async fn find_by_filter(&self, filter: &InstanceFilter)
        -> Result<Vec<AlertInstance>, PortError>;
    async fn count_by_status(&self) -> Result<Vec<(InstanceStatus, u64)>, PortError>;
    async fn count_by_severity(&self) -> Result<Vec<(Severity, u64)>, PortError>;
    async fn summary(&self) -> Result<AlertSummary, PortError>;

    /// Retention sweep: hard-delete resolved/suppressed instances triggered
    /// before `cutoff`. Returns the number deleted.
    async fn purge_terminal_before(&self, cutoff: DateTime<Utc>) -> Result<u64, PortError>;
}

/// Read-only log metrics backing threshold and pattern conditions.
#[async_trait]
pub trait LogMetrics: Send + Sync {
    async fn count_at_or_above(
        &self,
        since: DateTime<Utc>,
        min_level: LogLevel,
        job_id: Option<&str>,
        server_name: Option<&str>,
    ) -> Result<u64, PortError>;

    async fn count_matching(
        &self,
        since: DateTime<Utc>,
        pattern: &str,
        job_id: Option<&str>,
        server_name: Option<&str>,
    ) -> Result<u64, PortError>;

    /// Store-evaluated count for a custom query condition.
    async fn count_for_query(&self, query: &str, since: DateTime<Utc>) -> Result<u64, PortError>;
}

#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Most recent executions of a job, newest first.
    async fn last_executions(&self, job_id: &str, n: u32) -> Result<Vec<JobExecution>, PortError>;

    /// Executions currently Running whose owning job declares a maximum
    /// duration, paired with that maximum in milliseconds.
    async fn running_with_deadline(&self) -> Result<Vec<(JobExecution, i64)>, PortError>;

    /// Transition an execution Running → Timeout, guarded on the source
    /// state so a repeated sweep is a no-op. Returns `false` when the
    /// execution was no longer Running.
    async fn complete_as_timeout(
        &self,
        id: &ExecutionId,
        at: DateTime<Utc>,
        message: &str,
    ) -> Result<bool, PortError>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn find_by_id(&self, job_id: &str) -> Result<Option<Job>, PortError>;
    async fn list_active(&self) -> Result<Vec<Job>, PortError>;
}

#[async_trait]
pub trait ServerStatusProvider: Send + Sync {
    async fn computed_status(&self, server_name: &str) -> Result<ServerStatus, PortError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<NotifyResult, NotifyError>;
    fn channel(&self) -> Channel;
}

/// Outbound queue decoupling notification delivery from the evaluation
/// sweep: a slow or down channel backend cannot add latency to triggering.
#[async_trait]
pub trait NotificationQueue: Send + Sync {
    async fn enqueue(&self, notification: PendingNotification) -> Result<(), PortError>;
    async fn poll_pending(&self, now: DateTime<Utc>)
        -> Result<Vec<PendingNotification>, PortError>;
    async fn mark_sent(&self, id: &str) -> Result<(), PortError>;
    async fn mark_failed(
        &self,
        id: &str,
        error: &str,
        next_attempt: DateTime<Utc>,
    ) -> Result<(), PortError>;
    async fn mark_dead(&self, id: &str) -> Result<(), PortError>;
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), PortError>;
}
