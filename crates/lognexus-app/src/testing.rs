//! In-memory port implementations shared by the service tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use lognexus_core::alert::condition::AlertCondition;
use lognexus_core::alert::{AlertDefinition, AlertInstance, InstanceStatus, Severity};
use lognexus_core::channel::Channel;
use lognexus_core::events::DomainEvent;
use lognexus_core::ids::{DefinitionId, ExecutionId, InstanceId};
use lognexus_core::job::{ExecutionStatus, Job, JobExecution};
use lognexus_core::log::LogLevel;
use lognexus_core::server::ServerStatus;
use lognexus_ports::error::{NotifyError, PortError};
use lognexus_ports::outbound::{
    AlertDefinitionRepository, AlertInstanceRepository, EventPublisher, ExecutionStore,
    JobRepository, LogMetrics, NotificationQueue, Notifier, ServerStatusProvider,
};
use lognexus_ports::types::{
    AlertSummary, InstanceFilter, Notification, NotifyResult, PendingNotification, QueueStatus,
};

pub fn now() -> DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339("2026-02-10T08:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub fn make_definition(
    name: &str,
    condition: AlertCondition,
    severity: Severity,
    throttle_minutes: u32,
) -> AlertDefinition {
    make_definition_with(
        name,
        condition,
        severity,
        throttle_minutes,
        vec![Channel::Email],
        Some("nightly-etl"),
        None,
    )
}

pub fn make_definition_with(
    name: &str,
    condition: AlertCondition,
    severity: Severity,
    throttle_minutes: u32,
    channels: Vec<Channel>,
    job_id: Option<&str>,
    server_name: Option<&str>,
) -> AlertDefinition {
    AlertDefinition::new(
        name.into(),
        None,
        condition,
        severity,
        job_id.map(str::to_string),
        server_name.map(str::to_string),
        channels,
        throttle_minutes,
        now(),
    )
    .unwrap()
}

pub fn make_execution(
    job_id: &str,
    status: ExecutionStatus,
    started_at: Option<DateTime<Utc>>,
    duration_ms: Option<i64>,
) -> JobExecution {
    JobExecution {
        id: ExecutionId::new(),
        job_id: job_id.into(),
        server_name: "batch-01".into(),
        status,
        started_at,
        completed_at: None,
        duration_ms,
        error_message: None,
    }
}

pub fn make_job(job_id: &str) -> Job {
    Job {
        job_id: job_id.into(),
        display_name: job_id.into(),
        server_name: "batch-01".into(),
        schedule: Some("0 2 * * *".into()),
        max_duration_ms: Some(3_600_000),
        is_active: true,
        last_execution_at: Some(now()),
        last_execution_status: Some(ExecutionStatus::Completed),
        success_rate: Some(99.0),
        failure_count: 0,
    }
}

#[derive(Default, Clone)]
pub struct MockDefinitionRepo {
    definitions: Arc<Mutex<Vec<AlertDefinition>>>,
}

impl MockDefinitionRepo {
    pub fn insert(&self, definition: AlertDefinition) {
        self.definitions.lock().unwrap().push(definition);
    }

    pub fn get(&self, id: &DefinitionId) -> Option<AlertDefinition> {
        self.definitions
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id() == id)
            .cloned()
    }
}

#[async_trait]
impl AlertDefinitionRepository for MockDefinitionRepo {
    async fn save(&self, definition: &AlertDefinition) -> Result<(), PortError> {
        let mut definitions = self.definitions.lock().unwrap();
        if let Some(pos) = definitions.iter().position(|d| d.id() == definition.id()) {
            definitions[pos] = definition.clone();
        } else {
            definitions.push(definition.clone());
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &DefinitionId) -> Result<Option<AlertDefinition>, PortError> {
        Ok(self.get(id))
    }

    async fn list_active(&self) -> Result<Vec<AlertDefinition>, PortError> {
        Ok(self
            .definitions
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.is_active())
            .cloned()
            .collect())
    }

    async fn mark_triggered(
        &self,
        id: &DefinitionId,
        at: DateTime<Utc>,
        _min_gap_minutes: u32,
    ) -> Result<bool, PortError> {
        // Check and stamp under one lock, like the adapter's guarded UPDATE.
        let mut definitions = self.definitions.lock().unwrap();
        let Some(definition) = definitions.iter_mut().find(|d| d.id() == id) else {
            return Ok(false);
        };
        if !definition.is_active() || definition.is_throttled(at) {
            return Ok(false);
        }
        definition.record_trigger(at);
        Ok(true)
    }
}

#[derive(Default, Clone)]
pub struct MockInstanceRepo {
    instances: Arc<Mutex<Vec<AlertInstance>>>,
}

impl MockInstanceRepo {
    pub fn get(&self, id: &InstanceId) -> Option<AlertInstance> {
        self.instances
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id() == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.instances.lock().unwrap().len()
    }
}

#[async_trait]
impl AlertInstanceRepository for MockInstanceRepo {
    async fn create(&self, instance: &AlertInstance) -> Result<(), PortError> {
        self.instances.lock().unwrap().push(instance.clone());
        Ok(())
    }

    async fn save(&self, instance: &AlertInstance) -> Result<(), PortError> {
        let mut instances = self.instances.lock().unwrap();
        if let Some(pos) = instances.iter().position(|i| i.id() == instance.id()) {
            instances[pos] = instance.clone();
        } else {
            instances.push(instance.clone());
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &InstanceId) -> Result<Option<AlertInstance>, PortError> {
        Ok(self.get(id))
    }

    async fn find_by_filter(
        &self,
        filter: &InstanceFilter,
    ) -> Result<Vec<AlertInstance>, PortError> {
        Ok(self
            .instances
            .lock()
            .unwrap()
            .iter()
            .filter(|i| filter.status.map_or(true, |s| i.status() == s))
            .filter(|i| filter.severity.map_or(true, |s| i.severity() == s))
            .cloned()
            .collect())
    }

    async fn count_by_status(&self) -> Result<Vec<(InstanceStatus, u64)>, PortError> {
        let instances = self.instances.lock().unwrap();
        let statuses = [
            InstanceStatus::New,
            InstanceStatus::Acknowledged,
            InstanceStatus::Resolved,
            InstanceStatus::Suppressed,
        ];
        Ok(statuses
            .iter()
            .map(|s| {
                (
                    *s,
                    instances.iter().filter(|i| i.status() == *s).count() as u64,
                )
            })
            .filter(|(_, n)| *n > 0)
            .collect())
    }

    async fn count_by_severity(&self) -> Result<Vec<(Severity, u64)>, PortError> {
        let instances = self.instances.lock().unwrap();
        let severities = [
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ];
        Ok(severities
            .iter()
            .map(|s| {
                (
                    *s,
                    instances.iter().filter(|i| i.severity() == *s).count() as u64,
                )
            })
            .filter(|(_, n)| *n > 0)
            .collect())
    }

    async fn summary(&self) -> Result<AlertSummary, PortError> {
        let instances = self.instances.lock().unwrap();
        Ok(AlertSummary {
            total: instances.len() as u64,
            new: instances
                .iter()
                .filter(|i| i.status() == InstanceStatus::New)
                .count() as u64,
            critical: instances
                .iter()
                .filter(|i| i.severity() == Severity::Critical)
                .count() as u64,
            high: instances
                .iter()
                .filter(|i| i.severity() == Severity::High)
                .count() as u64,
        })
    }

    async fn purge_terminal_before(&self, cutoff: DateTime<Utc>) -> Result<u64, PortError> {
        let mut instances = self.instances.lock().unwrap();
        let before = instances.len();
        instances.retain(|i| !(i.status().is_terminal() && i.triggered_at() < cutoff));
        Ok((before - instances.len()) as u64)
    }
}

#[derive(Default, Clone)]
pub struct MockNotificationQueue {
    pub items: Arc<Mutex<Vec<PendingNotification>>>,
}

impl MockNotificationQueue {
    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn status_of(&self, id: &str) -> Option<QueueStatus> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.status)
    }
}

#[async_trait]
impl NotificationQueue for MockNotificationQueue {
    async fn enqueue(&self, notification: PendingNotification) -> Result<(), PortError> {
        self.items.lock().unwrap().push(notification);
        Ok(())
    }

    async fn poll_pending(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<PendingNotification>, PortError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|n| {
                matches!(n.status, QueueStatus::Pending | QueueStatus::Failed)
                    && n.next_attempt_at <= now
            })
            .cloned()
            .collect())
    }

    async fn mark_sent(&self, id: &str) -> Result<(), PortError> {
        self.set_status(id, QueueStatus::Sent)
    }

    async fn mark_failed(
        &self,
        id: &str,
        _error: &str,
        next_attempt: DateTime<Utc>,
    ) -> Result<(), PortError> {
        let mut items = self.items.lock().unwrap();
        if let Some(item) = items.iter_mut().find(|n| n.id == id) {
            item.status = QueueStatus::Failed;
            item.retry_count += 1;
            item.next_attempt_at = next_attempt;
        }
        Ok(())
    }

    async fn mark_dead(&self, id: &str) -> Result<(), PortError> {
        self.set_status(id, QueueStatus::Dead)
    }
}

impl MockNotificationQueue {
    fn set_status(&self, id: &str, status: QueueStatus) -> Result<(), PortError> {
        let mut items = self.items.lock().unwrap();
        if let Some(item) = items.iter_mut().find(|n| n.id == id) {
            item.status = status;
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct MockEventPublisher {
    pub events: Arc<Mutex<Vec<DomainEvent>>>,
}

impl MockEventPublisher {
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event_type())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for MockEventPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), PortError> {
        self.events.lock().unwrap().extend(events);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct MockLogMetrics {
    pub level_count: Arc<Mutex<u64>>,
    pub pattern_count: Arc<Mutex<u64>>,
    pub query_count: Arc<Mutex<u64>>,
}

impl MockLogMetrics {
    pub fn set_level_count(&self, n: u64) {
        *self.level_count.lock().unwrap() = n;
    }

    pub fn set_pattern_count(&self, n: u64) {
        *self.pattern_count.lock().unwrap() = n;
    }

    pub fn set_query_count(&self, n: u64) {
        *self.query_count.lock().unwrap() = n;
    }
}

#[async_trait]
impl LogMetrics for MockLogMetrics {
    async fn count_at_or_above(
        &self,
        _since: DateTime<Utc>,
        _min_level: LogLevel,
        _job_id: Option<&str>,
        _server_name: Option<&str>,
    ) -> Result<u64, PortError> {
        Ok(*self.level_count.lock().unwrap())
    }

    async fn count_matching(
        &self,
        _since: DateTime<Utc>,
        _pattern: &str,
        _job_id: Option<&str>,
        _server_name: Option<&str>,
    ) -> Result<u64, PortError> {
        Ok(*self.pattern_count.lock().unwrap())
    }

    async fn count_for_query(&self, _query: &str, _since: DateTime<Utc>) -> Result<u64, PortError> {
        Ok(*self.query_count.lock().unwrap())
    }
}

#[derive(Default, Clone)]
pub struct MockExecutionStore {
    pub executions: Arc<Mutex<Vec<(JobExecution, Option<i64>)>>>,
}

impl MockExecutionStore {
    pub fn insert(&self, execution: JobExecution, max_duration_ms: Option<i64>) {
        self.executions
            .lock()
            .unwrap()
            .push((execution, max_duration_ms));
    }

    pub fn get(&self, id: &ExecutionId) -> Option<JobExecution> {
        self.executions
            .lock()
            .unwrap()
            .iter()
            .find(|(e, _)| &e.id == id)
            .map(|(e, _)| e.clone())
    }
}

#[async_trait]
impl ExecutionStore for MockExecutionStore {
    async fn last_executions(&self, job_id: &str, n: u32) -> Result<Vec<JobExecution>, PortError> {
        let executions = self.executions.lock().unwrap();
        let mut matching: Vec<_> = executions
            .iter()
            .filter(|(e, _)| e.job_id == job_id)
            .map(|(e, _)| e.clone())
            .collect();
        matching.sort_by_key(|e| std::cmp::Reverse(e.started_at));
        matching.truncate(n as usize);
        Ok(matching)
    }

    async fn running_with_deadline(&self) -> Result<Vec<(JobExecution, i64)>, PortError> {
        Ok(self
            .executions
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, max)| e.status == ExecutionStatus::Running && max.is_some())
            .map(|(e, max)| (e.clone(), max.unwrap()))
            .collect())
    }

    async fn complete_as_timeout(
        &self,
        id: &ExecutionId,
        at: DateTime<Utc>,
        message: &str,
    ) -> Result<bool, PortError> {
        let mut executions = self.executions.lock().unwrap();
        let Some((execution, _)) = executions.iter_mut().find(|(e, _)| &e.id == id) else {
            return Ok(false);
        };
        if execution.status != ExecutionStatus::Running {
            return Ok(false);
        }
        execution.complete_as_timeout(at, message.to_string());
        Ok(true)
    }
}

#[derive(Default, Clone)]
pub struct MockJobRepo {
    pub jobs: Arc<Mutex<Vec<Job>>>,
}

impl MockJobRepo {
    pub fn insert(&self, job: Job) {
        self.jobs.lock().unwrap().push(job);
    }
}

#[async_trait]
impl JobRepository for MockJobRepo {
    async fn find_by_id(&self, job_id: &str) -> Result<Option<Job>, PortError> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.job_id == job_id)
            .cloned())
    }

    async fn list_active(&self) -> Result<Vec<Job>, PortError> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.is_active)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct MockServerStatus {
    pub statuses: Arc<Mutex<Vec<(String, ServerStatus)>>>,
}

impl MockServerStatus {
    pub fn set(&self, server_name: &str, status: ServerStatus) {
        self.statuses
            .lock()
            .unwrap()
            .push((server_name.into(), status));
    }
}

#[async_trait]
impl ServerStatusProvider for MockServerStatus {
    async fn computed_status(&self, server_name: &str) -> Result<ServerStatus, PortError> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| name == server_name)
            .map(|(_, status)| *status)
            .unwrap_or(ServerStatus::Unknown))
    }
}

/// Notifier that records deliveries and can be told to fail.
#[derive(Clone)]
pub struct MockNotifier {
    channel: Channel,
    pub fail: Arc<Mutex<bool>>,
    pub delivered: Arc<Mutex<Vec<Notification>>>,
}

impl MockNotifier {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            fail: Arc::new(Mutex::new(false)),
            delivered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, notification: &Notification) -> Result<NotifyResult, NotifyError> {
        if *self.fail.lock().unwrap() {
            return Err(NotifyError::DeliveryFailed("smtp unreachable".into()));
        }
        self.delivered.lock().unwrap().push(notification.clone());
        Ok(NotifyResult::default())
    }

    fn channel(&self) -> Channel {
        self.channel
    }
}
