pub mod condition;
pub mod severity;
pub mod status;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::channel::Channel;
use crate::error::DomainError;
use crate::events::{
    AlertAcknowledged, AlertResolved, AlertSuppressed, AlertTriggered, DomainEvent,
};
use crate::ids::{DefinitionId, InstanceId};

pub use condition::{AlertCondition, AlertType};
pub use severity::Severity;
pub use status::InstanceStatus;

/// A configured alert rule.
///
/// Definitions are deactivated rather than hard-deleted. `last_triggered_at`
/// and `trigger_count` are throttle state: persisted writes go through the
/// definition repository's atomic check-and-set, never through plain saves
/// of a stale copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertDefinition {
    id: DefinitionId,
    name: String,
    description: Option<String>,
    condition: AlertCondition,
    severity: Severity,
    job_id: Option<String>,
    server_name: Option<String>,
    channels: Vec<Channel>,
    throttle_minutes: u32,
    is_active: bool,
    last_triggered_at: Option<DateTime<Utc>>,
    trigger_count: u64,
    created_at: DateTime<Utc>,
}

impl AlertDefinition {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        description: Option<String>,
        condition: AlertCondition,
        severity: Severity,
        job_id: Option<String>,
        server_name: Option<String>,
        channels: Vec<Channel>,
        throttle_minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::EmptyDefinitionName);
        }
        Ok(Self {
            id: DefinitionId::new(),
            name,
            description,
            condition,
            severity,
            job_id,
            server_name,
            channels,
            throttle_minutes,
            is_active: true,
            last_triggered_at: None,
            trigger_count: 0,
            created_at: now,
        })
    }

    /// Whether a trigger at `now` would fall inside the throttle window.
    pub fn is_throttled(&self, now: DateTime<Utc>) -> bool {
        match self.last_triggered_at {
            Some(last) => now - last < Duration::minutes(i64::from(self.throttle_minutes)),
            None => false,
        }
    }

    /// Stamp a successful trigger. In-memory counterpart of the
    /// repository's atomic update; adapters apply the same change as a
    /// single guarded UPDATE.
    pub fn record_trigger(&mut self, now: DateTime<Utc>) {
        self.last_triggered_at = Some(now);
        self.trigger_count += 1;
    }

    /// Overlay throttle state read back from the store's authoritative
    /// columns; the serialized document may lag behind them.
    pub fn sync_trigger_state(
        &mut self,
        last_triggered_at: Option<DateTime<Utc>>,
        trigger_count: u64,
    ) {
        self.last_triggered_at = last_triggered_at;
        self.trigger_count = trigger_count;
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    pub fn id(&self) -> &DefinitionId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn condition(&self) -> &AlertCondition {
        &self.condition
    }

    pub fn alert_type(&self) -> AlertType {
        self.condition.alert_type()
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn throttle_minutes(&self) -> u32 {
        self.throttle_minutes
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn last_triggered_at(&self) -> Option<DateTime<Utc>> {
        self.last_triggered_at
    }

    pub fn trigger_count(&self) -> u64 {
        self.trigger_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// One occurrence of a definition firing.
///
/// Severity is copied from the definition at trigger time so later edits
/// do not rewrite history. Transitions only move forward; methods return
/// `None` when the instance is not in a valid source state, which callers
/// surface as `false` rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertInstance {
    id: InstanceId,
    definition_id: DefinitionId,
    severity: Severity,
    message: String,
    job_id: Option<String>,
    server_name: Option<String>,
    context: Option<Value>,
    status: InstanceStatus,
    triggered_at: DateTime<Utc>,
    acknowledged_at: Option<DateTime<Utc>>,
    acknowledged_by: Option<String>,
    resolved_at: Option<DateTime<Utc>>,
    resolved_by: Option<String>,
    note: Option<String>,
}

impl AlertInstance {
    pub fn new(
        definition: &AlertDefinition,
        message: String,
        context: Option<Value>,
        job_id: Option<String>,
        server_name: Option<String>,
        now: DateTime<Utc>,
    ) -> (Self, DomainEvent) {
        let id = InstanceId::new();
        let instance = Self {
            id: id.clone(),
            definition_id: definition.id().clone(),
            severity: definition.severity(),
            message,
            job_id,
            server_name,
            context,
            status: InstanceStatus::New,
            triggered_at: now,
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            resolved_by: None,
            note: None,
        };
        let event = DomainEvent::AlertTriggered(AlertTriggered {
            instance_id: id,
            definition_id: definition.id().clone(),
            severity: definition.severity(),
            occurred_at: now,
        });
        (instance, event)
    }

    /// `New → Acknowledged`. Returns `None` from any other state.
    pub fn acknowledge(
        &mut self,
        actor: &str,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Option<DomainEvent> {
        if self.status != InstanceStatus::New {
            return None;
        }
        self.status = InstanceStatus::Acknowledged;
        self.acknowledged_at = Some(now);
        self.acknowledged_by = Some(actor.to_string());
        if note.is_some() {
            self.note = note;
        }
        Some(DomainEvent::AlertAcknowledged(AlertAcknowledged {
            instance_id: self.id.clone(),
            actor: actor.to_string(),
            occurred_at: now,
        }))
    }

    /// `New | Acknowledged → Resolved`. Terminal; returns `None` once
    /// resolved or suppressed.
    pub fn resolve(
        &mut self,
        actor: &str,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Option<DomainEvent> {
        if self.status.is_terminal() {
            return None;
        }
        self.status = InstanceStatus::Resolved;
        self.resolved_at = Some(now);
        self.resolved_by = Some(actor.to_string());
        if note.is_some() {
            self.note = note;
        }
        Some(DomainEvent::AlertResolved(AlertResolved {
            instance_id: self.id.clone(),
            actor: actor.to_string(),
            occurred_at: now,
        }))
    }

    /// `New | Acknowledged → Suppressed`. Terminal.
    pub fn suppress(
        &mut self,
        actor: &str,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Option<DomainEvent> {
        if self.status.is_terminal() {
            return None;
        }
        self.status = InstanceStatus::Suppressed;
        self.resolved_at = Some(now);
        self.resolved_by = Some(actor.to_string());
        if note.is_some() {
            self.note = note;
        }
        Some(DomainEvent::AlertSuppressed(AlertSuppressed {
            instance_id: self.id.clone(),
            actor: actor.to_string(),
            occurred_at: now,
        }))
    }

    pub fn id(&self) -> &InstanceId {
        &self.id
    }

    pub fn definition_id(&self) -> &DefinitionId {
        &self.definition_id
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    pub fn context(&self) -> Option<&Value> {
        self.context.as_ref()
    }

    pub fn status(&self) -> InstanceStatus {
        self.status
    }

    pub fn triggered_at(&self) -> DateTime<Utc> {
        self.triggered_at
    }

    pub fn acknowledged_at(&self) -> Option<DateTime<Utc>> {
        self.acknowledged_at
    }

    pub fn acknowledged_by(&self) -> Option<&str> {
        self.acknowledged_by.as_deref()
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    pub fn resolved_by(&self) -> Option<&str> {
        self.resolved_by.as_deref()
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::LogLevel;

    fn ts(s: &str) -> DateTime<Utc> {
        chrono::DateTime::parse_from_rfc3339(s)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn now() -> DateTime<Utc> {
        ts("2026-02-10T08:00:00Z")
    }

    fn make_definition(throttle_minutes: u32) -> AlertDefinition {
        AlertDefinition::new(
            "nightly-etl errors".into(),
            None,
            AlertCondition::ErrorThreshold {
                threshold: 5,
                window_minutes: 10,
                min_level: LogLevel::Error,
            },
            Severity::High,
            Some("nightly-etl".into()),
            None,
            vec![Channel::Email],
            throttle_minutes,
            now(),
        )
        .unwrap()
    }

    fn make_instance() -> AlertInstance {
        let definition = make_definition(10);
        let (instance, _) = AlertInstance::new(
            &definition,
            "5 errors in 10 minutes".into(),
            None,
            Some("nightly-etl".into()),
            None,
            now(),
        );
        instance
    }

    #[test]
    fn empty_name_rejected() {
        let result = AlertDefinition::new(
            "  ".into(),
            None,
            AlertCondition::ServerOffline,
            Severity::Low,
            None,
            Some("web-01".into()),
            vec![],
            0,
            now(),
        );
        assert_eq!(result.unwrap_err(), DomainError::EmptyDefinitionName);
    }

    #[test]
    fn never_triggered_is_not_throttled() {
        let definition = make_definition(10);
        assert!(!definition.is_throttled(now()));
    }

    #[test]
    fn trigger_inside_window_is_throttled() {
        let mut definition = make_definition(10);
        definition.record_trigger(now());
        assert!(definition.is_throttled(now() + Duration::minutes(5)));
        assert_eq!(definition.trigger_count(), 1);
    }

    #[test]
    fn throttle_boundary_is_exclusive_below_inclusive_at() {
        let mut definition = make_definition(10);
        definition.record_trigger(now());
        assert!(definition.is_throttled(now() + Duration::minutes(10) - Duration::seconds(1)));
        assert!(!definition.is_throttled(now() + Duration::minutes(10)));
        assert!(!definition.is_throttled(now() + Duration::minutes(10) + Duration::seconds(1)));
    }

    #[test]
    fn zero_throttle_never_throttles() {
        let mut definition = make_definition(0);
        definition.record_trigger(now());
        assert!(!definition.is_throttled(now()));
    }

    #[test]
    fn new_instance_copies_definition_severity() {
        let instance = make_instance();
        assert_eq!(instance.status(), InstanceStatus::New);
        assert_eq!(instance.severity(), Severity::High);
    }

    #[test]
    fn acknowledge_from_new_succeeds() {
        let mut instance = make_instance();
        let event = instance.acknowledge("alice", None, now());
        assert!(event.is_some());
        assert_eq!(instance.status(), InstanceStatus::Acknowledged);
        assert_eq!(instance.acknowledged_by(), Some("alice"));
    }

    #[test]
    fn acknowledge_twice_is_noop() {
        let mut instance = make_instance();
        instance.acknowledge("alice", None, now()).unwrap();
        let second = instance.acknowledge("bob", None, now());
        assert!(second.is_none());
        assert_eq!(instance.acknowledged_by(), Some("alice"));
    }

    #[test]
    fn resolve_from_new_succeeds() {
        let mut instance = make_instance();
        let event = instance.resolve("alice", Some("restarted agent".into()), now());
        assert!(event.is_some());
        assert_eq!(instance.status(), InstanceStatus::Resolved);
        assert_eq!(instance.note(), Some("restarted agent"));
    }

    #[test]
    fn resolved_is_terminal() {
        let mut instance = make_instance();
        instance.resolve("alice", None, now()).unwrap();
        assert!(instance.acknowledge("bob", None, now()).is_none());
        assert!(instance.resolve("bob", None, now()).is_none());
        assert!(instance.suppress("bob", None, now()).is_none());
        assert_eq!(instance.status(), InstanceStatus::Resolved);
    }

    #[test]
    fn suppressed_is_terminal() {
        let mut instance = make_instance();
        instance.suppress("alice", None, now()).unwrap();
        assert!(instance.resolve("bob", None, now()).is_none());
        assert_eq!(instance.status(), InstanceStatus::Suppressed);
    }

    #[test]
    fn acknowledged_at_precedes_resolved_at() {
        let mut instance = make_instance();
        instance.acknowledge("alice", None, now()).unwrap();
        instance
            .resolve("alice", None, now() + Duration::minutes(3))
            .unwrap();
        assert!(instance.acknowledged_at().unwrap() <= instance.resolved_at().unwrap());
    }
}
