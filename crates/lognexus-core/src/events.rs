use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alert::severity::Severity;
use crate::channel::Channel;
use crate::ids::{DefinitionId, ExecutionId, InstanceId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DomainEvent {
    AlertTriggered(AlertTriggered),
    AlertAcknowledged(AlertAcknowledged),
    AlertResolved(AlertResolved),
    AlertSuppressed(AlertSuppressed),
    ExecutionTimedOut(ExecutionTimedOut),
    NotificationSent(NotificationSent),
    NotificationFailed(NotificationFailed),
}

impl DomainEvent {
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::AlertTriggered(e) => e.occurred_at,
            Self::AlertAcknowledged(e) => e.occurred_at,
            Self::AlertResolved(e) => e.occurred_at,
            Self::AlertSuppressed(e) => e.occurred_at,
            Self::ExecutionTimedOut(e) => e.occurred_at,
            Self::NotificationSent(e) => e.occurred_at,
            Self::NotificationFailed(e) => e.occurred_at,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AlertTriggered(_) => "alert.triggered",
            Self::AlertAcknowledged(_) => "alert.acknowledged",
            Self::AlertResolved(_) => "alert.resolved",
            Self::AlertSuppressed(_) => "alert.suppressed",
            Self::ExecutionTimedOut(_) => "execution.timed_out",
            Self::NotificationSent(_) => "notification.sent",
            Self::NotificationFailed(_) => "notification.failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertTriggered {
    pub instance_id: InstanceId,
    pub definition_id: DefinitionId,
    pub severity: Severity,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertAcknowledged {
    pub instance_id: InstanceId,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertResolved {
    pub instance_id: InstanceId,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertSuppressed {
    pub instance_id: InstanceId,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionTimedOut {
    pub execution_id: ExecutionId,
    pub job_id: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationSent {
    pub instance_id: InstanceId,
    pub channel: Channel,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationFailed {
    pub instance_id: InstanceId,
    pub channel: Channel,
    pub error: String,
    pub occurred_at: DateTime<Utc>,
}
