use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lognexus_core::alert::{InstanceStatus, Severity};
use lognexus_core::channel::Channel;
use lognexus_core::ids::InstanceId;

/// Notification ready to be sent via a channel adapter. Serializable so
/// it can ride through the outbound queue as the pending payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub instance_id: InstanceId,
    pub severity: Severity,
    pub definition_name: String,
    pub message: String,
    pub job_id: Option<String>,
    pub server_name: Option<String>,
}

/// Delivery metadata returned by notifiers.
#[derive(Debug, Clone, Default)]
pub struct NotifyResult {
    pub external_id: Option<String>,
}

/// A notification waiting in the outbound queue.
#[derive(Debug, Clone)]
pub struct PendingNotification {
    pub id: String,
    pub instance_id: InstanceId,
    pub channel: Channel,
    pub payload: String,
    pub status: QueueStatus,
    pub next_attempt_at: DateTime<Utc>,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueStatus {
    Pending,
    Sent,
    Failed,
    Dead,
}

/// Filter criteria for listing alert instances.
#[derive(Debug, Clone, Default)]
pub struct InstanceFilter {
    pub status: Option<InstanceStatus>,
    pub severity: Option<Severity>,
    pub job_id: Option<String>,
    pub server_name: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

/// Dashboard rollup of alert instances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertSummary {
    pub total: u64,
    pub new: u64,
    pub critical: u64,
    pub high: u64,
}
