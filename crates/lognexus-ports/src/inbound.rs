use async_trait::async_trait;

use lognexus_core::alert::AlertInstance;
use lognexus_core::ids::{DefinitionId, InstanceId};
use serde_json::Value;

use crate::error::PortError;
use crate::types::{AlertSummary, InstanceFilter};

/// Alert instance lifecycle, as consumed by the API layer.
///
/// Transition calls report invalid source states and missing instances as
/// `false`, never as errors; bulk variants return the count that actually
/// transitioned.
#[async_trait]
pub trait AlertLifecycle: Send + Sync {
    async fn try_trigger(
        &self,
        definition_id: &DefinitionId,
        message: &str,
        context: Option<Value>,
        job_id: Option<&str>,
        server_name: Option<&str>,
    ) -> Result<Option<AlertInstance>, PortError>;

    async fn acknowledge(
        &self,
        instance_id: &InstanceId,
        actor: &str,
        note: Option<String>,
    ) -> Result<bool, PortError>;

    async fn resolve(
        &self,
        instance_id: &InstanceId,
        actor: &str,
        note: Option<String>,
    ) -> Result<bool, PortError>;

    async fn suppress(
        &self,
        instance_id: &InstanceId,
        actor: &str,
        note: Option<String>,
    ) -> Result<bool, PortError>;

    async fn bulk_acknowledge(
        &self,
        instance_ids: &[InstanceId],
        actor: &str,
        note: Option<String>,
    ) -> Result<u64, PortError>;

    async fn bulk_resolve(
        &self,
        instance_ids: &[InstanceId],
        actor: &str,
        note: Option<String>,
    ) -> Result<u64, PortError>;

    async fn list(&self, filter: InstanceFilter) -> Result<Vec<AlertInstance>, PortError>;
    async fn summary(&self) -> Result<AlertSummary, PortError>;
}

/// Periodic sweeps, driven by an external scheduler on independent
/// cadences. The scheduler guarantees at-most-one concurrent invocation
/// per sweep type.
#[async_trait]
pub trait SweepRunner: Send + Sync {
    /// Evaluate all active definitions; returns the number triggered.
    async fn evaluate_all(&self) -> Result<u32, PortError>;

    /// Time out stuck executions; returns the number transitioned.
    async fn sweep_stuck_executions(&self) -> Result<u32, PortError>;
}
