use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use lognexus_core::events::{DomainEvent, ExecutionTimedOut};
use lognexus_ports::outbound::{EventPublisher, ExecutionStore};

use crate::error::AppError;

/// Sweeps executions stuck in the Running state past their job's maximum
/// duration and transitions them to Timeout.
///
/// This is a deadline check, not a liveness probe: an execution whose
/// process finished but whose completion callback was lost stays stuck
/// until the deadline. A heartbeat from the executing agent is the
/// complementary mechanism, owned elsewhere.
pub struct TimeoutService<X, EP>
where
    X: ExecutionStore,
    EP: EventPublisher,
{
    executions: X,
    events: EP,
}

impl<X, EP> TimeoutService<X, EP>
where
    X: ExecutionStore,
    EP: EventPublisher,
{
    pub fn new(executions: X, events: EP) -> Self {
        Self { executions, events }
    }

    /// Returns the number of executions newly transitioned to Timeout.
    /// Idempotent: a second run right after finds nothing left Running
    /// past its deadline.
    pub async fn sweep_stuck_executions(
        &self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<u32, AppError> {
        let running = self.executions.running_with_deadline().await?;
        let mut timed_out = 0;

        for (execution, max_duration_ms) in running {
            if cancel.is_cancelled() {
                tracing::debug!("timeout sweep cancelled");
                break;
            }
            if !execution.is_overdue(max_duration_ms, now) {
                continue;
            }

            let message =
                format!("Execution exceeded the maximum duration of {max_duration_ms} ms");
            match self
                .executions
                .complete_as_timeout(&execution.id, now, &message)
                .await
            {
                Ok(true) => {
                    timed_out += 1;
                    let event = DomainEvent::ExecutionTimedOut(ExecutionTimedOut {
                        execution_id: execution.id.clone(),
                        job_id: execution.job_id.clone(),
                        occurred_at: now,
                    });
                    if let Err(e) = self.events.publish(vec![event]).await {
                        tracing::warn!(execution_id = %execution.id, error = %e, "failed to publish timeout event");
                    }
                }
                // Raced out of Running between the query and the update.
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        execution_id = %execution.id,
                        job_id = %execution.job_id,
                        error = %e,
                        "failed to time out execution"
                    );
                }
            }
        }

        Ok(timed_out)
    }
}
