use chrono::{DateTime, Duration, Utc};
use tokio_util::sync::CancellationToken;

use lognexus_core::alert::condition::AlertCondition;
use lognexus_core::alert::AlertDefinition;
use lognexus_core::job::ExecutionStatus;
use lognexus_core::server::ServerStatus;
use lognexus_ports::outbound::{
    AlertDefinitionRepository, AlertInstanceRepository, EventPublisher, ExecutionStore,
    JobRepository, LogMetrics, NotificationQueue, ServerStatusProvider,
};

use crate::error::AppError;
use crate::instance_service::InstanceService;

/// Periodic rule evaluation over all active alert definitions.
///
/// Polling keeps the evaluator stateless between cycles; detection latency
/// is bounded by the external cadence. A failure evaluating one definition
/// never aborts the rest of the sweep.
pub struct EvaluatorService<D, I, NQ, EP, L, X, S, J>
where
    D: AlertDefinitionRepository,
    I: AlertInstanceRepository,
    NQ: NotificationQueue,
    EP: EventPublisher,
    L: LogMetrics,
    X: ExecutionStore,
    S: ServerStatusProvider,
    J: JobRepository,
{
    manager: InstanceService<D, I, NQ, EP>,
    logs: L,
    executions: X,
    servers: S,
    jobs: J,
}

impl<D, I, NQ, EP, L, X, S, J> EvaluatorService<D, I, NQ, EP, L, X, S, J>
where
    D: AlertDefinitionRepository,
    I: AlertInstanceRepository,
    NQ: NotificationQueue,
    EP: EventPublisher,
    L: LogMetrics,
    X: ExecutionStore,
    S: ServerStatusProvider,
    J: JobRepository,
{
    pub fn new(
        manager: InstanceService<D, I, NQ, EP>,
        logs: L,
        executions: X,
        servers: S,
        jobs: J,
    ) -> Self {
        Self {
            manager,
            logs,
            executions,
            servers,
            jobs,
        }
    }

    pub fn manager(&self) -> &InstanceService<D, I, NQ, EP> {
        &self.manager
    }

    /// One evaluation sweep. Returns the number of definitions that
    /// produced an instance (throttled triggers do not count).
    ///
    /// Only the initial definition-list fetch propagates; everything after
    /// that is contained per definition.
    pub async fn evaluate_all(
        &self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<u32, AppError> {
        let definitions = self.manager.active_definitions().await?;
        let mut triggered = 0;

        for definition in definitions {
            if cancel.is_cancelled() {
                tracing::debug!("evaluation sweep cancelled");
                break;
            }

            let fired = match self.should_trigger(&definition, now).await {
                Ok(fired) => fired,
                Err(e) => {
                    tracing::warn!(
                        definition_id = %definition.id(),
                        name = definition.name(),
                        error = %e,
                        "definition evaluation failed"
                    );
                    continue;
                }
            };
            if !fired {
                continue;
            }

            let message = trigger_message(&definition);
            match self
                .manager
                .try_trigger(definition.id(), &message, None, None, None, now)
                .await
            {
                Ok(Some(_)) => triggered += 1,
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        definition_id = %definition.id(),
                        error = %e,
                        "trigger failed"
                    );
                }
            }
        }

        Ok(triggered)
    }

    /// Whether the definition's condition currently holds.
    async fn should_trigger(
        &self,
        definition: &AlertDefinition,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        match definition.condition() {
            AlertCondition::ErrorThreshold {
                threshold,
                window_minutes,
                min_level,
            } => {
                let since = now - Duration::minutes(i64::from(*window_minutes));
                let count = self
                    .logs
                    .count_at_or_above(
                        since,
                        *min_level,
                        definition.job_id(),
                        definition.server_name(),
                    )
                    .await?;
                Ok(count >= u64::from(*threshold))
            }

            AlertCondition::JobFailure {
                consecutive_failures,
            } => {
                let job_id = require_job(definition)?;
                let n = (*consecutive_failures).max(1);
                let executions = self.executions.last_executions(job_id, n).await?;
                Ok(executions.len() as u32 >= n
                    && executions
                        .iter()
                        .all(|e| e.status == ExecutionStatus::Failed))
            }

            AlertCondition::ServerOffline => {
                let server = require_server(definition)?;
                let status = self.servers.computed_status(server).await?;
                Ok(status == ServerStatus::Offline)
            }

            AlertCondition::PerformanceWarning {
                max_avg_duration_ms,
                sample_size,
            } => {
                let job_id = require_job(definition)?;
                let n = (*sample_size).max(1);
                let executions = self.executions.last_executions(job_id, n).await?;
                let durations: Vec<i64> =
                    executions.iter().filter_map(|e| e.duration_ms).collect();
                if durations.is_empty() {
                    return Ok(false);
                }
                let avg = durations.iter().sum::<i64>() / durations.len() as i64;
                Ok(avg > *max_avg_duration_ms)
            }

            AlertCondition::CustomQuery {
                query,
                threshold,
                window_minutes,
            } => {
                let since = now - Duration::minutes(i64::from(*window_minutes));
                let count = self.logs.count_for_query(query, since).await?;
                Ok(count >= u64::from(*threshold))
            }

            AlertCondition::PatternMatch {
                pattern,
                threshold,
                window_minutes,
            } => {
                let since = now - Duration::minutes(i64::from(*window_minutes));
                let count = self
                    .logs
                    .count_matching(since, pattern, definition.job_id(), definition.server_name())
                    .await?;
                Ok(count >= u64::from(*threshold))
            }

            AlertCondition::DurationExceeded { max_duration_ms } => {
                let job_id = require_job(definition)?;
                let executions = self.executions.last_executions(job_id, 1).await?;
                let Some(latest) = executions.first() else {
                    return Ok(false);
                };
                if latest.is_overdue(*max_duration_ms, now) {
                    return Ok(true);
                }
                Ok(latest.duration_ms.is_some_and(|d| d > *max_duration_ms))
            }

            AlertCondition::MissedSchedule { grace_minutes } => {
                let job_id = require_job(definition)?;
                let Some(job) = self.jobs.find_by_id(job_id).await? else {
                    return Ok(false);
                };
                if job.schedule.is_none() || !job.is_active {
                    return Ok(false);
                }
                let grace = Duration::minutes(i64::from(*grace_minutes));
                match job.last_execution_at {
                    Some(last) => Ok(now - last > grace),
                    None => Ok(true),
                }
            }
        }
    }
}

fn require_job(definition: &AlertDefinition) -> Result<&str, AppError> {
    definition.job_id().ok_or_else(|| {
        AppError::Misconfigured(format!("{} requires a job scope", definition.name()))
    })
}

fn require_server(definition: &AlertDefinition) -> Result<&str, AppError> {
    definition.server_name().ok_or_else(|| {
        AppError::Misconfigured(format!("{} requires a server scope", definition.name()))
    })
}

fn trigger_message(definition: &AlertDefinition) -> String {
    match definition.condition() {
        AlertCondition::ErrorThreshold {
            threshold,
            window_minutes,
            min_level,
        } => format!(
            "{}: {}+ logs at {} or above in {} minutes",
            definition.name(),
            threshold,
            min_level.as_str(),
            window_minutes
        ),
        AlertCondition::JobFailure {
            consecutive_failures,
        } => format!(
            "{}: last {} execution(s) failed",
            definition.name(),
            consecutive_failures
        ),
        AlertCondition::ServerOffline => {
            format!(
                "{}: server {} is offline",
                definition.name(),
                definition.server_name().unwrap_or("<unscoped>")
            )
        }
        AlertCondition::PerformanceWarning {
            max_avg_duration_ms,
            ..
        } => format!(
            "{}: average duration above {} ms",
            definition.name(),
            max_avg_duration_ms
        ),
        AlertCondition::CustomQuery { query, .. } => {
            format!("{}: query matched: {}", definition.name(), query)
        }
        AlertCondition::PatternMatch { pattern, .. } => {
            format!("{}: pattern matched: {}", definition.name(), pattern)
        }
        AlertCondition::DurationExceeded { max_duration_ms } => format!(
            "{}: execution ran longer than {} ms",
            definition.name(),
            max_duration_ms
        ),
        AlertCondition::MissedSchedule { grace_minutes } => format!(
            "{}: no execution within {} minute grace period",
            definition.name(),
            grace_minutes
        ),
    }
}
