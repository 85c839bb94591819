use chrono::{DateTime, Utc};

use lognexus_core::job::{health_score, Job};
use lognexus_ports::outbound::JobRepository;

use crate::error::AppError;

/// Job health queries over the pure scorer in `lognexus-core`.
pub struct JobHealthService<J>
where
    J: JobRepository,
{
    jobs: J,
}

impl<J> JobHealthService<J>
where
    J: JobRepository,
{
    pub fn new(jobs: J) -> Self {
        Self { jobs }
    }

    pub async fn score(&self, job_id: &str, now: DateTime<Utc>) -> Result<Option<u8>, AppError> {
        Ok(self
            .jobs
            .find_by_id(job_id)
            .await?
            .map(|job| health_score(&job, now)))
    }

    /// Active jobs scoring below `threshold`, worst first.
    pub async fn unhealthy_jobs(
        &self,
        threshold: u8,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Job, u8)>, AppError> {
        let mut scored: Vec<(Job, u8)> = self
            .jobs
            .list_active()
            .await?
            .into_iter()
            .map(|job| {
                let score = health_score(&job, now);
                (job, score)
            })
            .filter(|(_, score)| *score < threshold)
            .collect();
        scored.sort_by_key(|(_, score)| *score);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{make_job, now, MockJobRepo};
    use chrono::Duration;
    use lognexus_core::job::ExecutionStatus;

    fn make_service() -> JobHealthService<MockJobRepo> {
        JobHealthService::new(MockJobRepo::default())
    }

    #[tokio::test]
    async fn score_for_missing_job_is_none() {
        let svc = make_service();
        assert!(svc.score("ghost", now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unhealthy_listing_sorts_worst_first() {
        let svc = make_service();

        let healthy = make_job("healthy");
        let mut shaky = make_job("shaky");
        shaky.success_rate = Some(70.0); // score 85
        let mut broken = make_job("broken");
        broken.last_execution_status = Some(ExecutionStatus::Failed);
        broken.success_rate = Some(40.0);
        broken.last_execution_at = Some(now() - Duration::hours(50));
        broken.failure_count = 12; // score 0

        svc.jobs.insert(healthy);
        svc.jobs.insert(shaky);
        svc.jobs.insert(broken);

        let unhealthy = svc.unhealthy_jobs(90, now()).await.unwrap();
        assert_eq!(unhealthy.len(), 2);
        assert_eq!(unhealthy[0].0.job_id, "broken");
        assert_eq!(unhealthy[0].1, 0);
        assert_eq!(unhealthy[1].0.job_id, "shaky");
        assert_eq!(unhealthy[1].1, 85);
    }

    #[tokio::test]
    async fn inactive_jobs_are_excluded() {
        let svc = make_service();
        let mut job = make_job("retired");
        job.is_active = false;
        job.last_execution_status = Some(ExecutionStatus::Failed);
        svc.jobs.insert(job);

        let unhealthy = svc.unhealthy_jobs(100, now()).await.unwrap();
        assert!(unhealthy.is_empty());
    }
}
