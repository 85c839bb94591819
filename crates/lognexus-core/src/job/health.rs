use chrono::{DateTime, Utc};

use super::{ExecutionStatus, Job};

/// Health score in `[0, 100]` derived from a job's aggregate fields.
///
/// Starts at 100 and applies additive penalties, clamped so no single
/// factor pushes the score negative and good signals cannot cancel out bad
/// ones. Thresholds are deliberately coarse buckets to keep the score
/// stable under noisy data.
pub fn health_score(job: &Job, now: DateTime<Utc>) -> u8 {
    let penalty = last_status_penalty(job)
        + success_rate_penalty(job)
        + staleness_penalty(job, now)
        + failure_volume_penalty(job);
    (100i32 - penalty).clamp(0, 100) as u8
}

fn last_status_penalty(job: &Job) -> i32 {
    match job.last_execution_status {
        Some(ExecutionStatus::Failed) => 40,
        Some(ExecutionStatus::Timeout) => 30,
        Some(ExecutionStatus::Cancelled) => 10,
        _ => 0,
    }
}

fn success_rate_penalty(job: &Job) -> i32 {
    match job.success_rate {
        Some(rate) if rate < 50.0 => 30,
        Some(rate) if rate < 80.0 => 15,
        Some(rate) if rate < 95.0 => 5,
        _ => 0,
    }
}

fn staleness_penalty(job: &Job, now: DateTime<Utc>) -> i32 {
    match job.last_execution_at {
        Some(last) => {
            let hours = (now - last).num_hours();
            if hours > 48 {
                20
            } else if hours > 24 {
                10
            } else {
                0
            }
        }
        // Scheduled but never run is its own signal.
        None if job.schedule.is_some() => 15,
        None => 0,
    }
}

fn failure_volume_penalty(job: &Job) -> i32 {
    if job.failure_count > 10 {
        10
    } else if job.failure_count > 5 {
        5
    } else {
        0
    }
}
