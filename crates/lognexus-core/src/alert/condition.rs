use serde::{Deserialize, Serialize};

use crate::log::LogLevel;

/// Discriminant for an alert rule's condition, mirrored by one
/// [`AlertCondition`] variant each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertType {
    ErrorThreshold,
    JobFailure,
    ServerOffline,
    PerformanceWarning,
    CustomQuery,
    PatternMatch,
    DurationExceeded,
    MissedSchedule,
}

/// Strongly-typed condition payload for an alert definition.
///
/// The source system stored this as an opaque serialized blob parsed per
/// alert type at evaluation time; here each type carries its own fields so
/// an unsupported combination cannot exist and the evaluator's dispatch is
/// an exhaustive match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AlertCondition {
    /// Log count at or above `min_level` in the trailing window reaches
    /// `threshold`.
    ErrorThreshold {
        threshold: u32,
        window_minutes: u32,
        #[serde(default = "default_min_level")]
        min_level: LogLevel,
    },
    /// The scoped job's most recent `consecutive_failures` executions all
    /// ended in failure.
    JobFailure { consecutive_failures: u32 },
    /// The scoped server's computed status is Offline.
    ServerOffline,
    /// Mean duration of the last `sample_size` completed executions exceeds
    /// `max_avg_duration_ms`.
    PerformanceWarning {
        max_avg_duration_ms: i64,
        sample_size: u32,
    },
    /// Store-evaluated query; triggers when the match count in the trailing
    /// window reaches `threshold`.
    CustomQuery {
        query: String,
        threshold: u32,
        window_minutes: u32,
    },
    /// Log messages matching `pattern` in the trailing window reach
    /// `threshold`.
    PatternMatch {
        pattern: String,
        threshold: u32,
        window_minutes: u32,
    },
    /// The scoped job's most recent execution ran, or has been running,
    /// longer than `max_duration_ms`.
    DurationExceeded { max_duration_ms: i64 },
    /// The scoped job has a schedule but has not started an execution
    /// within the grace period.
    MissedSchedule { grace_minutes: u32 },
}

fn default_min_level() -> LogLevel {
    LogLevel::Error
}

impl AlertCondition {
    pub fn alert_type(&self) -> AlertType {
        match self {
            Self::ErrorThreshold { .. } => AlertType::ErrorThreshold,
            Self::JobFailure { .. } => AlertType::JobFailure,
            Self::ServerOffline => AlertType::ServerOffline,
            Self::PerformanceWarning { .. } => AlertType::PerformanceWarning,
            Self::CustomQuery { .. } => AlertType::CustomQuery,
            Self::PatternMatch { .. } => AlertType::PatternMatch,
            Self::DurationExceeded { .. } => AlertType::DurationExceeded,
            Self::MissedSchedule { .. } => AlertType::MissedSchedule,
        }
    }
}
