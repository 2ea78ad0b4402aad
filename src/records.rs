use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::{DoraError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// A completed build/release run on the analyzed branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRecord {
    pub id: u64,
    pub finished_at: DateTime<Utc>,
    pub outcome: Outcome,
}

impl DeploymentRecord {
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    pub fn is_failure(&self) -> bool {
        self.outcome == Outcome::Failure
    }
}

/// A commit on the analyzed branch.
///
/// `deployed_at` is only known up front when the platform itself links the
/// change to a run; otherwise the aggregator pairs it with a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub id: String,
    pub committed_at: DateTime<Utc>,
    pub deployed_at: Option<DateTime<Utc>>,
}

/// A closed incident tracked outside the pipeline (a `Bug` work item).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentRecord {
    pub id: u64,
    pub opened_at: DateTime<Utc>,
    pub restored_at: DateTime<Utc>,
}

/// Inclusive `[start, end]` lookback range ending at the time of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub days: u32,
}

impl ReportWindow {
    pub fn last_days(days: u32, now: DateTime<Utc>) -> Result<Self> {
        if days == 0 {
            return Err(DoraError::Config(
                "Number of days must be greater than zero".to_string(),
            ));
        }

        let start = now
            .checked_sub_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| {
                DoraError::Config(format!("Number of days is too large: {days}"))
            })?;

        Ok(Self {
            start,
            end: now,
            days,
        })
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}
