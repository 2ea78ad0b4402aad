use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::metrics::{DoraMetrics, SampleCounts, Statistic};
use crate::providers::azure_devops::{LeadTimeSource, RestoreSource};
use crate::records::ReportWindow;

#[derive(Debug, Serialize)]
pub struct DoraReport {
    pub provider: String,
    pub organization: String,
    pub project: String,
    pub repository: String,
    pub branch: String,
    pub collected_at: DateTime<Utc>,
    pub window: ReportWindow,
    pub statistic: Statistic,
    pub lead_time_source: LeadTimeSource,
    pub restore_source: RestoreSource,
    pub counts: SampleCounts,
    pub metrics: DoraMetrics,
}

impl DoraReport {
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

impl fmt::Display for DoraReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "DORA Metrics for {} branch in {}:",
            self.branch, self.repository
        )?;
        writeln!(f, "Time Period: Last {} days", self.window.days)?;
        writeln!(
            f,
            "Deployment Frequency: {:.2} deployments/day",
            self.metrics.deployment_frequency
        )?;
        writeln!(
            f,
            "Lead Time for Changes: {:.2} hours",
            self.metrics.lead_time_for_changes_hours
        )?;
        writeln!(
            f,
            "Change Failure Rate: {:.2}%",
            self.metrics.change_failure_rate
        )?;
        write!(
            f,
            "Time to Restore: {:.2} hours",
            self.metrics.time_to_restore_hours
        )
    }
}
