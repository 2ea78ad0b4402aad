use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

use crate::records::{ChangeRecord, DeploymentRecord, IncidentRecord, ReportWindow};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// How per-sample durations are folded into a single lead time / restore time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    #[default]
    Mean,
    Median,
}

impl Statistic {
    pub fn apply(self, samples: &[f64]) -> f64 {
        match self {
            Self::Mean => mean(samples),
            Self::Median => median(samples),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoraMetrics {
    /// Deployments per day
    pub deployment_frequency: f64,
    pub lead_time_for_changes_hours: f64,
    /// Percentage in `[0, 100]`
    pub change_failure_rate: f64,
    pub time_to_restore_hours: f64,
}

/// Sample sizes behind each metric.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SampleCounts {
    pub deployments: usize,
    pub failed_deployments: usize,
    pub changes: usize,
    pub matched_changes: usize,
    pub restores: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    pub metrics: DoraMetrics,
    pub counts: SampleCounts,
}

/// Computes the four DORA metrics from the records that fall inside `window`.
///
/// Records may arrive in any order. Anything outside the window is ignored,
/// even if the caller already filtered.
///
/// Time to restore pairs each failed deployment with the next success, unless
/// `incidents` is given, in which case each incident closed inside the window
/// contributes `restored_at - opened_at`.
pub fn aggregate(
    deployments: &[DeploymentRecord],
    changes: &[ChangeRecord],
    incidents: Option<&[IncidentRecord]>,
    window: &ReportWindow,
    statistic: Statistic,
) -> Aggregation {
    let mut deployments: Vec<&DeploymentRecord> = deployments
        .iter()
        .filter(|d| window.contains(d.finished_at))
        .collect();
    deployments.sort_by_key(|d| d.finished_at);

    let changes: Vec<&ChangeRecord> = changes
        .iter()
        .filter(|c| window.contains(c.committed_at))
        .collect();

    // Inherits the ordering of `deployments`
    let successes: Vec<DateTime<Utc>> = deployments
        .iter()
        .filter(|d| d.is_success())
        .map(|d| d.finished_at)
        .collect();

    let failed_deployments = deployments.iter().filter(|d| d.is_failure()).count();
    let lead_times = lead_times_hours(&changes, &successes);
    let restore_times = match incidents {
        Some(incidents) => incident_restore_times_hours(incidents, window),
        None => restore_times_hours(&deployments, &successes),
    };

    Aggregation {
        metrics: DoraMetrics {
            deployment_frequency: deployment_frequency(deployments.len(), window.days),
            lead_time_for_changes_hours: statistic.apply(&lead_times),
            change_failure_rate: change_failure_rate(failed_deployments, deployments.len()),
            time_to_restore_hours: statistic.apply(&restore_times),
        },
        counts: SampleCounts {
            deployments: deployments.len(),
            failed_deployments,
            changes: changes.len(),
            matched_changes: lead_times.len(),
            restores: restore_times.len(),
        },
    }
}

pub fn deployment_frequency(deployments: usize, days: u32) -> f64 {
    if days == 0 {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let frequency = deployments as f64 / f64::from(days);
    frequency
}

pub fn change_failure_rate(failed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let rate = (failed as f64 / total as f64) * 100.0;
    rate
}

fn lead_times_hours(changes: &[&ChangeRecord], successes: &[DateTime<Utc>]) -> Vec<f64> {
    changes
        .iter()
        .filter_map(|change| {
            let deployed_at = match change.deployed_at {
                Some(deployed_at) => deployed_at,
                None => first_at_or_after(successes, change.committed_at)?,
            };

            (deployed_at >= change.committed_at)
                .then(|| hours_between(change.committed_at, deployed_at))
        })
        .collect()
}

fn restore_times_hours(
    deployments: &[&DeploymentRecord],
    successes: &[DateTime<Utc>],
) -> Vec<f64> {
    deployments
        .iter()
        .filter(|d| d.is_failure())
        .filter_map(|failure| {
            first_after(successes, failure.finished_at)
                .map(|restored_at| hours_between(failure.finished_at, restored_at))
        })
        .collect()
}

fn incident_restore_times_hours(incidents: &[IncidentRecord], window: &ReportWindow) -> Vec<f64> {
    incidents
        .iter()
        .filter(|incident| window.contains(incident.restored_at))
        .filter(|incident| incident.restored_at >= incident.opened_at)
        .map(|incident| hours_between(incident.opened_at, incident.restored_at))
        .collect()
}

fn first_at_or_after(sorted: &[DateTime<Utc>], at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let idx = sorted.partition_point(|t| *t < at);
    sorted.get(idx).copied()
}

fn first_after(sorted: &[DateTime<Utc>], at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let idx = sorted.partition_point(|t| *t <= at);
    sorted.get(idx).copied()
}

fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let hours = (end - start).num_milliseconds() as f64 / MILLIS_PER_HOUR;
    hours
}

fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let avg = samples.iter().sum::<f64>() / samples.len() as f64;
    avg
}

fn median(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
