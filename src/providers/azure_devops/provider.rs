use std::collections::hash_map::Entry;
use std::collections::HashMap;

use chrono::Utc;
use clap::ValueEnum;
use log::{debug, info, warn};
use serde::Serialize;
use url::Url;

use super::client::{AzureDevOpsClient, BuildChangeDto, BuildDto, CommitDto, WorkItemDto};
use crate::auth::Token;
use crate::config::ReportConfig;
use crate::error::Result;
use crate::metrics;
use crate::records::{ChangeRecord, DeploymentRecord, IncidentRecord, Outcome, ReportWindow};
use crate::report::DoraReport;

/// Where lead-time samples come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeadTimeSource {
    /// Branch commits, paired with the first successful deployment after them
    #[default]
    Commits,
    /// Changes the platform links to each successful build
    BuildChanges,
}

/// Where time-to-restore samples come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestoreSource {
    /// Failed deployments, restored by the next successful one
    #[default]
    Deployments,
    /// Closed `Bug` work items tagged with the branch name
    WorkItems,
}

pub struct AzureDevOpsProvider {
    client: AzureDevOpsClient,
    project: String,
}

impl AzureDevOpsProvider {
    pub fn new(organization_url: &Url, project: String, token: Token) -> Result<Self> {
        let client = AzureDevOpsClient::new(organization_url, token)?;

        Ok(Self { client, project })
    }

    async fn fetch_deployments(
        &self,
        repository_id: &str,
        branch: &str,
        window: &ReportWindow,
    ) -> Result<Vec<DeploymentRecord>> {
        info!("Fetching completed builds for branch {branch}...");

        let builds = self
            .client
            .fetch_builds(&self.project, repository_id, branch, window)
            .await?;
        let total = builds.len();

        let deployments: Vec<_> = builds.into_iter().filter_map(to_deployment).collect();

        info!(
            "Found {} deployments ({} builds skipped)",
            deployments.len(),
            total - deployments.len()
        );

        Ok(deployments)
    }

    async fn fetch_commit_changes(
        &self,
        repository_id: &str,
        branch: &str,
        window: &ReportWindow,
    ) -> Result<Vec<ChangeRecord>> {
        info!("Fetching commits for branch {branch}...");

        let commits = self
            .client
            .fetch_commits(&self.project, repository_id, branch, window)
            .await?;

        let changes: Vec<_> = commits.into_iter().filter_map(commit_to_change).collect();
        info!("Found {} commits", changes.len());

        Ok(changes)
    }

    async fn fetch_linked_changes(
        &self,
        deployments: &[DeploymentRecord],
    ) -> Result<Vec<ChangeRecord>> {
        let successful: Vec<_> = deployments.iter().filter(|d| d.is_success()).collect();
        info!("Fetching changes for {} successful builds...", successful.len());

        let mut changes = Vec::new();
        for deployment in successful {
            let build_changes = self
                .client
                .fetch_build_changes(&self.project, deployment.id)
                .await?;

            debug!("Build {}: {} changes", deployment.id, build_changes.len());
            changes.extend(
                build_changes
                    .into_iter()
                    .filter_map(|change| linked_change(change, deployment)),
            );
        }

        let changes = earliest_deployment_per_change(changes);
        info!("Found {} changes linked to builds", changes.len());

        Ok(changes)
    }

    async fn fetch_incidents(
        &self,
        branch: &str,
        window: &ReportWindow,
    ) -> Result<Vec<IncidentRecord>> {
        info!("Fetching closed bugs tagged {branch}...");

        let work_items = self
            .client
            .query_work_items(&self.project, branch, window)
            .await?;

        let incidents: Vec<_> = work_items.into_iter().filter_map(to_incident).collect();
        info!("Found {} incidents", incidents.len());

        Ok(incidents)
    }

    pub async fn collect_report(
        &self,
        config: &ReportConfig,
        window: &ReportWindow,
    ) -> Result<DoraReport> {
        info!(
            "Collecting DORA metrics for {}/{} on branch {}",
            self.project, config.repository, config.branch
        );

        let repository = self
            .client
            .find_repository(&self.project, &config.repository)
            .await?;
        debug!("Repository {} resolved to {}", repository.name, repository.id);

        let deployments = self
            .fetch_deployments(&repository.id, &config.branch, window)
            .await?;

        if deployments.is_empty() {
            warn!(
                "No deployments found for branch {} in the last {} days",
                config.branch, window.days
            );
        }

        let changes = match config.lead_time_source {
            LeadTimeSource::Commits => {
                self.fetch_commit_changes(&repository.id, &config.branch, window)
                    .await?
            }
            LeadTimeSource::BuildChanges => self.fetch_linked_changes(&deployments).await?,
        };

        let incidents = match config.restore_source {
            RestoreSource::Deployments => None,
            RestoreSource::WorkItems => Some(self.fetch_incidents(&config.branch, window).await?),
        };

        let aggregation = metrics::aggregate(
            &deployments,
            &changes,
            incidents.as_deref(),
            window,
            config.statistic,
        );

        Ok(DoraReport {
            provider: "Azure DevOps".to_string(),
            organization: config.organization_url.to_string(),
            project: self.project.clone(),
            repository: repository.name,
            branch: config.branch.clone(),
            collected_at: Utc::now(),
            window: *window,
            statistic: config.statistic,
            lead_time_source: config.lead_time_source,
            restore_source: config.restore_source,
            counts: aggregation.counts,
            metrics: aggregation.metrics,
        })
    }
}

fn parse_outcome(result: &str) -> Option<Outcome> {
    match result {
        "succeeded" | "partiallySucceeded" => Some(Outcome::Success),
        "failed" => Some(Outcome::Failure),
        _ => None,
    }
}

fn to_deployment(build: BuildDto) -> Option<DeploymentRecord> {
    let Some(finished_at) = build.finish_time else {
        debug!("Skipping build {}: no finish time", build.id);
        return None;
    };

    let Some(outcome) = build.result.as_deref().and_then(parse_outcome) else {
        debug!("Skipping build {}: result {:?}", build.id, build.result);
        return None;
    };

    Some(DeploymentRecord {
        id: build.id,
        finished_at,
        outcome,
    })
}

fn commit_to_change(commit: CommitDto) -> Option<ChangeRecord> {
    let Some(committed_at) = commit.committed_at() else {
        debug!("Skipping commit {}: no date", commit.commit_id);
        return None;
    };

    Some(ChangeRecord {
        id: commit.commit_id,
        committed_at,
        deployed_at: None,
    })
}

fn linked_change(change: BuildChangeDto, deployment: &DeploymentRecord) -> Option<ChangeRecord> {
    Some(ChangeRecord {
        committed_at: change.timestamp?,
        id: change.id,
        deployed_at: Some(deployment.finished_at),
    })
}

fn to_incident(work_item: WorkItemDto) -> Option<IncidentRecord> {
    let (Some(opened_at), Some(restored_at)) =
        (work_item.fields.created_date, work_item.fields.changed_date)
    else {
        debug!("Skipping work item {}: missing dates", work_item.id);
        return None;
    };

    Some(IncidentRecord {
        id: work_item.id,
        opened_at,
        restored_at,
    })
}

/// A rebuilt commit is linked to every run that built it; only the first one
/// brought it to production.
fn earliest_deployment_per_change(changes: Vec<ChangeRecord>) -> Vec<ChangeRecord> {
    let mut earliest: HashMap<String, ChangeRecord> = HashMap::new();

    for change in changes {
        match earliest.entry(change.id.clone()) {
            Entry::Occupied(mut entry) => {
                if change.deployed_at < entry.get().deployed_at {
                    entry.insert(change);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(change);
            }
        }
    }

    let mut changes: Vec<_> = earliest.into_values().collect();
    changes.sort_by_key(|c| c.committed_at);
    changes
}
