use anyhow::Result;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use log::info;
use std::path::PathBuf;

use crate::config::{ConfigOverrides, ReportConfig};
use crate::metrics::Statistic;
use crate::prompt::Prompter;
use crate::providers::azure_devops::{AzureDevOpsProvider, LeadTimeSource, RestoreSource};
use crate::records::ReportWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Any of the connection and repository options left out is asked for interactively.
#[derive(Parser)]
#[command(name = "dora-report")]
#[command(author, version, about = "DORA metrics for an Azure DevOps branch", long_about = None)]
pub struct Cli {
    /// Organization URL (e.g., "https://dev.azure.com/contoso")
    #[arg(short = 'u', long, env = "AZURE_DEVOPS_ORG_URL")]
    organization_url: Option<String>,

    /// Personal access token
    #[arg(short, long, env = "AZURE_DEVOPS_PAT", hide_env_values = true)]
    token: Option<String>,

    /// Project name
    #[arg(short = 'P', long, env = "AZURE_DEVOPS_PROJECT")]
    project: Option<String>,

    /// Repository name
    #[arg(short, long)]
    repository: Option<String>,

    /// Branch name
    #[arg(short, long)]
    branch: Option<String>,

    /// Number of days to analyze
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    days: Option<u32>,

    /// How lead time and time to restore samples are averaged
    #[arg(short, long, value_enum, default_value_t = Statistic::Mean)]
    statistic: Statistic,

    /// Where lead time samples come from
    #[arg(short, long, value_enum, default_value_t = LeadTimeSource::Commits)]
    lead_time_source: LeadTimeSource,

    /// Where time to restore samples come from
    #[arg(short = 'R', long, value_enum, default_value_t = RestoreSource::Deployments)]
    restore_source: RestoreSource,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Output file path (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty print JSON output
    #[arg(short, long, default_value_t = false)]
    pretty: bool,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let overrides = ConfigOverrides {
            organization_url: self.organization_url,
            token: self.token,
            project: self.project,
            repository: self.repository,
            branch: self.branch,
            days: self.days,
            statistic: self.statistic,
            lead_time_source: self.lead_time_source,
            restore_source: self.restore_source,
        };
        let config = ReportConfig::resolve(overrides, &mut Prompter::stdio())?;
        let window = ReportWindow::last_days(config.days, Utc::now())?;

        info!(
            "Analyzing {} to {} ({} days)",
            window.start, window.end, window.days
        );

        let provider = AzureDevOpsProvider::new(
            &config.organization_url,
            config.project.clone(),
            config.token.clone(),
        )?;
        let report = provider.collect_report(&config, &window).await?;

        let rendered = match self.format {
            OutputFormat::Text => report.to_string(),
            OutputFormat::Json => report.to_json(self.pretty)?,
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, format!("{rendered}\n"))?;
            info!("Report written to: {}", output_path.display());
        } else {
            println!("{rendered}");
        }

        Ok(())
    }
}
