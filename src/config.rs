use std::io::{BufRead, Write};

use url::Url;

use crate::auth::Token;
use crate::error::{DoraError, Result};
use crate::metrics::Statistic;
use crate::prompt::Prompter;
use crate::providers::azure_devops::{LeadTimeSource, RestoreSource};

const ORGANIZATION_PROMPT: &str = "Enter your Organization url: ";
const TOKEN_PROMPT: &str = "Enter your Personal Access Token : ";
const PROJECT_PROMPT: &str = "Enter Project name : ";
const REPOSITORY_PROMPT: &str = "Enter Repository name : ";
const BRANCH_PROMPT: &str = "Enter Branch name : ";
const DAYS_PROMPT: &str = "Enter number of days to analyze : ";

/// Values supplied on the command line or through the environment.
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub organization_url: Option<String>,
    pub token: Option<String>,
    pub project: Option<String>,
    pub repository: Option<String>,
    pub branch: Option<String>,
    pub days: Option<u32>,
    pub statistic: Statistic,
    pub lead_time_source: LeadTimeSource,
    pub restore_source: RestoreSource,
}

#[derive(Debug)]
pub struct ReportConfig {
    pub organization_url: Url,
    pub token: Token,
    pub project: String,
    pub repository: String,
    pub branch: String,
    pub days: u32,
    pub statistic: Statistic,
    pub lead_time_source: LeadTimeSource,
    pub restore_source: RestoreSource,
}

impl ReportConfig {
    /// Fills every value missing from `overrides` by prompting, in the order
    /// organization, token, project, repository, branch, days.
    pub fn resolve<R: BufRead, W: Write>(
        overrides: ConfigOverrides,
        prompter: &mut Prompter<R, W>,
    ) -> Result<Self> {
        let organization_url = answer(overrides.organization_url, prompter, ORGANIZATION_PROMPT)?;
        let token = answer(overrides.token, prompter, TOKEN_PROMPT)?;
        let project = answer(overrides.project, prompter, PROJECT_PROMPT)?;
        let repository = answer(overrides.repository, prompter, REPOSITORY_PROMPT)?;
        let branch = answer(overrides.branch, prompter, BRANCH_PROMPT)?;
        let days = match overrides.days {
            Some(0) => {
                return Err(DoraError::Config(
                    "Number of days must be greater than zero".to_string(),
                ))
            }
            Some(days) => days,
            None => prompter.ask_positive_integer(DAYS_PROMPT)?,
        };

        Ok(Self {
            organization_url: parse_organization_url(&organization_url)?,
            token: Token::from(token),
            project,
            repository,
            branch: normalize_branch(&branch)?,
            days,
            statistic: overrides.statistic,
            lead_time_source: overrides.lead_time_source,
            restore_source: overrides.restore_source,
        })
    }
}

fn answer<R: BufRead, W: Write>(
    provided: Option<String>,
    prompter: &mut Prompter<R, W>,
    label: &str,
) -> Result<String> {
    match provided.map(|value| value.trim().to_string()) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => prompter.ask(label),
    }
}

fn parse_organization_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| DoraError::Config(format!("Invalid organization URL '{raw}': {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(DoraError::Config(format!(
            "Organization URL must use http or https: {raw}"
        )));
    }

    Ok(url)
}

/// Accepts both `main` and `refs/heads/main`.
fn normalize_branch(raw: &str) -> Result<String> {
    let branch = raw.trim();
    let branch = branch.strip_prefix("refs/heads/").unwrap_or(branch);

    if branch.is_empty() {
        return Err(DoraError::Config("Branch name must not be empty".to_string()));
    }

    Ok(branch.to_string())
}
