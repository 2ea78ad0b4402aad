use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::Token;
use crate::error::{DoraError, Result};
use crate::records::ReportWindow;

const API_VERSION: &str = "7.0";
const CONTINUATION_HEADER: &str = "x-ms-continuationtoken";
const PAGE_SIZE: usize = 100;
/// Upper bound on `ids` accepted by the work items batch endpoint
const WORK_ITEM_BATCH_SIZE: usize = 200;
const WORK_ITEM_FIELDS: &str = "System.Id,System.CreatedDate,System.ChangedDate";

/// Envelope used by every Azure DevOps list endpoint.
#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryDto {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDto {
    pub id: u64,
    pub result: Option<String>,
    pub finish_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitDto {
    pub commit_id: String,
    pub author: Option<GitUserDateDto>,
    pub committer: Option<GitUserDateDto>,
}

#[derive(Debug, Deserialize)]
pub struct GitUserDateDto {
    pub date: Option<DateTime<Utc>>,
}

/// A change (commit) linked to a build.
#[derive(Debug, Deserialize)]
pub struct BuildChangeDto {
    pub id: String,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct WiqlRequest {
    query: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WiqlResponse {
    #[serde(default)]
    work_items: Vec<WorkItemReference>,
}

#[derive(Debug, Deserialize)]
struct WorkItemReference {
    id: u64,
}

#[derive(Debug, Deserialize)]
pub struct WorkItemDto {
    pub id: u64,
    pub fields: WorkItemFieldsDto,
}

#[derive(Debug, Deserialize)]
pub struct WorkItemFieldsDto {
    #[serde(rename = "System.CreatedDate")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(rename = "System.ChangedDate")]
    pub changed_date: Option<DateTime<Utc>>,
}

impl CommitDto {
    /// Committer date, falling back to the author date.
    pub fn committed_at(&self) -> Option<DateTime<Utc>> {
        self.committer
            .as_ref()
            .and_then(|c| c.date)
            .or_else(|| self.author.as_ref().and_then(|a| a.date))
    }
}

pub struct AzureDevOpsClient {
    client: Client,
    organization_url: Url,
    token: Token,
    page_size: usize,
}

impl AzureDevOpsClient {
    pub fn new(organization_url: &Url, token: Token) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("dora-report/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DoraError::Config(format!("Failed to create HTTP client: {e}")))?;

        if organization_url.cannot_be_a_base() {
            return Err(DoraError::Config(format!(
                "Invalid organization URL: {organization_url}"
            )));
        }

        Ok(Self {
            client,
            organization_url: organization_url.clone(),
            token,
            page_size: PAGE_SIZE,
        })
    }

    #[cfg(test)]
    fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// PATs go in as the password of an empty-user basic auth header
    fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .basic_auth("", Some(self.token.as_str()))
            .query(&[("api-version", API_VERSION)])
    }

    /// `{organization}/{project}/_apis/{segments...}`
    fn api_url(&self, project: &str, segments: &[&str]) -> Result<Url> {
        let mut url = self.organization_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                DoraError::Config(format!(
                    "Invalid organization URL: {}",
                    self.organization_url
                ))
            })?
            .pop_if_empty()
            .push(project)
            .push("_apis")
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.auth_request(request).send().await?;
        let status = response.status();

        // Azure DevOps answers a rejected PAT with a 203 sign-in page
        if status == StatusCode::NON_AUTHORITATIVE_INFORMATION {
            return Err(DoraError::Api(format!(
                "{status} - authentication failed, check the personal access token"
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DoraError::Api(format!("{status} - {body}")));
        }

        Ok(response)
    }

    /// Follows `x-ms-continuationtoken` until the server stops returning one.
    async fn fetch_continued<T: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut continuation: Option<String> = None;
        let mut page = 1;

        loop {
            let mut request = self
                .client
                .get(url.clone())
                .query(query)
                .query(&[("$top", self.page_size)]);
            if let Some(token) = &continuation {
                request = request.query(&[("continuationToken", token)]);
            }

            let response = self.send(request).await?;
            let next = continuation_token(&response);
            let body = response.json::<ListResponse<T>>().await?;

            debug!(
                "{} page {page}: {} items (total: {})",
                url.path(),
                body.value.len(),
                items.len() + body.value.len()
            );
            items.extend(body.value);

            match next {
                Some(token) => continuation = Some(token),
                None => break,
            }
            page += 1;
        }

        Ok(items)
    }

    /// Looks a repository up by name, ignoring case.
    pub async fn find_repository(&self, project: &str, name: &str) -> Result<RepositoryDto> {
        let url = self.api_url(project, &["git", "repositories"])?;
        let response = self.send(self.client.get(url)).await?;
        let repositories = response.json::<ListResponse<RepositoryDto>>().await?;

        let wanted = name.to_lowercase();
        repositories
            .value
            .into_iter()
            .find(|repo| repo.name.to_lowercase() == wanted)
            .ok_or_else(|| DoraError::RepositoryNotFound {
                project: project.to_string(),
                repository: name.to_string(),
            })
    }

    /// Completed builds of `branch` that finished within `window`.
    pub async fn fetch_builds(
        &self,
        project: &str,
        repository_id: &str,
        branch: &str,
        window: &ReportWindow,
    ) -> Result<Vec<BuildDto>> {
        let url = self.api_url(project, &["build", "builds"])?;
        let branch_ref = format!("refs/heads/{branch}");
        let min_time = format_time(window.start);
        let max_time = format_time(window.end);

        self.fetch_continued(
            &url,
            &[
                ("repositoryId", repository_id),
                ("repositoryType", "TfsGit"),
                ("branchName", branch_ref.as_str()),
                ("statusFilter", "completed"),
                ("minTime", min_time.as_str()),
                ("maxTime", max_time.as_str()),
                ("queryOrder", "finishTimeAscending"),
            ],
        )
        .await
    }

    /// Changes the platform associates with a single build.
    pub async fn fetch_build_changes(
        &self,
        project: &str,
        build_id: u64,
    ) -> Result<Vec<BuildChangeDto>> {
        let build_id = build_id.to_string();
        let url = self.api_url(project, &["build", "builds", build_id.as_str(), "changes"])?;

        self.fetch_continued(&url, &[]).await
    }

    /// Commits reachable from `branch` within `window`, paged with `$skip`.
    pub async fn fetch_commits(
        &self,
        project: &str,
        repository_id: &str,
        branch: &str,
        window: &ReportWindow,
    ) -> Result<Vec<CommitDto>> {
        let url = self.api_url(project, &["git", "repositories", repository_id, "commits"])?;
        let from_date = format_time(window.start);
        let to_date = format_time(window.end);

        let mut commits = Vec::new();
        let mut skip = 0;

        loop {
            let request = self
                .client
                .get(url.clone())
                .query(&[
                    ("searchCriteria.itemVersion.version", branch),
                    ("searchCriteria.itemVersion.versionType", "branch"),
                    ("searchCriteria.fromDate", from_date.as_str()),
                    ("searchCriteria.toDate", to_date.as_str()),
                ])
                .query(&[
                    ("searchCriteria.$top", self.page_size),
                    ("searchCriteria.$skip", skip),
                ]);

            let response = self.send(request).await?;
            let page = response.json::<ListResponse<CommitDto>>().await?;
            let fetched = page.value.len();
            commits.extend(page.value);

            debug!("Commits skip {skip}: {fetched} items (total: {})", commits.len());

            if fetched < self.page_size {
                break;
            }
            skip += fetched;
        }

        Ok(commits)
    }

    /// Runs the restore WIQL query, then loads the matching work items in batches.
    pub async fn query_work_items(
        &self,
        project: &str,
        branch: &str,
        window: &ReportWindow,
    ) -> Result<Vec<WorkItemDto>> {
        let wiql_url = self.api_url(project, &["wit", "wiql"])?;
        let request = self.client.post(wiql_url).json(&WiqlRequest {
            query: restore_wiql(project, branch, window),
        });

        let response = self.send(request).await?;
        let ids: Vec<String> = response
            .json::<WiqlResponse>()
            .await?
            .work_items
            .into_iter()
            .map(|item| item.id.to_string())
            .collect();

        debug!("WIQL matched {} work items", ids.len());

        let items_url = self.api_url(project, &["wit", "workitems"])?;
        let mut work_items = Vec::with_capacity(ids.len());

        for batch in ids.chunks(WORK_ITEM_BATCH_SIZE) {
            let joined = batch.join(",");
            let request = self.client.get(items_url.clone()).query(&[
                ("ids", joined.as_str()),
                ("fields", WORK_ITEM_FIELDS),
                ("errorPolicy", "omit"),
            ]);

            let response = self.send(request).await?;
            // Deleted or inaccessible items come back as null with errorPolicy=omit
            let page = response.json::<ListResponse<Option<WorkItemDto>>>().await?;
            work_items.extend(page.value.into_iter().flatten());
        }

        Ok(work_items)
    }
}

/// Closed bugs tagged with the branch name whose last change falls in the window.
fn restore_wiql(project: &str, branch: &str, window: &ReportWindow) -> String {
    format!(
        "SELECT [System.Id] FROM WorkItems \
         WHERE [System.TeamProject] = '{}' \
         AND [System.WorkItemType] = 'Bug' \
         AND [System.State] = 'Closed' \
         AND [System.ChangedDate] >= '{}' \
         AND [System.ChangedDate] <= '{}' \
         AND [System.Tags] CONTAINS '{}' \
         ORDER BY [System.ChangedDate] DESC",
        wiql_literal(project),
        window.start.format("%Y-%m-%d"),
        window.end.format("%Y-%m-%d"),
        wiql_literal(branch),
    )
}

fn wiql_literal(value: &str) -> String {
    value.replace('\'', "''")
}

fn continuation_token(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTINUATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

fn format_time(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::{Matcher, Server};

    // base64(":pat")
    const AUTH_HEADER: &str = "Basic OnBhdA==";

    fn window() -> ReportWindow {
        ReportWindow::last_days(7, Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap()).unwrap()
    }

    fn client(server: &Server) -> AzureDevOpsClient {
        let url = Url::parse(&format!("{}/contoso", server.url())).unwrap();
        AzureDevOpsClient::new(&url, Token::from("pat")).unwrap()
    }

    #[test]
    fn test_api_url_encodes_segments() {
        let url = Url::parse("https://dev.azure.com/contoso/").unwrap();
        let client = AzureDevOpsClient::new(&url, Token::from("pat")).unwrap();

        let api_url = client
            .api_url("My Project", &["git", "repositories"])
            .unwrap();

        assert_eq!(
            api_url.as_str(),
            "https://dev.azure.com/contoso/My%20Project/_apis/git/repositories"
        );
    }

    #[test]
    fn test_new_rejects_non_hierarchical_url() {
        let url = Url::parse("mailto:someone@example.com").unwrap();

        assert!(AzureDevOpsClient::new(&url, Token::from("pat")).is_err());
    }

    #[test]
    fn test_commit_date_falls_back_to_author() {
        let commit: CommitDto = serde_json::from_str(
            r#"{"commitId":"abc","author":{"date":"2024-06-10T08:00:00Z"}}"#,
        )
        .unwrap();

        assert_eq!(
            commit.committed_at(),
            Some(Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_find_repository_ignores_case() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/contoso/Fabrikam/_apis/git/repositories")
            .match_header("authorization", AUTH_HEADER)
            .match_query(Matcher::UrlEncoded("api-version".into(), "7.0".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"count":2,"value":[
                    {"id":"repo-1","name":"Tools"},
                    {"id":"repo-2","name":"WebShop"}
                ]}"#,
            )
            .create_async()
            .await;

        let repo = client(&server)
            .find_repository("Fabrikam", "webshop")
            .await
            .unwrap();

        assert_eq!(repo.id, "repo-2");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_find_repository_reports_missing_repository() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/contoso/Fabrikam/_apis/git/repositories")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"count":0,"value":[]}"#)
            .create_async()
            .await;

        let err = client(&server)
            .find_repository("Fabrikam", "missing")
            .await
            .unwrap_err();

        assert!(matches!(err, DoraError::RepositoryNotFound { .. }));
    }

    #[tokio::test]
    async fn test_fetch_builds_sends_branch_and_window_filters() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/contoso/Fabrikam/_apis/build/builds")
            .match_header("authorization", AUTH_HEADER)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("repositoryId".into(), "repo-2".into()),
                Matcher::UrlEncoded("branchName".into(), "refs/heads/main".into()),
                Matcher::UrlEncoded("statusFilter".into(), "completed".into()),
                Matcher::UrlEncoded("minTime".into(), "2024-06-08T00:00:00Z".into()),
                Matcher::UrlEncoded("maxTime".into(), "2024-06-15T00:00:00Z".into()),
                Matcher::UrlEncoded("queryOrder".into(), "finishTimeAscending".into()),
                Matcher::UrlEncoded("$top".into(), "100".into()),
                Matcher::UrlEncoded("api-version".into(), "7.0".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"count":2,"value":[
                    {"id":11,"status":"completed","result":"succeeded","finishTime":"2024-06-09T10:00:00.1234567Z"},
                    {"id":12,"status":"completed","result":"failed","finishTime":"2024-06-10T10:00:00Z"}
                ]}"#,
            )
            .create_async()
            .await;

        let builds = client(&server)
            .fetch_builds("Fabrikam", "repo-2", "main", &window())
            .await
            .unwrap();

        assert_eq!(builds.len(), 2);
        assert_eq!(builds[0].id, 11);
        assert_eq!(builds[1].result.as_deref(), Some("failed"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_builds_follows_continuation_token() {
        let mut server = Server::new_async().await;
        let path = "/contoso/Fabrikam/_apis/build/builds";
        let first = server
            .mock("GET", path)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("branchName".into(), "refs/heads/main".into()),
                Matcher::UrlEncoded("$top".into(), "2".into()),
            ]))
            .with_status(200)
            .with_header("x-ms-continuationtoken", "builds-page-2")
            .with_body(
                r#"{"count":2,"value":[
                    {"id":1,"result":"succeeded","finishTime":"2024-06-09T10:00:00Z"},
                    {"id":2,"result":"failed","finishTime":"2024-06-10T10:00:00Z"}
                ]}"#,
            )
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", path)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("branchName".into(), "refs/heads/main".into()),
                Matcher::UrlEncoded("continuationToken".into(), "builds-page-2".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"count":1,"value":[{"id":3,"result":"succeeded","finishTime":"2024-06-11T10:00:00Z"}]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let builds = client(&server)
            .with_page_size(2)
            .fetch_builds("Fabrikam", "repo-2", "main", &window())
            .await
            .unwrap();

        let ids: Vec<_> = builds.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_build_changes_follows_continuation_token() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/contoso/Fabrikam/_apis/build/builds/11/changes")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("x-ms-continuationtoken", "next-page")
            .with_body(r#"{"count":1,"value":[{"id":"c1","timestamp":"2024-06-09T06:00:00Z"}]}"#)
            .expect(1)
            .create_async()
            .await;
        // Created last so it takes the follow-up request carrying the token
        let second = server
            .mock("GET", "/contoso/Fabrikam/_apis/build/builds/11/changes")
            .match_query(Matcher::UrlEncoded(
                "continuationToken".into(),
                "next-page".into(),
            ))
            .with_status(200)
            .with_body(r#"{"count":1,"value":[{"id":"c2","timestamp":"2024-06-09T07:00:00Z"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let changes = client(&server)
            .fetch_build_changes("Fabrikam", 11)
            .await
            .unwrap();

        let ids: Vec<_> = changes.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_commits_pages_with_skip() {
        let mut server = Server::new_async().await;
        let path = "/contoso/Fabrikam/_apis/git/repositories/repo-2/commits";
        let first = server
            .mock("GET", path)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("searchCriteria.itemVersion.version".into(), "main".into()),
                Matcher::UrlEncoded("searchCriteria.$top".into(), "2".into()),
                Matcher::UrlEncoded("searchCriteria.$skip".into(), "0".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"count":2,"value":[
                    {"commitId":"a","committer":{"date":"2024-06-09T06:00:00Z"}},
                    {"commitId":"b","committer":{"date":"2024-06-09T05:00:00Z"}}
                ]}"#,
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", path)
            .match_query(Matcher::UrlEncoded("searchCriteria.$skip".into(), "2".into()))
            .with_status(200)
            .with_body(
                r#"{"count":1,"value":[{"commitId":"c","committer":{"date":"2024-06-09T04:00:00Z"}}]}"#,
            )
            .create_async()
            .await;

        let commits = client(&server)
            .with_page_size(2)
            .fetch_commits("Fabrikam", "repo-2", "main", &window())
            .await
            .unwrap();

        let ids: Vec<_> = commits.iter().map(|c| c.commit_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[test]
    fn test_restore_wiql_filters_closed_bugs_in_window() {
        let query = restore_wiql("O'Brien Labs", "main", &window());

        assert!(query.contains("[System.TeamProject] = 'O''Brien Labs'"));
        assert!(query.contains("[System.WorkItemType] = 'Bug'"));
        assert!(query.contains("[System.State] = 'Closed'"));
        assert!(query.contains("[System.ChangedDate] >= '2024-06-08'"));
        assert!(query.contains("[System.ChangedDate] <= '2024-06-15'"));
        assert!(query.contains("[System.Tags] CONTAINS 'main'"));
    }

    #[tokio::test]
    async fn test_query_work_items_runs_wiql_then_loads_items() {
        let mut server = Server::new_async().await;
        let wiql = server
            .mock("POST", "/contoso/Fabrikam/_apis/wit/wiql")
            .match_header("authorization", AUTH_HEADER)
            .match_query(Matcher::UrlEncoded("api-version".into(), "7.0".into()))
            .match_body(Matcher::Regex(r"\[System\.WorkItemType\] = 'Bug'".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"queryType":"flat","workItems":[
                    {"id":1,"url":"https://example.invalid/1"},
                    {"id":2,"url":"https://example.invalid/2"}
                ]}"#,
            )
            .create_async()
            .await;
        let items = server
            .mock("GET", "/contoso/Fabrikam/_apis/wit/workitems")
            .match_header("authorization", AUTH_HEADER)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("ids".into(), "1,2".into()),
                Matcher::UrlEncoded("errorPolicy".into(), "omit".into()),
                Matcher::UrlEncoded("api-version".into(), "7.0".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"count":2,"value":[
                    {"id":1,"fields":{"System.Id":1,"System.CreatedDate":"2024-06-10T08:00:00Z","System.ChangedDate":"2024-06-10T12:00:00Z"}},
                    null
                ]}"#,
            )
            .create_async()
            .await;

        let work_items = client(&server)
            .query_work_items("Fabrikam", "main", &window())
            .await
            .unwrap();

        assert_eq!(work_items.len(), 1);
        assert_eq!(work_items[0].id, 1);
        assert_eq!(
            work_items[0].fields.changed_date,
            Some(Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap())
        );
        wiql.assert_async().await;
        items.assert_async().await;
    }

    #[tokio::test]
    async fn test_query_work_items_without_matches_skips_item_lookup() {
        let mut server = Server::new_async().await;
        let _wiql = server
            .mock("POST", "/contoso/Fabrikam/_apis/wit/wiql")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"queryType":"flat","workItems":[]}"#)
            .create_async()
            .await;
        let items = server
            .mock("GET", "/contoso/Fabrikam/_apis/wit/workitems")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let work_items = client(&server)
            .query_work_items("Fabrikam", "main", &window())
            .await
            .unwrap();

        assert!(work_items.is_empty());
        items.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_surfaces_as_api_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/contoso/Fabrikam/_apis/git/repositories")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body("project not found")
            .create_async()
            .await;

        let err = client(&server)
            .find_repository("Fabrikam", "WebShop")
            .await
            .unwrap_err();

        match err {
            DoraError::Api(message) => {
                assert!(message.contains("404"));
                assert!(message.contains("project not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejected_token_is_reported_as_auth_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/contoso/Fabrikam/_apis/git/repositories")
            .match_query(Matcher::Any)
            .with_status(203)
            .with_body("<html>Sign in</html>")
            .create_async()
            .await;

        let err = client(&server)
            .find_repository("Fabrikam", "WebShop")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("authentication failed"));
    }
}
