use color_eyre::{eyre::eyre, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::backlog::types::{
  Comment, Issue, IssueType, Priority, Project, PullRequest, Repository, Status, User, Wiki,
};
use crate::cache::QueryParams;
use crate::config::Config;

/// Backlog API v2 client wrapper
#[derive(Clone)]
pub struct BacklogClient {
  http: Client,
  base_url: Url,
  api_key: String,
}

impl BacklogClient {
  pub fn new(config: &Config) -> Result<Self> {
    let api_key = Config::get_api_token()?;
    let base = format!("https://{}.{}/api/v2/", config.space()?, config.domain);
    Self::with_base_url(&base, api_key)
  }

  pub fn with_base_url(base_url: &str, api_key: String) -> Result<Self> {
    let base_url =
      Url::parse(base_url).map_err(|e| eyre!("Invalid Backlog URL {}: {}", base_url, e))?;

    let http = Client::builder()
      .user_agent(concat!("blg/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      api_key,
    })
  }

  /// Build the request URL for an endpoint relative to `/api/v2/`.
  fn endpoint_url(&self, endpoint: &str, query: &QueryParams) -> Result<Url> {
    let mut url = self
      .base_url
      .join(endpoint.trim_start_matches('/'))
      .map_err(|e| eyre!("Invalid endpoint {}: {}", endpoint, e))?;

    url
      .query_pairs_mut()
      .append_pair("apiKey", &self.api_key)
      .extend_pairs(query.pairs());

    Ok(url)
  }

  /// GET an endpoint and decode the JSON body.
  async fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &QueryParams) -> Result<T> {
    let url = self.endpoint_url(endpoint, query)?;
    debug!(endpoint, "GET");

    let response = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", endpoint, e.without_url()))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(eyre!("Backlog API {} returned {}: {}", endpoint, status, body));
    }

    response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse response from {}: {}", endpoint, e.without_url()))
  }

  pub async fn get_myself(&self) -> Result<User> {
    self.get("users/myself", &QueryParams::new()).await
  }

  pub async fn get_projects(&self) -> Result<Vec<Project>> {
    self.get("projects", &QueryParams::new()).await
  }

  pub async fn get_project(&self, id_or_key: &str) -> Result<Project> {
    self
      .get(&format!("projects/{}", id_or_key), &QueryParams::new())
      .await
  }

  pub async fn get_issues(&self, query: &QueryParams) -> Result<Vec<Issue>> {
    self.get("issues", query).await
  }

  pub async fn get_issue(&self, id_or_key: &str) -> Result<Issue> {
    self
      .get(&format!("issues/{}", id_or_key), &QueryParams::new())
      .await
  }

  pub async fn get_issue_comments(&self, issue_id: u64) -> Result<Vec<Comment>> {
    let query = QueryParams::new().with("count", 100).with("order", "asc");
    self
      .get(&format!("issues/{}/comments", issue_id), &query)
      .await
  }

  pub async fn get_issue_types(&self, project_id: u64) -> Result<Vec<IssueType>> {
    self
      .get(
        &format!("projects/{}/issueTypes", project_id),
        &QueryParams::new(),
      )
      .await
  }

  pub async fn get_priorities(&self) -> Result<Vec<Priority>> {
    self.get("priorities", &QueryParams::new()).await
  }

  pub async fn get_statuses(&self) -> Result<Vec<Status>> {
    self.get("statuses", &QueryParams::new()).await
  }

  pub async fn get_repositories(&self, project_id: u64) -> Result<Vec<Repository>> {
    self
      .get(
        &format!("projects/{}/git/repositories", project_id),
        &QueryParams::new(),
      )
      .await
  }

  pub async fn get_repository(&self, project_id: u64, name: &str) -> Result<Repository> {
    self
      .get(
        &format!("projects/{}/git/repositories/{}", project_id, name),
        &QueryParams::new(),
      )
      .await
  }

  pub async fn get_pull_requests(
    &self,
    project_id: u64,
    repository_id: u64,
  ) -> Result<Vec<PullRequest>> {
    let query = QueryParams::new().with("count", 100);
    self
      .get(
        &format!(
          "projects/{}/git/repositories/{}/pullRequests",
          project_id, repository_id
        ),
        &query,
      )
      .await
  }

  pub async fn get_pull_request(
    &self,
    project_id: u64,
    repository_id: u64,
    number: u64,
  ) -> Result<PullRequest> {
    self
      .get(
        &format!(
          "projects/{}/git/repositories/{}/pullRequests/{}",
          project_id, repository_id, number
        ),
        &QueryParams::new(),
      )
      .await
  }

  pub async fn get_pull_request_comments(
    &self,
    project_id: u64,
    repository_id: u64,
    number: u64,
  ) -> Result<Vec<Comment>> {
    let query = QueryParams::new().with("count", 100).with("order", "asc");
    self
      .get(
        &format!(
          "projects/{}/git/repositories/{}/pullRequests/{}/comments",
          project_id, repository_id, number
        ),
        &query,
      )
      .await
  }

  pub async fn get_wikis(&self, query: &QueryParams) -> Result<Vec<Wiki>> {
    self.get("wikis", query).await
  }

  pub async fn get_wiki(&self, wiki_id: u64) -> Result<Wiki> {
    self
      .get(&format!("wikis/{}", wiki_id), &QueryParams::new())
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_endpoint_url_carries_key_and_query() {
    let client =
      BacklogClient::with_base_url("https://acme.backlog.jp/api/v2/", "secret".to_string())
        .unwrap();
    let query = QueryParams::new()
      .with("projectId[]", 7)
      .with("sort", "updated");

    let url = client.endpoint_url("/issues", &query).unwrap();
    assert_eq!(url.path(), "/api/v2/issues");

    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(
      pairs,
      vec![
        ("apiKey".to_string(), "secret".to_string()),
        ("projectId[]".to_string(), "7".to_string()),
        ("sort".to_string(), "updated".to_string()),
      ]
    );
  }
}
