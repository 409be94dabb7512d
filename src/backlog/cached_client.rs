//! Cached Backlog client that wraps BacklogClient with the on-disk cache.

use color_eyre::{eyre::eyre, Report, Result};
use tracing::debug;

use crate::cache::{CacheLayer, CacheSource, Cacheable, ResourceKind};
use crate::config::Config;

use super::cache::BacklogQuery;
use super::client::BacklogClient;
use super::types::{
  Comment, Issue, IssueComment, IssueType, Priority, Project, PullRequest, PullRequestComment,
  Repository, Status, User, Wiki,
};

/// Backlog client with transparent caching support.
///
/// Every method syncs the relevant slice of the cache (fetching only when
/// its TTL has elapsed) and then answers from disk.
#[derive(Clone)]
pub struct CachedBacklogClient {
  inner: BacklogClient,
  cache: CacheLayer,
}

impl CachedBacklogClient {
  /// Create a new cached Backlog client.
  pub fn new(config: &Config, force_refresh: bool) -> Result<Self> {
    let inner = BacklogClient::new(config)?;
    let cache = CacheLayer::new(config.cache_paths()?, config.ttl_policy()?)
      .with_force_refresh(force_refresh);

    Ok(Self::from_parts(inner, cache))
  }

  pub fn from_parts(inner: BacklogClient, cache: CacheLayer) -> Self {
    Self { inner, cache }
  }

  fn log_sync(query: &BacklogQuery, source: CacheSource) {
    debug!(source = ?source, "synced {}", query.description());
  }

  async fn sync_list<T, F, Fut>(&self, query: BacklogQuery, fetcher: F) -> Result<()>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<Vec<T>>>,
  {
    let source = self.cache.sync_records(&query.params(), fetcher).await?;
    Self::log_sync(&query, source);
    Ok(())
  }

  async fn sync_one<T, F, Fut>(&self, query: BacklogQuery, fetcher: F) -> Result<()>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
  {
    let source = self.cache.sync_record(&query.params(), fetcher).await?;
    Self::log_sync(&query, source);
    Ok(())
  }

  // ==========================================================================
  // Projects
  // ==========================================================================

  /// All projects, in id order.
  pub async fn projects(&self) -> Result<Vec<Project>> {
    self
      .sync_list(BacklogQuery::Projects, || self.inner.get_projects())
      .await?;

    let mut projects: Vec<Project> = self.cache.records(|_: &Project| true)?;
    projects.sort_by_key(|p| p.id);
    Ok(projects)
  }

  pub async fn project_by_key(&self, project_key: &str) -> Result<Project> {
    let query = BacklogQuery::Project {
      id_or_key: project_key.to_string(),
    };
    self
      .sync_one(query, || self.inner.get_project(project_key))
      .await?;

    self
      .cache
      .records(|p: &Project| p.project_key.eq_ignore_ascii_case(project_key))?
      .into_iter()
      .next()
      .ok_or_else(|| eyre!("Project {} not found", project_key))
  }

  pub async fn project(&self, project_id: u64) -> Result<Project> {
    let id_or_key = project_id.to_string();
    let query = BacklogQuery::Project {
      id_or_key: id_or_key.clone(),
    };
    self
      .sync_one(query, || self.inner.get_project(&id_or_key))
      .await?;

    self.cache.record(project_id)
  }

  // ==========================================================================
  // Issues
  // ==========================================================================

  /// Issues of a project, newest first.
  pub async fn issues(&self, project_id: u64) -> Result<Vec<Issue>> {
    let query = BacklogQuery::Issues { project_id };
    let params = query.params();
    self
      .sync_list(query, || self.inner.get_issues(&params))
      .await?;

    let mut issues: Vec<Issue> = self.cache.records(|i: &Issue| i.project_id == project_id)?;
    issues.sort_by(|a, b| b.id.cmp(&a.id));
    Ok(issues)
  }

  pub async fn issue_by_key(&self, issue_key: &str) -> Result<Issue> {
    let query = BacklogQuery::Issue {
      id_or_key: issue_key.to_string(),
    };
    self
      .sync_one(query, || self.inner.get_issue(issue_key))
      .await?;

    self
      .cache
      .records(|i: &Issue| i.issue_key.eq_ignore_ascii_case(issue_key))?
      .into_iter()
      .next()
      .ok_or_else(|| eyre!("Issue {} not found", issue_key))
  }

  pub async fn issue(&self, issue_id: u64) -> Result<Issue> {
    let id_or_key = issue_id.to_string();
    let query = BacklogQuery::Issue {
      id_or_key: id_or_key.clone(),
    };
    self
      .sync_one(query, || self.inner.get_issue(&id_or_key))
      .await?;

    self.cache.record(issue_id)
  }

  /// Comments of an issue, oldest first.
  pub async fn issue_comments(&self, issue_id: u64) -> Result<Vec<Comment>> {
    self
      .sync_list(BacklogQuery::IssueComments { issue_id }, || async {
        let comments = self.inner.get_issue_comments(issue_id).await?;
        Ok::<Vec<IssueComment>, Report>(
          comments
            .into_iter()
            .map(|comment| IssueComment { issue_id, comment })
            .collect(),
        )
      })
      .await?;

    let cached: Vec<IssueComment> = self
      .cache
      .records(|c: &IssueComment| c.issue_id == issue_id)?;
    Ok(sort_comments(cached.into_iter().map(|c| c.comment).collect()))
  }

  pub async fn issue_types(&self, project_id: u64) -> Result<Vec<IssueType>> {
    self
      .sync_list(BacklogQuery::IssueTypes { project_id }, || {
        self.inner.get_issue_types(project_id)
      })
      .await?;

    let mut types: Vec<IssueType> = self
      .cache
      .records(|t: &IssueType| t.project_id == project_id)?;
    types.sort_by_key(|t| t.id);
    Ok(types)
  }

  // ==========================================================================
  // Space-wide reference data
  // ==========================================================================

  pub async fn myself(&self) -> Result<User> {
    self
      .cache
      .sync_singleton(ResourceKind::Myself, || self.inner.get_myself())
      .await?;
    self.cache.singleton(ResourceKind::Myself)
  }

  pub async fn priorities(&self) -> Result<Vec<Priority>> {
    self
      .cache
      .sync_singleton(ResourceKind::Priority, || self.inner.get_priorities())
      .await?;
    self.cache.singleton(ResourceKind::Priority)
  }

  pub async fn statuses(&self) -> Result<Vec<Status>> {
    self
      .cache
      .sync_singleton(ResourceKind::Status, || self.inner.get_statuses())
      .await?;
    self.cache.singleton(ResourceKind::Status)
  }

  // ==========================================================================
  // Git
  // ==========================================================================

  pub async fn repositories(&self, project_id: u64) -> Result<Vec<Repository>> {
    self
      .sync_list(BacklogQuery::Repositories { project_id }, || {
        self.inner.get_repositories(project_id)
      })
      .await?;

    let mut repositories: Vec<Repository> = self
      .cache
      .records(|r: &Repository| r.project_id == project_id)?;
    repositories.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(repositories)
  }

  pub async fn repository(&self, project_id: u64, name: &str) -> Result<Repository> {
    let query = BacklogQuery::Repository {
      project_id,
      name: name.to_string(),
    };
    self
      .sync_one(query, || self.inner.get_repository(project_id, name))
      .await?;

    self
      .cache
      .records(|r: &Repository| r.project_id == project_id && r.name == name)?
      .into_iter()
      .next()
      .ok_or_else(|| eyre!("Repository {} not found", name))
  }

  /// Pull requests of a repository, highest number first.
  pub async fn pull_requests(
    &self,
    project_id: u64,
    repository_id: u64,
  ) -> Result<Vec<PullRequest>> {
    let query = BacklogQuery::PullRequests {
      project_id,
      repository_id,
    };
    self
      .sync_list(query, || {
        self.inner.get_pull_requests(project_id, repository_id)
      })
      .await?;

    let mut pull_requests: Vec<PullRequest> = self.cache.records(|pr: &PullRequest| {
      pr.project_id == project_id && pr.repository_id == repository_id
    })?;
    pull_requests.sort_by(|a, b| b.number.cmp(&a.number));
    Ok(pull_requests)
  }

  pub async fn pull_request(
    &self,
    project_id: u64,
    repository_id: u64,
    number: u64,
  ) -> Result<PullRequest> {
    let query = BacklogQuery::PullRequest {
      project_id,
      repository_id,
      number,
    };
    self
      .sync_one(query, || {
        self
          .inner
          .get_pull_request(project_id, repository_id, number)
      })
      .await?;

    self
      .cache
      .records(|pr: &PullRequest| {
        pr.project_id == project_id && pr.repository_id == repository_id && pr.number == number
      })?
      .into_iter()
      .next()
      .ok_or_else(|| eyre!("Pull request #{} not found", number))
  }

  /// Comments of a pull request, oldest first.
  pub async fn pull_request_comments(
    &self,
    project_id: u64,
    repository_id: u64,
    number: u64,
  ) -> Result<Vec<Comment>> {
    let query = BacklogQuery::PullRequestComments {
      project_id,
      repository_id,
      number,
    };
    self
      .sync_list(query, || async {
        let comments = self
          .inner
          .get_pull_request_comments(project_id, repository_id, number)
          .await?;
        Ok::<Vec<PullRequestComment>, Report>(
          comments
            .into_iter()
            .map(|comment| PullRequestComment {
              project_id,
              repository_id,
              number,
              comment,
            })
            .collect(),
        )
      })
      .await?;

    let cached: Vec<PullRequestComment> = self
      .cache
      .records(|c: &PullRequestComment| c.belongs_to(project_id, repository_id, number))?;
    Ok(sort_comments(cached.into_iter().map(|c| c.comment).collect()))
  }

  // ==========================================================================
  // Wikis
  // ==========================================================================

  /// Wiki pages of a project, most recently updated first.
  pub async fn wikis(&self, project_id: u64) -> Result<Vec<Wiki>> {
    let query = BacklogQuery::Wikis { project_id };
    let params = query.params();
    self
      .sync_list(query, || self.inner.get_wikis(&params))
      .await?;

    let mut wikis: Vec<Wiki> = self.cache.records(|w: &Wiki| w.project_id == project_id)?;
    wikis.sort_by(|a, b| b.updated.cmp(&a.updated));
    Ok(wikis)
  }

  pub async fn wiki(&self, wiki_id: u64) -> Result<Wiki> {
    self
      .sync_one(BacklogQuery::Wiki { wiki_id }, || self.inner.get_wiki(wiki_id))
      .await?;
    self.cache.record(wiki_id)
  }
}

fn sort_comments(mut comments: Vec<Comment>) -> Vec<Comment> {
  comments.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
  comments
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CachePaths, TtlPolicy};
  use tempfile::TempDir;

  fn comment(id: u64) -> Comment {
    Comment {
      id,
      content: Some(format!("comment {}", id)),
      change_log: Vec::new(),
      created_user: None,
      created: None,
    }
  }

  fn project(id: u64, key: &str) -> Project {
    Project {
      id,
      project_key: key.to_string(),
      name: format!("Project {}", key),
      archived: false,
    }
  }

  /// A client whose API endpoint is unreachable; only fresh cache can answer.
  fn offline_client(dir: &TempDir) -> CachedBacklogClient {
    let inner =
      BacklogClient::with_base_url("http://127.0.0.1:9/api/v2/", "unused".to_string()).unwrap();
    let cache = CacheLayer::new(CachePaths::new(dir.path(), "acme"), TtlPolicy::default());
    CachedBacklogClient::from_parts(inner, cache)
  }

  fn seed<T: Cacheable>(client: &CachedBacklogClient, query: &BacklogQuery, records: &[T]) {
    let store = client.cache.store();
    for record in records {
      store
        .write_record(T::KIND, &record.cache_id().to_string(), record)
        .unwrap();
    }
    client
      .cache
      .freshness()
      .mark_fetched_now(T::KIND, &query.params().fingerprint())
      .unwrap();
  }

  #[tokio::test]
  async fn test_issue_comments_filtered_by_parent_from_fresh_cache() {
    let temp_dir = TempDir::new().unwrap();
    let client = offline_client(&temp_dir);
    let query = BacklogQuery::IssueComments { issue_id: 9 };

    seed(
      &client,
      &query,
      &[
        IssueComment {
          issue_id: 9,
          comment: comment(1),
        },
        IssueComment {
          issue_id: 9,
          comment: comment(2),
        },
        IssueComment {
          issue_id: 10,
          comment: comment(3),
        },
      ],
    );

    let comments = client.issue_comments(9).await.unwrap();
    let ids: Vec<u64> = comments.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2]);
  }

  #[tokio::test]
  async fn test_project_by_key_from_fresh_cache() {
    let temp_dir = TempDir::new().unwrap();
    let client = offline_client(&temp_dir);
    let query = BacklogQuery::Project {
      id_or_key: "BLG".to_string(),
    };

    seed(&client, &query, &[project(1, "BLG"), project(2, "OTHER")]);

    let found = client.project_by_key("BLG").await.unwrap();
    assert_eq!(found.id, 1);
  }

  #[tokio::test]
  async fn test_stale_cache_goes_to_network() {
    let temp_dir = TempDir::new().unwrap();
    let client = offline_client(&temp_dir);

    // Records exist but no freshness stamp, so a fetch is attempted and fails
    client
      .cache
      .store()
      .write_record(ResourceKind::Project, "1", &project(1, "BLG"))
      .unwrap();

    assert!(client.projects().await.is_err());
  }
}
