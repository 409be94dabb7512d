//! Caching implementations for Backlog types.

use crate::cache::{Cacheable, QueryParams, ResourceKind};

use super::types::{
  Issue, IssueComment, IssueType, Project, PullRequest, PullRequestComment, Repository, Wiki,
};

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for Project {
  const KIND: ResourceKind = ResourceKind::Project;

  fn cache_id(&self) -> u64 {
    self.id
  }
}

impl Cacheable for Issue {
  const KIND: ResourceKind = ResourceKind::Issue;

  fn cache_id(&self) -> u64 {
    self.id
  }
}

impl Cacheable for IssueType {
  const KIND: ResourceKind = ResourceKind::IssueType;

  fn cache_id(&self) -> u64 {
    self.id
  }
}

impl Cacheable for IssueComment {
  const KIND: ResourceKind = ResourceKind::IssueComment;

  fn cache_id(&self) -> u64 {
    self.comment.id
  }
}

impl Cacheable for Repository {
  const KIND: ResourceKind = ResourceKind::Repository;

  fn cache_id(&self) -> u64 {
    self.id
  }
}

impl Cacheable for PullRequest {
  const KIND: ResourceKind = ResourceKind::PullRequest;

  fn cache_id(&self) -> u64 {
    self.id
  }
}

impl Cacheable for PullRequestComment {
  const KIND: ResourceKind = ResourceKind::PullRequestComment;

  fn cache_id(&self) -> u64 {
    self.comment.id
  }
}

impl Cacheable for Wiki {
  const KIND: ResourceKind = ResourceKind::Wiki;

  fn cache_id(&self) -> u64 {
    self.id
  }
}

// ============================================================================
// Query scopes
// ============================================================================

/// Queries issued against the Backlog API.
///
/// Each variant maps to the parameter set that scopes its freshness clock.
/// Variants of the same kind share one record directory.
#[derive(Clone, Debug)]
pub enum BacklogQuery {
  /// Every project visible to the user
  Projects,
  /// One project by id or key
  Project { id_or_key: String },
  /// Issues of a project, most recently updated first
  Issues { project_id: u64 },
  /// One issue by id or key
  Issue { id_or_key: String },
  IssueComments { issue_id: u64 },
  IssueTypes { project_id: u64 },
  Repositories { project_id: u64 },
  Repository { project_id: u64, name: String },
  PullRequests { project_id: u64, repository_id: u64 },
  PullRequest {
    project_id: u64,
    repository_id: u64,
    number: u64,
  },
  PullRequestComments {
    project_id: u64,
    repository_id: u64,
    number: u64,
  },
  Wikis { project_id: u64 },
  Wiki { wiki_id: u64 },
}

impl BacklogQuery {
  pub fn params(&self) -> QueryParams {
    match self {
      Self::Projects => QueryParams::new(),
      Self::Project { id_or_key } => QueryParams::new().with("projectIdOrKey", id_or_key),
      Self::Issues { project_id } => QueryParams::new()
        .with("sort", "updated")
        .with("order", "desc")
        .with("count", 100)
        .with("projectId[]", project_id),
      Self::Issue { id_or_key } => QueryParams::new().with("issueIdOrKey", id_or_key),
      Self::IssueComments { issue_id } => QueryParams::new().with("issueId", issue_id),
      Self::IssueTypes { project_id } => QueryParams::new().with("projectId", project_id),
      Self::Repositories { project_id } => QueryParams::new().with("projectId", project_id),
      Self::Repository { project_id, name } => QueryParams::new()
        .with("projectId", project_id)
        .with("repositoryName", name),
      Self::PullRequests {
        project_id,
        repository_id,
      } => QueryParams::new()
        .with("projectId", project_id)
        .with("repositoryId", repository_id),
      Self::PullRequest {
        project_id,
        repository_id,
        number,
      }
      | Self::PullRequestComments {
        project_id,
        repository_id,
        number,
      } => QueryParams::new()
        .with("projectId", project_id)
        .with("repositoryId", repository_id)
        .with("number", number),
      Self::Wikis { project_id } => QueryParams::new().with("projectIdOrKey", project_id),
      Self::Wiki { wiki_id } => QueryParams::new().with("wikiId", wiki_id),
    }
  }

  pub fn description(&self) -> String {
    match self {
      Self::Projects => "all projects".to_string(),
      Self::Project { id_or_key } => format!("project {}", id_or_key),
      Self::Issues { project_id } => format!("issues of project {}", project_id),
      Self::Issue { id_or_key } => format!("issue {}", id_or_key),
      Self::IssueComments { issue_id } => format!("comments of issue {}", issue_id),
      Self::IssueTypes { project_id } => format!("issue types of project {}", project_id),
      Self::Repositories { project_id } => format!("repositories of project {}", project_id),
      Self::Repository { project_id, name } => {
        format!("repository {} of project {}", name, project_id)
      }
      Self::PullRequests {
        project_id,
        repository_id,
      } => format!(
        "pull requests of repository {} in project {}",
        repository_id, project_id
      ),
      Self::PullRequest {
        project_id,
        repository_id,
        number,
      } => format!(
        "pull request {}/{}#{}",
        project_id, repository_id, number
      ),
      Self::PullRequestComments {
        project_id,
        repository_id,
        number,
      } => format!(
        "comments of pull request {}/{}#{}",
        project_id, repository_id, number
      ),
      Self::Wikis { project_id } => format!("wikis of project {}", project_id),
      Self::Wiki { wiki_id } => format!("wiki {}", wiki_id),
    }
  }
}
