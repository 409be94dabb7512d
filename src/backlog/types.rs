//! Backlog domain types, deserialized straight from API responses and
//! stored as-is in the cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: u64,
  #[serde(default)]
  pub user_id: Option<String>,
  pub name: String,
  #[serde(default)]
  pub mail_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
  pub id: u64,
  pub project_key: String,
  pub name: String,
  #[serde(default)]
  pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
  pub id: u64,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Priority {
  pub id: u64,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueType {
  pub id: u64,
  pub project_id: u64,
  pub name: String,
  #[serde(default)]
  pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
  pub id: u64,
  pub project_id: u64,
  pub issue_key: String,
  pub summary: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub issue_type: Option<IssueType>,
  #[serde(default)]
  pub status: Option<Status>,
  #[serde(default)]
  pub priority: Option<Priority>,
  #[serde(default)]
  pub assignee: Option<User>,
  #[serde(default)]
  pub created_user: Option<User>,
  #[serde(default)]
  pub parent_issue_id: Option<u64>,
  #[serde(default)]
  pub start_date: Option<DateTime<Utc>>,
  #[serde(default)]
  pub due_date: Option<DateTime<Utc>>,
  #[serde(default)]
  pub estimated_hours: Option<f64>,
  #[serde(default)]
  pub actual_hours: Option<f64>,
  #[serde(default)]
  pub created: Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLog {
  pub field: String,
  #[serde(default)]
  pub original_value: Option<String>,
  #[serde(default)]
  pub new_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
  pub id: u64,
  #[serde(default)]
  pub content: Option<String>,
  #[serde(default)]
  pub change_log: Vec<ChangeLog>,
  #[serde(default)]
  pub created_user: Option<User>,
  #[serde(default)]
  pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
  pub id: u64,
  pub project_id: u64,
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub http_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
  pub id: u64,
  pub project_id: u64,
  pub repository_id: u64,
  pub number: u64,
  pub summary: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub base: Option<String>,
  #[serde(default)]
  pub branch: Option<String>,
  #[serde(default)]
  pub status: Option<Status>,
  #[serde(default)]
  pub created_user: Option<User>,
  #[serde(default)]
  pub created: Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wiki {
  pub id: u64,
  pub project_id: u64,
  pub name: String,
  /// Absent from list responses
  #[serde(default)]
  pub content: Option<String>,
  #[serde(default)]
  pub created_user: Option<User>,
  #[serde(default)]
  pub created: Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated: Option<DateTime<Utc>>,
}

// ============================================================================
// Cached wrappers
// ============================================================================

/// An issue comment with its owning issue.
///
/// The API omits the parent on comment objects, so it is stored alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueComment {
  pub issue_id: u64,
  pub comment: Comment,
}

/// A pull request comment with its owning project, repository and number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestComment {
  pub project_id: u64,
  pub repository_id: u64,
  pub number: u64,
  pub comment: Comment,
}

impl PullRequestComment {
  pub fn belongs_to(&self, project_id: u64, repository_id: u64, number: u64) -> bool {
    self.project_id == project_id && self.repository_id == repository_id && self.number == number
  }
}
