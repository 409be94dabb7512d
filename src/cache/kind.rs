//! The closed set of resource kinds the cache knows how to store.

use std::fmt;
use std::str::FromStr;

use super::error::CacheError;

/// How records of a kind are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageShape {
  /// One `<id>.json` file per record inside a directory
  Collection,
  /// A single `<name>.json` file holding the whole document
  Singleton,
}

impl StorageShape {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Collection => "collection",
      Self::Singleton => "singleton",
    }
  }
}

/// A category of domain entity mirrored into the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
  Issue,
  IssueComment,
  IssueType,
  Myself,
  Priority,
  Project,
  PullRequest,
  PullRequestComment,
  Repository,
  Status,
  Wiki,
}

impl ResourceKind {
  pub const ALL: [ResourceKind; 11] = [
    Self::Issue,
    Self::IssueComment,
    Self::IssueType,
    Self::Myself,
    Self::Priority,
    Self::Project,
    Self::PullRequest,
    Self::PullRequestComment,
    Self::Repository,
    Self::Status,
    Self::Wiki,
  ];

  /// Canonical on-disk name fragment for this kind.
  pub fn name(self) -> &'static str {
    match self {
      Self::Issue => "issues",
      Self::IssueComment => "issue_comments",
      Self::IssueType => "issuetypes",
      Self::Myself => "myself",
      Self::Priority => "priorities",
      Self::Project => "projects",
      Self::PullRequest => "pullrequests",
      Self::PullRequestComment => "pullrequest_comments",
      Self::Repository => "repositories",
      Self::Status => "statuses",
      Self::Wiki => "wikis",
    }
  }

  /// Human-facing label, also accepted when parsing.
  pub fn label(self) -> &'static str {
    match self {
      Self::Issue => "issue",
      Self::IssueComment => "issue-comment",
      Self::IssueType => "issue-type",
      Self::Myself => "myself",
      Self::Priority => "priority",
      Self::Project => "project",
      Self::PullRequest => "pull-request",
      Self::PullRequestComment => "pull-request-comment",
      Self::Repository => "repository",
      Self::Status => "status",
      Self::Wiki => "wiki",
    }
  }

  pub fn shape(self) -> StorageShape {
    match self {
      Self::Myself | Self::Priority | Self::Status => StorageShape::Singleton,
      _ => StorageShape::Collection,
    }
  }

  /// Resolve a kind from either its label or its on-disk name.
  pub fn from_name(name: &str) -> Result<Self, CacheError> {
    let needle = name.trim().to_lowercase();
    Self::ALL
      .into_iter()
      .find(|kind| kind.label() == needle || kind.name() == needle)
      .ok_or_else(|| CacheError::UnknownKind(name.to_string()))
  }
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

impl FromStr for ResourceKind {
  type Err = CacheError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::from_name(s)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn test_names_are_unique() {
    let names: HashSet<_> = ResourceKind::ALL.iter().map(|k| k.name()).collect();
    assert_eq!(names.len(), ResourceKind::ALL.len());
  }

  #[test]
  fn test_from_name_accepts_label_and_dir_name() {
    assert_eq!(
      ResourceKind::from_name("pull-request").unwrap(),
      ResourceKind::PullRequest
    );
    assert_eq!(
      ResourceKind::from_name("pullrequests").unwrap(),
      ResourceKind::PullRequest
    );
    assert_eq!(
      "Issue-Comment".parse::<ResourceKind>().unwrap(),
      ResourceKind::IssueComment
    );
  }

  #[test]
  fn test_unknown_kind() {
    let err = ResourceKind::from_name("milestones").unwrap_err();
    assert!(matches!(err, CacheError::UnknownKind(ref k) if k == "milestones"));
  }

  #[test]
  fn test_singleton_kinds() {
    let singletons: Vec<_> = ResourceKind::ALL
      .into_iter()
      .filter(|k| k.shape() == StorageShape::Singleton)
      .collect();
    assert_eq!(
      singletons,
      vec![
        ResourceKind::Myself,
        ResourceKind::Priority,
        ResourceKind::Status
      ]
    );
  }
}
