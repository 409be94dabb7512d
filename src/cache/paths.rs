//! Cache path resolution.
//! Maps resource kinds and query fingerprints to locations in the cache tree.

use std::path::{Path, PathBuf};

use super::fingerprint::Fingerprint;
use super::kind::{ResourceKind, StorageShape};

/// Resolves cache locations for one space.
///
/// Layout under `<cache_root>/cache/<space>/`:
/// - `<name>/<id>.json` for collection kinds
/// - `<name>.json` for singleton kinds
/// - `<name>.time` or `<name>.<fingerprint>.time` for freshness stamps
///
/// Resolution never touches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
  root: PathBuf,
}

impl CachePaths {
  pub fn new(cache_root: impl AsRef<Path>, space: &str) -> Self {
    Self {
      root: cache_root
        .as_ref()
        .join("cache")
        .join(sanitize_name(space)),
    }
  }

  /// Directory holding everything cached for this space.
  pub fn root(&self) -> &Path {
    &self.root
  }

  fn base(&self, kind: ResourceKind) -> PathBuf {
    self.root.join(kind.name())
  }

  /// Directory for collection kinds, file for singleton kinds.
  pub fn records_path(&self, kind: ResourceKind) -> PathBuf {
    match kind.shape() {
      StorageShape::Collection => self.base(kind),
      StorageShape::Singleton => self.root.join(format!("{}.json", kind.name())),
    }
  }

  /// Path of a single record of a collection kind.
  pub fn record_path(&self, kind: ResourceKind, id: &str) -> PathBuf {
    self.base(kind).join(format!("{}.json", sanitize_name(id)))
  }

  pub fn freshness_path(&self, kind: ResourceKind, fingerprint: &Fingerprint) -> PathBuf {
    if fingerprint.is_empty() {
      self.root.join(format!("{}.time", kind.name()))
    } else {
      self
        .root
        .join(format!("{}.{}.time", kind.name(), fingerprint.as_str()))
    }
  }

  /// Whether a file name in the space root is a freshness stamp of `kind`.
  pub fn is_freshness_file_of(kind: ResourceKind, file_name: &str) -> bool {
    let Some(stem) = file_name.strip_suffix(".time") else {
      return false;
    };
    match stem.strip_prefix(kind.name()) {
      Some("") => true,
      // Fingerprints are hex, so no kind name can be mistaken for another's prefix
      Some(rest) => rest
        .strip_prefix('.')
        .is_some_and(|fp| !fp.is_empty() && fp.chars().all(|c| c.is_ascii_hexdigit())),
      None => false,
    }
  }
}

/// Sanitize a name for use in filesystem paths.
/// Replaces problematic characters with underscores.
fn sanitize_name(name: &str) -> String {
  name
    .chars()
    .map(|c| match c {
      '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
      _ => c,
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::QueryParams;

  #[test]
  fn test_sanitize_name() {
    assert_eq!(sanitize_name("simple"), "simple");
    assert_eq!(sanitize_name("with/slash"), "with_slash");
    assert_eq!(sanitize_name("space:name"), "space_name");
  }

  #[test]
  fn test_records_paths() {
    let paths = CachePaths::new(".backlog", "acme");

    assert_eq!(
      paths.records_path(ResourceKind::Issue),
      PathBuf::from(".backlog/cache/acme/issues")
    );
    assert_eq!(
      paths.records_path(ResourceKind::Priority),
      PathBuf::from(".backlog/cache/acme/priorities.json")
    );
    assert!(paths
      .record_path(ResourceKind::IssueComment, "42")
      .ends_with("cache/acme/issue_comments/42.json"));
  }

  #[test]
  fn test_freshness_paths() {
    let paths = CachePaths::new("/tmp/root", "acme");

    assert_eq!(
      paths.freshness_path(ResourceKind::Project, &Fingerprint::none()),
      PathBuf::from("/tmp/root/cache/acme/projects.time")
    );

    let fp = QueryParams::new().with("projectId", 7).fingerprint();
    let scoped = paths.freshness_path(ResourceKind::Repository, &fp);
    assert_eq!(
      scoped,
      PathBuf::from(format!("/tmp/root/cache/acme/repositories.{}.time", fp))
    );
  }

  #[test]
  fn test_is_freshness_file_of() {
    let fp = QueryParams::new().with("a", "b").fingerprint();
    assert!(CachePaths::is_freshness_file_of(ResourceKind::Issue, "issues.time"));
    assert!(CachePaths::is_freshness_file_of(
      ResourceKind::Issue,
      &format!("issues.{}.time", fp)
    ));
    assert!(!CachePaths::is_freshness_file_of(
      ResourceKind::Issue,
      "issuetypes.time"
    ));
    assert!(!CachePaths::is_freshness_file_of(
      ResourceKind::PullRequest,
      "pullrequest_comments.time"
    ));
    assert!(!CachePaths::is_freshness_file_of(ResourceKind::Issue, "issues"));
  }
}
