//! Per-kind staleness windows.

use std::collections::HashMap;

use chrono::Duration;

use super::kind::ResourceKind;

/// Default staleness window for a kind.
pub fn default_ttl(kind: ResourceKind) -> Duration {
  match kind {
    ResourceKind::Issue => Duration::minutes(5),
    ResourceKind::IssueComment
    | ResourceKind::PullRequest
    | ResourceKind::PullRequestComment
    | ResourceKind::Wiki => Duration::minutes(30),
    ResourceKind::IssueType | ResourceKind::Project | ResourceKind::Repository => {
      Duration::hours(24)
    }
    ResourceKind::Myself | ResourceKind::Priority | ResourceKind::Status => Duration::days(365),
  }
}

/// TTL table keyed by resource kind.
#[derive(Debug, Clone, Default)]
pub struct TtlPolicy {
  overrides: HashMap<ResourceKind, Duration>,
}

impl TtlPolicy {
  pub fn ttl(&self, kind: ResourceKind) -> Duration {
    self
      .overrides
      .get(&kind)
      .copied()
      .unwrap_or_else(|| default_ttl(kind))
  }

  /// Whether data fetched `elapsed` ago must be refetched.
  pub fn is_stale(&self, kind: ResourceKind, elapsed: Duration) -> bool {
    elapsed >= self.ttl(kind)
  }
}

impl FromIterator<(ResourceKind, Duration)> for TtlPolicy {
  fn from_iter<I: IntoIterator<Item = (ResourceKind, Duration)>>(iter: I) -> Self {
    Self {
      overrides: iter.into_iter().collect(),
    }
  }
}
