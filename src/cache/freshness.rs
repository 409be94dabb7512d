//! Last-fetched timestamps per (resource kind, query fingerprint).

use std::fs;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use tracing::debug;

use super::error::{CacheError, Result};
use super::fingerprint::Fingerprint;
use super::kind::ResourceKind;
use super::paths::CachePaths;

/// The instant reported for anything never fetched. Older than any TTL.
pub const NEVER_FETCHED: DateTime<Utc> = DateTime::<Utc>::MIN_UTC;

/// Reads and writes freshness stamps.
///
/// Reads fail open: any problem determining the last fetch time is
/// reported as [`NEVER_FETCHED`], so callers fall back to refetching.
#[derive(Debug, Clone)]
pub struct FreshnessTracker {
  paths: CachePaths,
}

impl FreshnessTracker {
  pub fn new(paths: CachePaths) -> Self {
    Self { paths }
  }

  pub fn last_fetched_at(&self, kind: ResourceKind, fingerprint: &Fingerprint) -> DateTime<Utc> {
    let path = self.paths.freshness_path(kind, fingerprint);

    let contents = match fs::read_to_string(&path) {
      Ok(contents) => contents,
      Err(e) => {
        debug!(kind = %kind, path = %path.display(), "no freshness stamp: {}", e);
        return NEVER_FETCHED;
      }
    };

    match DateTime::parse_from_rfc3339(contents.trim()) {
      Ok(at) => at.with_timezone(&Utc),
      Err(e) => {
        debug!(kind = %kind, path = %path.display(), "unreadable freshness stamp: {}", e);
        NEVER_FETCHED
      }
    }
  }

  /// Time since the last recorded fetch, saturating for never-fetched pairs.
  pub fn elapsed_since_fetch(&self, kind: ResourceKind, fingerprint: &Fingerprint) -> Duration {
    let last = self.last_fetched_at(kind, fingerprint);
    if last == NEVER_FETCHED {
      return Duration::MAX;
    }
    Utc::now().signed_duration_since(last)
  }

  /// Stamp the current instant. Call only after the fetched records are written.
  pub fn mark_fetched_now(
    &self,
    kind: ResourceKind,
    fingerprint: &Fingerprint,
  ) -> Result<DateTime<Utc>> {
    let path = self.paths.freshness_path(kind, fingerprint);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
    }

    let now = Utc::now();
    fs::write(&path, now.to_rfc3339_opts(SecondsFormat::AutoSi, true))
      .map_err(|e| CacheError::io(&path, e))?;

    Ok(now)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::QueryParams;
  use tempfile::TempDir;

  fn tracker(dir: &TempDir) -> FreshnessTracker {
    FreshnessTracker::new(CachePaths::new(dir.path(), "acme"))
  }

  #[test]
  fn test_missing_stamp_is_never_fetched() {
    let temp_dir = TempDir::new().unwrap();
    let tracker = tracker(&temp_dir);

    let at = tracker.last_fetched_at(ResourceKind::Project, &Fingerprint::none());
    assert_eq!(at, NEVER_FETCHED);
  }

  #[test]
  fn test_never_fetched_is_stale_for_a_day_ttl() {
    let temp_dir = TempDir::new().unwrap();
    let tracker = tracker(&temp_dir);
    let fp = QueryParams::new().with("projectId", 1).fingerprint();

    let elapsed = tracker.elapsed_since_fetch(ResourceKind::Repository, &fp);
    assert!(!(elapsed < Duration::hours(24)));
  }

  #[test]
  fn test_mark_then_read_is_bounded() {
    let temp_dir = TempDir::new().unwrap();
    let tracker = tracker(&temp_dir);
    let fp = QueryParams::new().with("sort", "updated").fingerprint();

    let before = Utc::now();
    tracker.mark_fetched_now(ResourceKind::Issue, &fp).unwrap();
    let after = Utc::now();

    let at = tracker.last_fetched_at(ResourceKind::Issue, &fp);
    assert!(at >= before);
    assert!(at <= after);
    assert!(tracker.elapsed_since_fetch(ResourceKind::Issue, &fp) < Duration::minutes(5));
  }

  #[test]
  fn test_fingerprints_keep_separate_clocks() {
    let temp_dir = TempDir::new().unwrap();
    let tracker = tracker(&temp_dir);
    let mine = QueryParams::new().with("assigneeId[]", 3).fingerprint();

    tracker
      .mark_fetched_now(ResourceKind::Issue, &Fingerprint::none())
      .unwrap();

    assert_ne!(
      tracker.last_fetched_at(ResourceKind::Issue, &Fingerprint::none()),
      NEVER_FETCHED
    );
    assert_eq!(tracker.last_fetched_at(ResourceKind::Issue, &mine), NEVER_FETCHED);
  }

  #[test]
  fn test_garbage_stamp_fails_open() {
    let temp_dir = TempDir::new().unwrap();
    let tracker = tracker(&temp_dir);
    let path = CachePaths::new(temp_dir.path(), "acme")
      .freshness_path(ResourceKind::Wiki, &Fingerprint::none());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "yesterday-ish").unwrap();

    assert_eq!(
      tracker.last_fetched_at(ResourceKind::Wiki, &Fingerprint::none()),
      NEVER_FETCHED
    );
  }

  #[test]
  fn test_reads_second_precision_stamps() {
    let temp_dir = TempDir::new().unwrap();
    let tracker = tracker(&temp_dir);
    let path = CachePaths::new(temp_dir.path(), "acme")
      .freshness_path(ResourceKind::Status, &Fingerprint::none());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "2024-03-01T09:30:00+09:00").unwrap();

    let at = tracker.last_fetched_at(ResourceKind::Status, &Fingerprint::none());
    assert_eq!(at.to_rfc3339(), "2024-03-01T00:30:00+00:00");
  }
}
