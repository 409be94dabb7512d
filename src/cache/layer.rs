//! Cache layer that orchestrates freshness checks with network fetching.

use color_eyre::{Report, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use tracing::{debug, info};

use super::fingerprint::{Fingerprint, QueryParams};
use super::freshness::FreshnessTracker;
use super::kind::ResourceKind;
use super::paths::CachePaths;
use super::policy::TtlPolicy;
use super::store::RecordStore;
use super::traits::{CacheSource, Cacheable};

/// Cache layer that decides when to fetch and persists what was fetched.
///
/// Every sync follows the same protocol:
/// 1. Check the freshness stamp for (kind, query) - if within TTL, skip the fetch
/// 2. Otherwise call the fetcher; its errors propagate unchanged
/// 3. Write every returned record
/// 4. Stamp freshness last, so an interrupted batch is refetched next time
///
/// Reads always go to disk and see old and newly written records alike.
#[derive(Debug, Clone)]
pub struct CacheLayer {
  store: RecordStore,
  freshness: FreshnessTracker,
  policy: TtlPolicy,
  /// Ignore TTLs and always fetch
  force_refresh: bool,
}

impl CacheLayer {
  pub fn new(paths: CachePaths, policy: TtlPolicy) -> Self {
    Self {
      store: RecordStore::new(paths.clone()),
      freshness: FreshnessTracker::new(paths),
      policy,
      force_refresh: false,
    }
  }

  pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
    self.force_refresh = force_refresh;
    self
  }

  pub fn store(&self) -> &RecordStore {
    &self.store
  }

  #[cfg(test)]
  pub fn freshness(&self) -> &FreshnessTracker {
    &self.freshness
  }

  pub fn policy(&self) -> &TtlPolicy {
    &self.policy
  }

  fn needs_fetch(&self, kind: ResourceKind, fingerprint: &Fingerprint) -> bool {
    if self.force_refresh {
      return true;
    }
    let elapsed = self.freshness.elapsed_since_fetch(kind, fingerprint);
    let stale = self.policy.is_stale(kind, elapsed);
    if !stale {
      debug!(kind = %kind, fingerprint = %fingerprint, "cache is fresh, skipping fetch");
    }
    stale
  }

  /// Sync a list of records scoped by `query`.
  pub async fn sync_records<T, F, Fut>(
    &self,
    query: &QueryParams,
    fetcher: F,
  ) -> Result<CacheSource>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
  {
    let fingerprint = query.fingerprint();
    if !self.needs_fetch(T::KIND, &fingerprint) {
      return Ok(CacheSource::Cache);
    }

    let records = fetcher().await?;
    for record in &records {
      self
        .store
        .write_record(T::KIND, &record.cache_id().to_string(), record)?;
    }
    self.freshness.mark_fetched_now(T::KIND, &fingerprint)?;

    let kind = T::KIND;
    info!(kind = %kind, count = records.len(), "cached fetched records");
    Ok(CacheSource::Network)
  }

  /// Sync a single record scoped by `query`.
  pub async fn sync_record<T, F, Fut>(&self, query: &QueryParams, fetcher: F) -> Result<CacheSource>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    self
      .sync_records(query, || async move { Ok::<_, Report>(vec![fetcher().await?]) })
      .await
  }

  /// Sync a document stored as one file for the whole kind.
  pub async fn sync_singleton<T, F, Fut>(
    &self,
    kind: ResourceKind,
    fetcher: F,
  ) -> Result<CacheSource>
  where
    T: Serialize,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let fingerprint = Fingerprint::none();
    if !self.needs_fetch(kind, &fingerprint) {
      return Ok(CacheSource::Cache);
    }

    let document = fetcher().await?;
    self.store.write_singleton(kind, &document)?;
    self.freshness.mark_fetched_now(kind, &fingerprint)?;

    info!(kind = %kind, "cached fetched document");
    Ok(CacheSource::Network)
  }

  /// All cached records of `T` matching `predicate`.
  pub fn records<T, P>(&self, predicate: P) -> Result<Vec<T>>
  where
    T: Cacheable,
    P: Fn(&T) -> bool,
  {
    Ok(self.store.read_all(T::KIND, predicate)?)
  }

  /// A cached record of `T` by id.
  pub fn record<T: Cacheable>(&self, id: u64) -> Result<T> {
    Ok(self.store.read_one(T::KIND, &id.to_string())?)
  }

  pub fn singleton<T: DeserializeOwned>(&self, kind: ResourceKind) -> Result<T> {
    Ok(self.store.read_singleton(kind)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::freshness::NEVER_FETCHED;
  use crate::cache::CacheError;
  use chrono::Duration;
  use color_eyre::eyre::eyre;
  use serde::Deserialize;
  use std::cell::Cell;
  use tempfile::TempDir;

  #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
  struct Note {
    id: u64,
    project_id: u64,
    body: String,
  }

  impl Cacheable for Note {
    const KIND: ResourceKind = ResourceKind::Wiki;

    fn cache_id(&self) -> u64 {
      self.id
    }
  }

  fn note(id: u64, project_id: u64) -> Note {
    Note {
      id,
      project_id,
      body: format!("note {}", id),
    }
  }

  fn layer(dir: &TempDir) -> CacheLayer {
    CacheLayer::new(CachePaths::new(dir.path(), "acme"), TtlPolicy::default())
  }

  #[tokio::test]
  async fn test_fetches_once_within_ttl() {
    let temp_dir = TempDir::new().unwrap();
    let layer = layer(&temp_dir);
    let query = QueryParams::new().with("projectIdOrKey", 1);
    let calls = Cell::new(0);

    for expected in [CacheSource::Network, CacheSource::Cache] {
      let source = layer
        .sync_records(&query, || {
          calls.set(calls.get() + 1);
          async { Ok::<_, Report>(vec![note(1, 1), note(2, 1)]) }
        })
        .await
        .unwrap();
      assert_eq!(source, expected);
    }

    assert_eq!(calls.get(), 1);
    let notes: Vec<Note> = layer.records(|n: &Note| n.project_id == 1).unwrap();
    assert_eq!(notes.len(), 2);
  }

  #[tokio::test]
  async fn test_distinct_queries_share_records_but_not_clocks() {
    let temp_dir = TempDir::new().unwrap();
    let layer = layer(&temp_dir);

    layer
      .sync_records(&QueryParams::new().with("projectIdOrKey", 1), || async {
        Ok::<_, Report>(vec![note(1, 1)])
      })
      .await
      .unwrap();
    let source = layer
      .sync_records(&QueryParams::new().with("projectIdOrKey", 2), || async {
        Ok::<_, Report>(vec![note(2, 2)])
      })
      .await
      .unwrap();

    assert_eq!(source, CacheSource::Network);
    let all: Vec<Note> = layer.records(|_| true).unwrap();
    assert_eq!(all.len(), 2);
  }

  #[tokio::test]
  async fn test_failed_fetch_leaves_no_stamp() {
    let temp_dir = TempDir::new().unwrap();
    let layer = layer(&temp_dir);
    let query = QueryParams::new().with("projectIdOrKey", 1);

    let result = layer
      .sync_records::<Note, _, _>(&query, || async { Err(eyre!("boom")) })
      .await;
    assert!(result.is_err());

    let elapsed = layer
      .freshness()
      .elapsed_since_fetch(ResourceKind::Wiki, &query.fingerprint());
    assert!(layer.policy().is_stale(ResourceKind::Wiki, elapsed));
  }

  #[tokio::test]
  async fn test_failed_write_leaves_no_stamp() {
    let temp_dir = TempDir::new().unwrap();
    let paths = CachePaths::new(temp_dir.path(), "acme");
    // A plain file where the records directory belongs
    std::fs::create_dir_all(paths.root()).unwrap();
    std::fs::write(paths.records_path(ResourceKind::Wiki), "").unwrap();
    let layer = CacheLayer::new(paths, TtlPolicy::default());
    let query = QueryParams::new().with("projectIdOrKey", 1);

    let result = layer
      .sync_records(&query, || async {
        Ok::<_, Report>(vec![note(1, 1), note(2, 1)])
      })
      .await;
    assert!(result.is_err());

    assert_eq!(
      layer
        .freshness()
        .last_fetched_at(ResourceKind::Wiki, &query.fingerprint()),
      NEVER_FETCHED
    );
  }

  #[tokio::test]
  async fn test_force_refresh_and_overrides() {
    let temp_dir = TempDir::new().unwrap();
    let paths = CachePaths::new(temp_dir.path(), "acme");
    let layer = CacheLayer::new(
      paths,
      [(ResourceKind::Wiki, Duration::days(1))].into_iter().collect(),
    )
    .with_force_refresh(true);
    let query = QueryParams::new();

    for _ in 0..2 {
      let source = layer
        .sync_records(&query, || async { Ok::<_, Report>(vec![note(1, 1)]) })
        .await
        .unwrap();
      assert_eq!(source, CacheSource::Network);
    }
  }

  #[tokio::test]
  async fn test_refetch_overwrites_records() {
    let temp_dir = TempDir::new().unwrap();
    let paths = CachePaths::new(temp_dir.path(), "acme");
    let layer = CacheLayer::new(
      paths,
      [(ResourceKind::Wiki, Duration::zero())].into_iter().collect(),
    );
    let query = QueryParams::new().with("projectIdOrKey", 1);

    layer
      .sync_record(&query, || async { Ok::<_, Report>(note(1, 1)) })
      .await
      .unwrap();
    let mut edited = note(1, 1);
    edited.body = "edited".to_string();
    let edited_clone = edited.clone();
    layer
      .sync_record(&query, || async move { Ok::<_, Report>(edited_clone) })
      .await
      .unwrap();

    let stored: Note = layer.record(1).unwrap();
    assert_eq!(stored, edited);
  }

  #[tokio::test]
  async fn test_singleton_sync() {
    let temp_dir = TempDir::new().unwrap();
    let layer = layer(&temp_dir);

    let missing = layer.singleton::<Vec<String>>(ResourceKind::Status).unwrap_err();
    assert!(matches!(
      missing.downcast_ref::<CacheError>(),
      Some(CacheError::NotFound { .. })
    ));

    let source = layer
      .sync_singleton(ResourceKind::Status, || async {
        Ok::<_, Report>(vec!["Open".to_string(), "Closed".to_string()])
      })
      .await
      .unwrap();
    assert_eq!(source, CacheSource::Network);

    let source = layer
      .sync_singleton(ResourceKind::Status, || async {
        Ok::<_, Report>(Vec::<String>::new())
      })
      .await
      .unwrap();
    assert_eq!(source, CacheSource::Cache);

    let statuses: Vec<String> = layer.singleton(ResourceKind::Status).unwrap();
    assert_eq!(statuses, vec!["Open", "Closed"]);
  }
}
