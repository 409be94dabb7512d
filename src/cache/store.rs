//! Record store for reading and writing cached documents.
//! Handles JSON serialization and filesystem operations; no in-memory layer.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use super::error::{CacheError, Result};
use super::freshness::{FreshnessTracker, NEVER_FETCHED};
use super::fingerprint::Fingerprint;
use super::kind::{ResourceKind, StorageShape};
use super::paths::CachePaths;

/// Statistics about one kind's slice of the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindStats {
  pub kind: ResourceKind,
  /// Number of cached records (0 or 1 for singletons).
  pub records: usize,
  /// Total size in bytes.
  pub total_bytes: u64,
  /// Most recent freshness stamp across all query fingerprints.
  pub last_fetched_at: Option<DateTime<Utc>>,
}

/// Filesystem-backed record store for one space.
#[derive(Debug, Clone)]
pub struct RecordStore {
  paths: CachePaths,
}

impl RecordStore {
  pub fn new(paths: CachePaths) -> Self {
    Self { paths }
  }

  pub fn paths(&self) -> &CachePaths {
    &self.paths
  }

  /// Write one record of a collection kind. Last write wins.
  pub fn write_record<T: Serialize + ?Sized>(
    &self,
    kind: ResourceKind,
    id: &str,
    document: &T,
  ) -> Result<()> {
    expect_shape(kind, StorageShape::Collection)?;
    let path = self.paths.record_path(kind, id);
    write_json(&path, document)
  }

  /// Read every record of a collection kind that satisfies `predicate`.
  ///
  /// A missing directory yields no records. A record that fails to parse
  /// aborts the whole scan.
  pub fn read_all<T, P>(&self, kind: ResourceKind, predicate: P) -> Result<Vec<T>>
  where
    T: DeserializeOwned,
    P: Fn(&T) -> bool,
  {
    expect_shape(kind, StorageShape::Collection)?;
    let dir = self.paths.records_path(kind);

    let entries = match fs::read_dir(&dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(CacheError::io(&dir, e)),
    };

    let mut records = Vec::new();
    for entry in entries {
      let entry = entry.map_err(|e| CacheError::io(&dir, e))?;
      let path = entry.path();
      if !path.extension().is_some_and(|ext| ext == "json") || !path.is_file() {
        continue;
      }

      let document: T = read_json(&path)?;
      if predicate(&document) {
        records.push(document);
      }
    }

    Ok(records)
  }

  /// Read one record of a collection kind by id.
  pub fn read_one<T: DeserializeOwned>(&self, kind: ResourceKind, id: &str) -> Result<T> {
    expect_shape(kind, StorageShape::Collection)?;
    let path = self.paths.record_path(kind, id);
    read_json_if_exists(&path)?.ok_or_else(|| CacheError::NotFound {
      kind,
      id: id.to_string(),
    })
  }

  pub fn write_singleton<T: Serialize + ?Sized>(
    &self,
    kind: ResourceKind,
    document: &T,
  ) -> Result<()> {
    expect_shape(kind, StorageShape::Singleton)?;
    write_json(&self.paths.records_path(kind), document)
  }

  pub fn read_singleton<T: DeserializeOwned>(&self, kind: ResourceKind) -> Result<T> {
    expect_shape(kind, StorageShape::Singleton)?;
    read_json_if_exists(&self.paths.records_path(kind))?.ok_or_else(|| CacheError::NotFound {
      kind,
      id: kind.name().to_string(),
    })
  }

  /// Remove a kind's records and every freshness stamp it owns.
  pub fn clear(&self, kind: ResourceKind) -> Result<()> {
    let records = self.paths.records_path(kind);
    match kind.shape() {
      StorageShape::Collection => delete_dir(&records)?,
      StorageShape::Singleton => delete(&records)?,
    }

    for stamp in self.freshness_files(kind)? {
      delete(&self.paths.root().join(stamp))?;
    }
    Ok(())
  }

  /// Remove everything cached for this space.
  pub fn clear_all(&self) -> Result<()> {
    delete_dir(self.paths.root())
  }

  pub fn stats(&self, kind: ResourceKind) -> Result<KindStats> {
    let records_path = self.paths.records_path(kind);
    let mut records = 0;
    let mut total_bytes = 0;

    match kind.shape() {
      StorageShape::Singleton => {
        if let Ok(meta) = fs::metadata(&records_path) {
          records = 1;
          total_bytes = meta.len();
        }
      }
      StorageShape::Collection => match fs::read_dir(&records_path) {
        Ok(entries) => {
          for entry in entries {
            let entry = entry.map_err(|e| CacheError::io(&records_path, e))?;
            if entry.path().extension().is_some_and(|e| e == "json") {
              records += 1;
              total_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
          }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(CacheError::io(&records_path, e)),
      },
    }

    let tracker = FreshnessTracker::new(self.paths.clone());
    let last_fetched_at = self
      .freshness_files(kind)?
      .iter()
      .filter_map(|name| {
        let fp = name
          .strip_suffix(".time")?
          .strip_prefix(kind.name())?
          .trim_start_matches('.');
        let at = tracker.last_fetched_at(kind, &Fingerprint::from_hex(fp));
        (at != NEVER_FETCHED).then_some(at)
      })
      .max();

    Ok(KindStats {
      kind,
      records,
      total_bytes,
      last_fetched_at,
    })
  }

  fn freshness_files(&self, kind: ResourceKind) -> Result<Vec<String>> {
    let root = self.paths.root();
    let entries = match fs::read_dir(root) {
      Ok(entries) => entries,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(CacheError::io(root, e)),
    };

    let mut names = Vec::new();
    for entry in entries {
      let entry = entry.map_err(|e| CacheError::io(root, e))?;
      if let Some(name) = entry.file_name().to_str() {
        if CachePaths::is_freshness_file_of(kind, name) {
          names.push(name.to_string());
        }
      }
    }
    Ok(names)
  }
}

fn expect_shape(kind: ResourceKind, expected: StorageShape) -> Result<()> {
  if kind.shape() == expected {
    Ok(())
  } else {
    Err(CacheError::WrongShape {
      kind,
      expected: expected.as_str(),
    })
  }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
  let contents = fs::read_to_string(path).map_err(|e| CacheError::io(path, e))?;
  serde_json::from_str(&contents).map_err(|e| CacheError::malformed(path, e))
}

fn read_json_if_exists<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
  let contents = match fs::read_to_string(path) {
    Ok(contents) => contents,
    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
    Err(e) => return Err(CacheError::io(path, e)),
  };
  serde_json::from_str(&contents)
    .map(Some)
    .map_err(|e| CacheError::malformed(path, e))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, document: &T) -> Result<()> {
  // Ensure parent directory exists
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
  }

  let json = serde_json::to_vec(document).map_err(|e| CacheError::Encode {
    path: path.to_path_buf(),
    source: e,
  })?;

  // Write atomically via temp file
  let temp_path = path.with_extension("tmp");
  let write = || -> std::io::Result<()> {
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(&json)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)
  };
  write().map_err(|e| {
    let _ = fs::remove_file(&temp_path);
    CacheError::io(path, e)
  })
}

fn delete(path: &Path) -> Result<()> {
  match fs::remove_file(path) {
    Err(e) if e.kind() != ErrorKind::NotFound => Err(CacheError::io(path, e)),
    _ => Ok(()),
  }
}

fn delete_dir(path: &Path) -> Result<()> {
  match fs::remove_dir_all(path) {
    Err(e) if e.kind() != ErrorKind::NotFound => Err(CacheError::io(path, e)),
    _ => Ok(()),
  }
}
