//! Core traits and types for the caching system.

use serde::{de::DeserializeOwned, Serialize};

use super::kind::ResourceKind;

/// Trait for entities stored one-file-per-record.
///
/// Implementors name the kind they are filed under and the numeric id that
/// addresses them on disk.
pub trait Cacheable: Serialize + DeserializeOwned {
  /// Kind this entity is stored under (must be a collection kind)
  const KIND: ResourceKind;

  /// Identifier used as the record file name
  fn cache_id(&self) -> u64;
}

/// Indicates whether a sync went to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network, now persisted
  Network,
  /// Cache still within its TTL, no request made
  Cache,
}
