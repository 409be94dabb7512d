//! Errors raised by the cache subsystem.

use std::path::PathBuf;

use thiserror::Error;

use super::kind::ResourceKind;

#[derive(Error, Debug)]
pub enum CacheError {
  #[error("unknown resource kind: {0}")]
  UnknownKind(String),

  #[error("{kind} is not stored as a {expected}")]
  WrongShape {
    kind: ResourceKind,
    expected: &'static str,
  },

  #[error("no cached {kind} record for {id}")]
  NotFound { kind: ResourceKind, id: String },

  #[error("malformed cache record {}: {source}", path.display())]
  MalformedRecord {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("cannot encode cache record {}: {source}", path.display())]
  Encode {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("cache I/O error at {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl CacheError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }

  pub(crate) fn malformed(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
    Self::MalformedRecord {
      path: path.into(),
      source,
    }
  }
}

pub type Result<T> = std::result::Result<T, CacheError>;
