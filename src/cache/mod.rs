//! Local on-disk cache for Backlog resources.
//!
//! This module provides a filesystem mirror of fetched API data that:
//! - Maps each resource kind to a fixed directory (collections) or file (singletons)
//! - Tracks a last-fetched stamp per (kind, query fingerprint)
//! - Decides staleness from one per-kind TTL table
//! - Reads back the merged view of old and newly written records from disk

mod error;
mod fingerprint;
mod freshness;
mod kind;
mod layer;
mod paths;
mod policy;
mod store;
mod traits;

pub use error::CacheError;
pub use fingerprint::QueryParams;
pub use kind::ResourceKind;
pub use layer::CacheLayer;
pub use paths::CachePaths;
pub use policy::TtlPolicy;
pub use store::KindStats;
pub use traits::{CacheSource, Cacheable};
