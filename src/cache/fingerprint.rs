//! Order-independent fingerprints of query parameter sets.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Query parameters as a key -> values multimap.
///
/// Doubles as the query string sent to the API, so the same value that
/// scopes a freshness clock is the one that produced the cached data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
  values: BTreeMap<String, Vec<String>>,
}

impl QueryParams {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a value to a key.
  pub fn add(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
    self
      .values
      .entry(key.into())
      .or_default()
      .push(value.to_string());
    self
  }

  /// Builder form of [`QueryParams::add`].
  pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
    self.add(key, value);
    self
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Flattened `(key, value)` pairs, suitable for a URL query string.
  pub fn pairs(&self) -> Vec<(&str, &str)> {
    self
      .values
      .iter()
      .flat_map(|(k, vs)| vs.iter().map(move |v| (k.as_str(), v.as_str())))
      .collect()
  }

  pub fn fingerprint(&self) -> Fingerprint {
    Fingerprint::of(Some(self))
  }
}

/// Deterministic hash of a query parameter set; empty for "no query".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
  /// The unscoped slot shared by queries without parameters.
  pub fn none() -> Self {
    Self::default()
  }

  pub fn of(params: Option<&QueryParams>) -> Self {
    let Some(params) = params.filter(|p| !p.is_empty()) else {
      return Self::none();
    };

    // Keys come out of the map sorted. Each entry is a JSON array, so
    // spaces or brackets inside keys and values cannot merge two entries.
    let entries: Vec<Value> = params
      .values
      .iter()
      .map(|(key, values)| {
        let mut values = values.clone();
        values.sort();
        Value::Array(vec![
          Value::String(key.clone()),
          Value::Array(values.into_iter().map(Value::String).collect()),
        ])
      })
      .collect();

    let mut hasher = Sha256::new();
    hasher.update(Value::Array(entries).to_string().as_bytes());
    Self(hex::encode(hasher.finalize()))
  }

  /// Rebuild a fingerprint from the hex part of a stamp file name.
  pub(crate) fn from_hex(hex: &str) -> Self {
    Self(hex.to_string())
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_and_absent_are_unscoped() {
    assert_eq!(Fingerprint::of(None).as_str(), "");
    assert_eq!(QueryParams::new().fingerprint().as_str(), "");
    assert!(Fingerprint::none().is_empty());
  }

  #[test]
  fn test_insertion_order_does_not_matter() {
    let mut a = QueryParams::new();
    a.add("sort", "updated");
    a.add("order", "desc");

    let mut b = QueryParams::new();
    b.add("order", "desc");
    b.add("sort", "updated");

    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(a.fingerprint().as_str().len(), 64);
  }

  #[test]
  fn test_value_order_does_not_matter() {
    let a = QueryParams::new()
      .with("statusId[]", 1)
      .with("statusId[]", 2);
    let b = QueryParams::new()
      .with("statusId[]", 2)
      .with("statusId[]", 1);
    assert_eq!(a.fingerprint(), b.fingerprint());
  }

  #[test]
  fn test_differences_change_the_fingerprint() {
    let base = QueryParams::new()
      .with("foo", "bar")
      .with("fizz", "buzz")
      .with("hello", "world");
    let changed_value = QueryParams::new()
      .with("foo", "bar")
      .with("fizz", "buzz")
      .with("hello", "there");
    let changed_key = QueryParams::new()
      .with("foo", "bar")
      .with("fizz", "buzz")
      .with("hallo", "world");

    assert!(!base.fingerprint().is_empty());
    assert_ne!(base.fingerprint(), changed_value.fingerprint());
    assert_ne!(base.fingerprint(), changed_key.fingerprint());
  }

  #[test]
  fn test_separators_inside_values_do_not_collide() {
    let joined = QueryParams::new().with("keyword", "a b");
    let split = QueryParams::new().with("keyword", "a").with("keyword", "b");
    assert_ne!(joined.fingerprint(), split.fingerprint());

    let bracketed = QueryParams::new().with("a", "x],b:[y");
    let separate = QueryParams::new().with("a", "x").with("b", "y");
    assert_ne!(bracketed.fingerprint(), separate.fingerprint());
  }

  #[test]
  fn test_pairs_follow_key_order() {
    let q = QueryParams::new()
      .with("sort", "updated")
      .with("count", 20)
      .with("count", 50);
    assert_eq!(
      q.pairs(),
      vec![("count", "20"), ("count", "50"), ("sort", "updated")]
    );
  }

  #[test]
  fn test_known_digest() {
    let q = QueryParams::new().with("a", 2).with("a", 1);
    let mut hasher = Sha256::new();
    hasher.update(br#"[["a",["1","2"]]]"#);
    assert_eq!(q.fingerprint().as_str(), hex::encode(hasher.finalize()));
  }
}
