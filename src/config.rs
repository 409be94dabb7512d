use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::cache::{CachePaths, ResourceKind, TtlPolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Backlog space identifier (the `<space>` in `<space>.backlog.jp`)
  pub space: Option<String>,
  #[serde(default = "default_domain")]
  pub domain: String,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Write logs here instead of stderr
  pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Directory holding the cache tree (relative paths resolve from the working directory)
  #[serde(default = "default_cache_root")]
  pub root: PathBuf,
  /// Per-kind TTL overrides in seconds, keyed by kind name
  #[serde(default)]
  pub ttl: BTreeMap<String, u64>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      root: default_cache_root(),
      ttl: BTreeMap::new(),
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      space: None,
      domain: default_domain(),
      cache: CacheConfig::default(),
      log_file: None,
    }
  }
}

fn default_domain() -> String {
  "backlog.jp".to_string()
}

fn default_cache_root() -> PathBuf {
  PathBuf::from(".backlog")
}

impl Config {
  /// Load configuration from file, falling back to defaults.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./blg.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/blg/config.yaml
  ///
  /// `BACKLOG_SPACE` overrides the configured space.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    if let Ok(space) = std::env::var("BACKLOG_SPACE") {
      if !space.is_empty() {
        config.space = Some(space);
      }
    }

    // Surface bad kind names at startup rather than on first use
    config.ttl_policy()?;

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("blg.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("blg").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    Ok(serde_yaml::from_str(contents)?)
  }

  pub fn space(&self) -> Result<&str> {
    self
      .space
      .as_deref()
      .filter(|s| !s.is_empty())
      .ok_or_else(|| eyre!("Backlog space not set. Set BACKLOG_SPACE or `space` in blg.yaml."))
  }

  pub fn cache_paths(&self) -> Result<CachePaths> {
    Ok(CachePaths::new(&self.cache.root, self.space()?))
  }

  /// TTL table with the configured overrides applied.
  pub fn ttl_policy(&self) -> Result<TtlPolicy> {
    self
      .cache
      .ttl
      .iter()
      .map(|(name, secs)| {
        let kind: ResourceKind = name
          .parse()
          .map_err(|e| eyre!("Invalid cache.ttl entry: {}", e))?;
        let secs = i64::try_from(*secs).map_err(|_| eyre!("TTL for {} is too large", name))?;
        Ok((kind, Duration::seconds(secs)))
      })
      .collect()
  }

  /// Browser URL for a path in the space.
  pub fn web_url(&self, path: &str) -> Result<String> {
    Ok(format!(
      "https://{}.{}/{}",
      self.space()?,
      self.domain,
      path.trim_start_matches('/')
    ))
  }

  /// Get the Backlog API key from environment variables.
  ///
  /// Checks BACKLOG_TOKEN first, then BLG_TOKEN as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("BACKLOG_TOKEN")
      .or_else(|_| std::env::var("BLG_TOKEN"))
      .map_err(|_| {
        eyre!("Backlog API key not found. Set BACKLOG_TOKEN or BLG_TOKEN environment variable.")
      })
  }
}
