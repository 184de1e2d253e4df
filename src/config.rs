use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::TtlPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub store: StoreConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub probe: ProbeConfig,
  #[serde(default)]
  pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the field-operations API, e.g. "https://ops.example.com/api/"
  pub base_url: url::Url,
  #[serde(default = "default_api_timeout")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
  /// Database file (defaults to $XDG_DATA_HOME/fieldsync/store.db)
  pub path: Option<PathBuf>,
  /// Upper bound on database pages; writes past it report "storage full"
  pub max_pages: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  #[serde(default)]
  pub ttl: TtlConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
  pub kpis_secs: i64,
  pub urgent_conflicts_secs: i64,
  pub active_tours_secs: i64,
  pub notifications_secs: i64,
}

impl Default for TtlConfig {
  fn default() -> Self {
    let policy = TtlPolicy::default();
    Self {
      kpis_secs: policy.kpis.num_seconds(),
      urgent_conflicts_secs: policy.urgent_conflicts.num_seconds(),
      active_tours_secs: policy.active_tours.num_seconds(),
      notifications_secs: policy.notifications.num_seconds(),
    }
  }
}

/// Longest TTL accepted from configuration (30 days).
pub const MAX_TTL_SECS: i64 = 30 * 24 * 60 * 60;

impl TtlConfig {
  /// Convert to a [`TtlPolicy`], rejecting TTLs outside `1..=MAX_TTL_SECS`.
  pub fn policy(&self) -> Result<TtlPolicy> {
    Ok(TtlPolicy {
      kpis: ttl("kpis_secs", self.kpis_secs)?,
      urgent_conflicts: ttl("urgent_conflicts_secs", self.urgent_conflicts_secs)?,
      active_tours: ttl("active_tours_secs", self.active_tours_secs)?,
      notifications: ttl("notifications_secs", self.notifications_secs)?,
    })
  }
}

fn ttl(field: &str, secs: i64) -> Result<Duration> {
  if !(1..=MAX_TTL_SECS).contains(&secs) {
    return Err(eyre!(
      "cache.ttl.{} must be between 1 and {} seconds, got {}",
      field,
      MAX_TTL_SECS,
      secs
    ));
  }

  Duration::try_seconds(secs).ok_or_else(|| eyre!("cache.ttl.{} is out of range", field))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
  /// Endpoint used for reachability checks (defaults to the API base URL)
  pub health_url: Option<url::Url>,
  pub timeout_secs: u64,
  /// State assumed before the first successful check
  pub assume_online: bool,
}

impl Default for ProbeConfig {
  fn default() -> Self {
    Self {
      health_url: None,
      timeout_secs: 3,
      assume_online: false,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// Period of the drain trigger while a dependent screen is active
  pub drain_interval_secs: u64,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      drain_interval_secs: 60,
    }
  }
}

fn default_api_timeout() -> u64 {
  15
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./fieldsync.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/fieldsync/config.yaml
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

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/fieldsync/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("fieldsync.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("fieldsync").join("config.yaml");
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

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;

    if config.api.base_url.cannot_be_a_base() {
      return Err(eyre!("api.base_url must be a hierarchical URL"));
    }
    config.cache.ttl.policy()?;
    if config.sync.drain_interval_secs == 0 {
      return Err(eyre!("sync.drain_interval_secs must be at least 1"));
    }

    Ok(config)
  }

  pub fn api_timeout(&self) -> std::time::Duration {
    std::time::Duration::from_secs(self.api.timeout_secs)
  }

  pub fn probe_timeout(&self) -> std::time::Duration {
    std::time::Duration::from_secs(self.probe.timeout_secs)
  }

  pub fn drain_interval(&self) -> std::time::Duration {
    std::time::Duration::from_secs(self.sync.drain_interval_secs)
  }

  /// URL the connectivity probe checks.
  pub fn health_url(&self) -> url::Url {
    self
      .probe
      .health_url
      .clone()
      .unwrap_or_else(|| self.api.base_url.clone())
  }

  /// Get the API bearer token from the environment, if one is set.
  ///
  /// Checks FIELDSYNC_API_TOKEN. Credentials are never persisted by this crate.
  pub fn get_api_token() -> Option<String> {
    std::env::var("FIELDSYNC_API_TOKEN")
      .ok()
      .filter(|t| !t.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::from_yaml("api:\n  base_url: https://ops.example.com/api/\n").unwrap();

    assert_eq!(config.api.timeout_secs, 15);
    assert_eq!(config.cache.ttl.policy().unwrap(), TtlPolicy::default());
    assert!(!config.probe.assume_online);
    assert_eq!(config.health_url(), config.api.base_url);
    assert_eq!(config.drain_interval(), std::time::Duration::from_secs(60));
    assert!(config.store.path.is_none());
  }

  #[test]
  fn test_overrides() {
    let yaml = r#"
api:
  base_url: https://ops.example.com/api/
  timeout_secs: 5
store:
  path: /tmp/fieldsync.db
  max_pages: 2048
cache:
  ttl:
    kpis_secs: 30
probe:
  health_url: https://ops.example.com/health
  assume_online: true
sync:
  drain_interval_secs: 10
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.api.timeout_secs, 5);
    assert_eq!(config.store.max_pages, Some(2048));
    let policy = config.cache.ttl.policy().unwrap();
    assert_eq!(policy.kpis, Duration::seconds(30));
    assert_eq!(policy.urgent_conflicts, TtlPolicy::default().urgent_conflicts);
    assert!(config.probe.assume_online);
    assert_eq!(config.probe.timeout_secs, 3);
    assert_eq!(config.health_url().path(), "/health");
    assert_eq!(config.sync.drain_interval_secs, 10);
  }

  #[test]
  fn test_oversized_ttl_is_rejected() {
    let yaml = "api:\n  base_url: https://ops.example.com/api/\ncache:\n  ttl:\n    kpis_secs: 10000000000000\n";
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("kpis_secs"));
  }

  #[test]
  fn test_non_positive_ttl_is_rejected() {
    for secs in ["-60", "0"] {
      let yaml = format!(
        "api:\n  base_url: https://ops.example.com/api/\ncache:\n  ttl:\n    notifications_secs: {secs}\n"
      );
      let err = Config::from_yaml(&yaml).unwrap_err();
      assert!(err.to_string().contains("notifications_secs"));
    }
  }

  #[test]
  fn test_ttl_upper_bound_is_inclusive() {
    let ttl = TtlConfig {
      active_tours_secs: MAX_TTL_SECS,
      ..TtlConfig::default()
    };
    assert_eq!(
      ttl.policy().unwrap().active_tours,
      Duration::seconds(MAX_TTL_SECS)
    );
  }

  #[test]
  fn test_zero_drain_interval_is_rejected() {
    let yaml = "api:\n  base_url: https://ops.example.com/api/\nsync:\n  drain_interval_secs: 0\n";
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("drain_interval_secs"));
  }

  #[test]
  fn test_missing_base_url_is_rejected() {
    assert!(Config::from_yaml("store:\n  max_pages: 10\n").is_err());
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let err = Config::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
    assert!(err.to_string().contains("not found"));
  }

  #[test]
  fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "api:\n  base_url: http://localhost:8080/\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.api.base_url.as_str(), "http://localhost:8080/");
  }
}
