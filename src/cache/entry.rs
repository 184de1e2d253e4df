use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A cached payload with its write and expiry timestamps.
///
/// Serialized as `{"data": ..., "cachedAt": ..., "expiresAt": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
  pub data: T,
  #[serde(rename = "cachedAt")]
  pub written_at: DateTime<Utc>,
  #[serde(rename = "expiresAt")]
  pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
  /// Returns `None` when `written_at + ttl` is not a representable instant.
  pub fn new(data: T, written_at: DateTime<Utc>, ttl: Duration) -> Option<Self> {
    let expires_at = written_at.checked_add_signed(ttl)?;
    Some(Self {
      data,
      written_at,
      expires_at,
    })
  }

  /// An entry is valid up to and including its expiry instant.
  pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
    now <= self.expires_at
  }
}
