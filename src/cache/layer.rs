//! Freshness cache: one entry per entity type, expiry treated as absence.

use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

use super::entry::CacheEntry;
use super::traits::EntityType;
use crate::clock::Clock;
use crate::store::{set_with_eviction, KeyValueStore, StoreError};

/// Cache layer over the key-value store.
///
/// There is no background sweep: expired or unreadable entries are deleted
/// when a read runs into them.
pub struct FreshnessCache {
  store: Arc<dyn KeyValueStore>,
  clock: Arc<dyn Clock>,
}

impl FreshnessCache {
  pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
    Self { store, clock }
  }

  /// Return the entry for `entity` if it is still valid.
  ///
  /// Store failures are logged and reported as a miss.
  pub fn read<T: DeserializeOwned>(&self, entity: EntityType) -> Option<CacheEntry<T>> {
    let key = entity.storage_key();

    let raw = match self.store.get(key) {
      Ok(Some(raw)) => raw,
      Ok(None) => return None,
      Err(e) => {
        tracing::warn!(entity = entity.name(), error = %e, "cache read failed, treating as miss");
        return None;
      }
    };

    let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
      Ok(entry) => entry,
      Err(e) => {
        tracing::warn!(entity = entity.name(), error = %e, "discarding undecodable cache entry");
        self.purge(key);
        return None;
      }
    };

    if !entry.is_valid_at(self.clock.now()) {
      tracing::debug!(entity = entity.name(), expired_at = %entry.expires_at, "cache entry expired");
      self.purge(key);
      return None;
    }

    Some(entry)
  }

  /// Replace the entry for `entity` with a freshly timestamped one.
  ///
  /// If the store is full, every cache entry is cleared and the write retried
  /// once. A second failure is returned as a fatal write error.
  pub fn write<T: Serialize>(&self, entity: EntityType, payload: &T, ttl: Duration) -> Result<()> {
    let entry = CacheEntry::new(payload, self.clock.now(), ttl)
      .ok_or_else(|| eyre!("TTL {} for {} overflows the expiry time", ttl, entity.name()))?;
    let raw = serde_json::to_string(&entry)
      .map_err(|e| eyre!("Failed to serialize {} cache entry: {}", entity.name(), e))?;

    set_with_eviction(
      self.store.as_ref(),
      entity.storage_key(),
      &raw,
      &EntityType::all_storage_keys(),
    )
    .map_err(|e| eyre!("Failed to write {} cache entry: {}", entity.name(), e))
  }

  /// Delete every known cache entry.
  pub fn clear_all(&self) -> Result<(), StoreError> {
    self.store.remove_many(&EntityType::all_storage_keys())
  }

  fn purge(&self, key: &str) {
    if let Err(e) = self.store.remove(key) {
      tracing::warn!(key, error = %e, "failed to purge cache entry");
    }
  }
}
