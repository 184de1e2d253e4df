//! Durable key-value store: the only storage primitive the sync layer builds on.
//!
//! Keys and values are strings. Every `set` replaces one key atomically; no
//! operation spans multiple keys transactionally.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors reported by a [`KeyValueStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("storage is full")]
  Full,
  #[error("sqlite error: {0}")]
  Sqlite(rusqlite::Error),
  #[error("store lock poisoned")]
  Poisoned,
}

impl StoreError {
  /// Whether this error belongs to the "storage full" class.
  pub fn is_full(&self) -> bool {
    matches!(self, StoreError::Full)
  }
}

impl From<rusqlite::Error> for StoreError {
  fn from(value: rusqlite::Error) -> Self {
    match value {
      rusqlite::Error::SqliteFailure(ref err, _) if err.code == rusqlite::ErrorCode::DiskFull => {
        StoreError::Full
      }
      other => StoreError::Sqlite(other),
    }
  }
}

/// Persistent, process-surviving string map.
pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

  /// Replace the value stored under `key`.
  fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

  /// Delete `key`. Deleting an absent key is not an error.
  fn remove(&self, key: &str) -> Result<(), StoreError>;

  fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
    for key in keys {
      self.remove(key)?;
    }
    Ok(())
  }
}

/// Write `value`, recovering from a full store by evicting `evictable` keys
/// once and retrying exactly once. A second failure is returned as-is.
pub fn set_with_eviction(
  store: &dyn KeyValueStore,
  key: &str,
  value: &str,
  evictable: &[&str],
) -> Result<(), StoreError> {
  match store.set(key, value) {
    Err(e) if e.is_full() => {
      tracing::warn!(key, evicted = evictable.len(), "store full, evicting cache and retrying");
      store.remove_many(evictable)?;
      store.set(key, value)
    }
    other => other,
  }
}
