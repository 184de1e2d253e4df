//! In-process store with an optional size bound.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{KeyValueStore, StoreError};

/// Store kept in memory. Does not survive the process; useful for tests and
/// ephemeral sessions. With a capacity, writes that would push the total
/// value size past it fail with [`StoreError::Full`].
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: Mutex<BTreeMap<String, String>>,
  capacity: Option<usize>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Bound the total size (in bytes) of stored values.
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      entries: Mutex::new(BTreeMap::new()),
      capacity: Some(capacity),
    }
  }

  pub fn keys(&self) -> Result<Vec<String>, StoreError> {
    let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
    Ok(entries.keys().cloned().collect())
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
    Ok(entries.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;

    if let Some(capacity) = self.capacity {
      let used: usize = entries
        .iter()
        .filter(|(k, _)| k.as_str() != key)
        .map(|(_, v)| v.len())
        .sum();
      if used + value.len() > capacity {
        return Err(StoreError::Full);
      }
    }

    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
    entries.remove(key);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_replacing_a_key_does_not_count_twice() {
    let store = MemoryStore::with_capacity(10);
    store.set("k", "12345678").unwrap();
    store.set("k", "abcdefgh").unwrap();
    assert_eq!(store.get("k").unwrap().as_deref(), Some("abcdefgh"));
    assert!(store.set("other", "xyz").unwrap_err().is_full());
  }

  #[test]
  fn test_remove_absent_key_is_noop() {
    let store = MemoryStore::new();
    store.remove("missing").unwrap();
    assert!(store.keys().unwrap().is_empty());
  }
}
