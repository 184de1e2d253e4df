//! Durable FIFO queue of user actions waiting to be sent to the server.
//!
//! The whole queue is stored as one JSON array under a single key, so every
//! change is one atomic key replacement.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::cache::EntityType;
use crate::clock::Clock;
use crate::store::{set_with_eviction, KeyValueStore};

/// Storage key of the serialized queue.
pub const QUEUE_KEY: &str = "offline:action_queue";

/// Kinds of deferred mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum ActionKind {
  ApproveConflict,
  RejectConflict,
}

impl std::fmt::Display for ActionKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ActionKind::ApproveConflict => write!(f, "approve-conflict"),
      ActionKind::RejectConflict => write!(f, "reject-conflict"),
    }
  }
}

/// One deferred mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedAction {
  pub id: String,
  pub kind: ActionKind,
  pub target_id: String,
  #[serde(default)]
  pub notes: Option<String>,
  pub enqueued_at: DateTime<Utc>,
}

/// Ordered, durable list of pending actions.
pub struct ActionQueue {
  store: Arc<dyn KeyValueStore>,
  clock: Arc<dyn Clock>,
  /// Serializes read-modify-write cycles on the queue key
  write_lock: Mutex<()>,
}

impl ActionQueue {
  pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
    Self {
      store,
      clock,
      write_lock: Mutex::new(()),
    }
  }

  /// Append a new action and persist the queue immediately.
  pub fn enqueue(
    &self,
    kind: ActionKind,
    target_id: &str,
    notes: Option<&str>,
  ) -> Result<QueuedAction> {
    let _guard = self
      .write_lock
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let now = self.clock.now();
    let action = QueuedAction {
      id: generate_id(now),
      kind,
      target_id: target_id.to_string(),
      notes: notes.map(String::from),
      enqueued_at: now,
    };

    let mut actions = self.load()?;
    actions.push(action.clone());
    self.save(&actions)?;

    tracing::info!(id = %action.id, kind = %action.kind, target_id = %action.target_id, "queued action");
    Ok(action)
  }

  /// Current contents in enqueue order.
  pub fn list(&self) -> Result<Vec<QueuedAction>> {
    self.load()
  }

  pub fn len(&self) -> Result<usize> {
    Ok(self.load()?.len())
  }

  pub fn is_empty(&self) -> Result<bool> {
    Ok(self.len()? == 0)
  }

  /// Delete the action with `id`. Absent ids are ignored.
  pub fn remove(&self, id: &str) -> Result<()> {
    let _guard = self
      .write_lock
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut actions = self.load()?;
    let before = actions.len();
    actions.retain(|a| a.id != id);
    if actions.len() == before {
      return Ok(());
    }

    self.save(&actions)
  }

  /// Drop every pending action.
  pub fn clear(&self) -> Result<()> {
    let _guard = self
      .write_lock
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    self
      .store
      .remove(QUEUE_KEY)
      .map_err(|e| eyre!("Failed to clear action queue: {}", e))
  }

  fn load(&self) -> Result<Vec<QueuedAction>> {
    let raw = self
      .store
      .get(QUEUE_KEY)
      .map_err(|e| eyre!("Failed to read action queue: {}", e))?;

    match raw {
      Some(raw) => {
        serde_json::from_str(&raw).map_err(|e| eyre!("Failed to parse action queue: {}", e))
      }
      None => Ok(Vec::new()),
    }
  }

  fn save(&self, actions: &[QueuedAction]) -> Result<()> {
    let raw = serde_json::to_string(actions)
      .map_err(|e| eyre!("Failed to serialize action queue: {}", e))?;

    // Cached read models are expendable, queued actions are not
    set_with_eviction(
      self.store.as_ref(),
      QUEUE_KEY,
      &raw,
      &EntityType::all_storage_keys(),
    )
    .map_err(|e| eyre!("Failed to persist action queue: {}", e))
  }
}

/// Millisecond timestamp plus a random suffix, so ids stay unique across
/// restarts even when the queue was empty.
fn generate_id(now: DateTime<Utc>) -> String {
  let suffix: String = rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(8)
    .map(|c| char::from(c).to_ascii_lowercase())
    .collect();

  format!("{}-{}", now.timestamp_millis(), suffix)
}
