//! Core traits and types for the caching system.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Named categories of cached data. Each has one storage key and its own TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
  Kpis,
  UrgentConflicts,
  ActiveTours,
  Notifications,
}

impl EntityType {
  pub const ALL: [EntityType; 4] = [
    EntityType::Kpis,
    EntityType::UrgentConflicts,
    EntityType::ActiveTours,
    EntityType::Notifications,
  ];

  /// Key of this entity's entry in the key-value store.
  pub fn storage_key(self) -> &'static str {
    match self {
      EntityType::Kpis => "cache:kpis",
      EntityType::UrgentConflicts => "cache:conflicts_urgent",
      EntityType::ActiveTours => "cache:tours_active",
      EntityType::Notifications => "cache:notifications",
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      EntityType::Kpis => "kpis",
      EntityType::UrgentConflicts => "urgent conflicts",
      EntityType::ActiveTours => "active tours",
      EntityType::Notifications => "notifications",
    }
  }

  /// Storage keys of every cache entry.
  pub fn all_storage_keys() -> [&'static str; 4] {
    Self::ALL.map(EntityType::storage_key)
  }
}

/// Trait for payloads that can be cached.
///
/// A payload is cached as a single serialized whole under its entity type.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  fn entity_type() -> EntityType;
}

/// Time-to-live per entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
  pub kpis: Duration,
  pub urgent_conflicts: Duration,
  pub active_tours: Duration,
  pub notifications: Duration,
}

impl TtlPolicy {
  pub fn ttl(&self, entity: EntityType) -> Duration {
    match entity {
      EntityType::Kpis => self.kpis,
      EntityType::UrgentConflicts => self.urgent_conflicts,
      EntityType::ActiveTours => self.active_tours,
      EntityType::Notifications => self.notifications,
    }
  }
}

impl Default for TtlPolicy {
  fn default() -> Self {
    Self {
      kpis: Duration::minutes(5),
      urgent_conflicts: Duration::minutes(15),
      active_tours: Duration::minutes(10),
      notifications: Duration::minutes(2),
    }
  }
}

/// Result of a read, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from a valid cache entry.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }

  /// Nothing usable in cache and no live data: an empty default.
  pub fn miss(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Miss,
      cached_at: None,
    }
  }

  /// The `fromCache` flag: true whenever the data is not a live fetch.
  pub fn is_from_cache(&self) -> bool {
    self.source != CacheSource::Network
  }
}

/// Indicates where read data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Valid cache entry
  Cache,
  /// No valid entry; data is the empty default
  Miss,
}
