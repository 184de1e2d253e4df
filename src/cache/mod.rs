//! Freshness-bounded caching of read-model data for offline support.
//!
//! This module provides:
//! - One cache entry per entity type, replaced whole on refresh
//! - Per-entity-type time-to-live, with expiry treated as absence
//! - Lazy eviction of expired entries on read
//! - Clear-and-retry-once recovery when the store reports it is full

mod entry;
mod layer;
mod traits;

pub use entry::CacheEntry;
pub use layer::FreshnessCache;
pub use traits::{CacheResult, CacheSource, Cacheable, EntityType, TtlPolicy};
