//! Offline-first data and synchronization layer for crate-logistics field
//! operations.
//!
//! - [`cache`]: freshness-bounded cache of read models, one entry per entity type
//! - [`queue`]: durable FIFO of user actions that could not be sent yet
//! - [`sync`]: the engine tying reads, writes and queue draining together
//! - [`probe`]: on-demand connectivity checks with change notifications
//! - [`store`]: the durable key-value store everything persists through

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod event;
#[cfg(feature = "logging")]
pub mod logging;
pub mod probe;
pub mod queue;
pub mod store;
pub mod sync;

pub use api::{FieldApi, HttpFieldApi};
pub use cache::{CacheResult, CacheSource, EntityType, TtlPolicy};
pub use config::Config;
pub use queue::{ActionKind, QueuedAction};
pub use sync::{DrainReport, SubmitOutcome, SyncEngine};
