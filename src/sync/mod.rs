//! Synchronization engine: cache-or-fetch reads, apply-or-queue writes, and
//! draining of queued actions once the network is back.

mod engine;
pub mod triggers;

pub use engine::{Dashboard, DrainReport, SubmitOutcome, SyncEngine, LAST_SYNC_KEY};
