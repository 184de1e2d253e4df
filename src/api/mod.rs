//! Request/response boundary with the remote field-operations API.

mod client;
mod types;

use async_trait::async_trait;
use color_eyre::Result;

pub use client::HttpFieldApi;
pub use types::{ConflictSummary, KpiSnapshot, Notification, TourSummary};

/// Remote calls the sync engine depends on.
///
/// Any transport error, timeout, non-2xx status or undecodable body is an
/// `Err`; the engine does not distinguish between them.
#[async_trait]
pub trait FieldApi: Send + Sync {
  async fn kpis(&self) -> Result<KpiSnapshot>;

  async fn urgent_conflicts(&self) -> Result<Vec<ConflictSummary>>;

  async fn active_tours(&self) -> Result<Vec<TourSummary>>;

  async fn notifications(&self) -> Result<Vec<Notification>>;

  async fn approve_conflict(&self, conflict_id: &str, notes: &str) -> Result<()>;

  async fn reject_conflict(&self, conflict_id: &str, notes: &str) -> Result<()>;
}
