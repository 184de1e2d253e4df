//! Read-model payloads served by the field-operations API.

use serde::{Deserialize, Serialize};

use crate::cache::{Cacheable, EntityType};

/// Dashboard KPI snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KpiSnapshot {
  pub tours_in_progress: u32,
  pub tours_completed_today: u32,
  pub vehicles_on_site: u32,
  pub crates_in_transit: u64,
  pub open_conflicts: u32,
  pub pending_hygiene_checks: u32,
}

/// Summary of a crate-count conflict for list views
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConflictSummary {
  pub id: String,
  pub tour_id: Option<String>,
  pub client_name: Option<String>,
  /// Declared minus counted crates
  pub crate_delta: i64,
  pub status: String,
  pub created_at: Option<String>,
}

/// Summary of a tour in progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TourSummary {
  pub id: String,
  pub vehicle_plate: Option<String>,
  pub driver_name: Option<String>,
  pub status: String,
  pub started_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Notification {
  pub id: String,
  pub title: String,
  pub body: Option<String>,
  pub read: bool,
  pub created_at: Option<String>,
}

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for KpiSnapshot {
  fn entity_type() -> EntityType {
    EntityType::Kpis
  }
}

impl Cacheable for Vec<ConflictSummary> {
  fn entity_type() -> EntityType {
    EntityType::UrgentConflicts
  }
}

impl Cacheable for Vec<TourSummary> {
  fn entity_type() -> EntityType {
    EntityType::ActiveTours
  }
}

impl Cacheable for Vec<Notification> {
  fn entity_type() -> EntityType {
    EntityType::Notifications
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_fields_use_defaults() {
    let kpis: KpiSnapshot = serde_json::from_str(r#"{"toursInProgress": 4}"#).unwrap();
    assert_eq!(kpis.tours_in_progress, 4);
    assert_eq!(kpis.open_conflicts, 0);

    let conflicts: Vec<ConflictSummary> =
      serde_json::from_str(r#"[{"id": "c1", "crateDelta": -3, "status": "open"}]"#).unwrap();
    assert_eq!(conflicts[0].crate_delta, -3);
    assert_eq!(conflicts[0].tour_id, None);
  }
}
