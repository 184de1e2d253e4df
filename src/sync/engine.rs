//! Sync engine that wraps the API with caching, deferred writes and draining.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::api::{ConflictSummary, FieldApi, HttpFieldApi, KpiSnapshot, Notification, TourSummary};
use crate::cache::{CacheResult, Cacheable, EntityType, FreshnessCache, TtlPolicy};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::probe::{CachedProbe, HttpReachability, NetworkProbe};
use crate::queue::{ActionKind, ActionQueue, QueuedAction};
use crate::store::{set_with_eviction, KeyValueStore, SqliteStore};

/// Storage key of the last successful sync timestamp.
pub const LAST_SYNC_KEY: &str = "sync:last_sync";

/// Outcome of a submitted mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
  /// The server accepted the mutation
  Applied,
  /// The mutation was stored for a later drain
  Queued(QueuedAction),
}

impl SubmitOutcome {
  pub fn is_applied(&self) -> bool {
    matches!(self, SubmitOutcome::Applied)
  }
}

/// Tally of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
  pub success: usize,
  pub failed: usize,
}

/// Dashboard read models loaded together.
#[derive(Debug, Clone)]
pub struct Dashboard {
  pub kpis: CacheResult<KpiSnapshot>,
  pub urgent_conflicts: CacheResult<Vec<ConflictSummary>>,
  pub active_tours: CacheResult<Vec<TourSummary>>,
}

impl Dashboard {
  /// True if any part of the dashboard is not live data.
  pub fn is_from_cache(&self) -> bool {
    self.kpis.is_from_cache()
      || self.urgent_conflicts.is_from_cache()
      || self.active_tours.is_from_cache()
  }
}

/// Offline-first data and synchronization context.
///
/// Construct one per process and share it by `Arc`. It is the only writer of
/// cache entries, queued actions and the last-sync marker.
pub struct SyncEngine {
  api: Arc<dyn FieldApi>,
  probe: Arc<dyn NetworkProbe>,
  store: Arc<dyn KeyValueStore>,
  clock: Arc<dyn Clock>,
  cache: FreshnessCache,
  queue: ActionQueue,
  ttl: TtlPolicy,
  /// Set while a drain pass runs; the sole guard against overlapping drains
  sync_in_progress: AtomicBool,
}

impl SyncEngine {
  pub fn new(
    store: Arc<dyn KeyValueStore>,
    api: Arc<dyn FieldApi>,
    probe: Arc<dyn NetworkProbe>,
  ) -> Self {
    Self::with_clock(store, api, probe, Arc::new(SystemClock))
  }

  pub fn with_clock(
    store: Arc<dyn KeyValueStore>,
    api: Arc<dyn FieldApi>,
    probe: Arc<dyn NetworkProbe>,
    clock: Arc<dyn Clock>,
  ) -> Self {
    Self {
      cache: FreshnessCache::new(store.clone(), clock.clone()),
      queue: ActionQueue::new(store.clone(), clock.clone()),
      api,
      probe,
      store,
      clock,
      ttl: TtlPolicy::default(),
      sync_in_progress: AtomicBool::new(false),
    }
  }

  /// Set the per-entity TTLs.
  pub fn with_ttl_policy(mut self, ttl: TtlPolicy) -> Self {
    self.ttl = ttl;
    self
  }

  /// Wire the engine from configuration: SQLite store, HTTP API and an HTTP
  /// reachability probe.
  ///
  /// The probe is returned alongside so the host can subscribe to
  /// connectivity changes.
  pub fn open(config: &Config) -> Result<(Self, Arc<CachedProbe<HttpReachability>>)> {
    let store = SqliteStore::open(config.store.path.as_deref(), config.store.max_pages)?;
    let api = HttpFieldApi::new(config)?;
    let probe = Arc::new(CachedProbe::new(
      HttpReachability::new(config.health_url(), config.probe_timeout())?,
      config.probe.assume_online,
    ));

    let engine = Self::new(Arc::new(store), Arc::new(api), probe.clone())
      .with_ttl_policy(config.cache.ttl.policy()?);

    Ok((engine, probe))
  }

  // ==========================================================================
  // Read path
  // ==========================================================================

  /// Fetch `T` live when online (or when forced), otherwise serve the cache.
  ///
  /// Never fails: a failed fetch falls back to the cache, and an absent cache
  /// yields `T::default()`. Check [`CacheResult::is_from_cache`].
  pub async fn fetch_or_cache<T, F, Fut>(&self, force_refresh: bool, fetcher: F) -> CacheResult<T>
  where
    T: Cacheable + Default,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let entity = T::entity_type();
    let online = self.probe.is_online().await;

    if !online && !force_refresh {
      return self.read_cached(entity);
    }

    match fetcher().await {
      Ok(data) => {
        if let Err(e) = self.cache.write(entity, &data, self.ttl.ttl(entity)) {
          tracing::warn!(entity = entity.name(), error = %e, "failed to cache fresh data");
        }
        self.mark_synced();
        CacheResult::from_network(data)
      }
      Err(e) => {
        tracing::debug!(entity = entity.name(), error = %e, "fetch failed, serving cache");
        self.read_cached(entity)
      }
    }
  }

  fn read_cached<T: Cacheable + Default>(&self, entity: EntityType) -> CacheResult<T> {
    match self.cache.read::<T>(entity) {
      Some(entry) => CacheResult::from_cache(entry.data, entry.written_at),
      None => CacheResult::miss(T::default()),
    }
  }

  pub async fn kpis(&self, force_refresh: bool) -> CacheResult<KpiSnapshot> {
    self
      .fetch_or_cache(force_refresh, || self.api.kpis())
      .await
  }

  pub async fn urgent_conflicts(&self, force_refresh: bool) -> CacheResult<Vec<ConflictSummary>> {
    self
      .fetch_or_cache(force_refresh, || self.api.urgent_conflicts())
      .await
  }

  pub async fn active_tours(&self, force_refresh: bool) -> CacheResult<Vec<TourSummary>> {
    self
      .fetch_or_cache(force_refresh, || self.api.active_tours())
      .await
  }

  pub async fn notifications(&self, force_refresh: bool) -> CacheResult<Vec<Notification>> {
    self
      .fetch_or_cache(force_refresh, || self.api.notifications())
      .await
  }

  /// Load KPIs, urgent conflicts and active tours concurrently.
  pub async fn refresh_dashboard(&self, force_refresh: bool) -> Dashboard {
    let (kpis, urgent_conflicts, active_tours) = futures::join!(
      self.kpis(force_refresh),
      self.urgent_conflicts(force_refresh),
      self.active_tours(force_refresh),
    );

    Dashboard {
      kpis,
      urgent_conflicts,
      active_tours,
    }
  }

  // ==========================================================================
  // Write path
  // ==========================================================================

  /// Apply a mutation now if possible, otherwise queue it for the next drain.
  ///
  /// A failed call while online is queued, not retried. The only error is a
  /// local storage failure while queueing.
  pub async fn submit_mutation(
    &self,
    kind: ActionKind,
    target_id: &str,
    notes: Option<&str>,
  ) -> Result<SubmitOutcome> {
    if self.probe.is_online().await {
      match self.dispatch(kind, target_id, notes).await {
        Ok(()) => return Ok(SubmitOutcome::Applied),
        Err(e) => {
          tracing::warn!(%kind, target_id, error = %e, "mutation failed, queueing");
        }
      }
    }

    let action = self
      .queue
      .enqueue(kind, target_id, notes)
      .map_err(|e| eyre!("Failed to queue {} for {}: {}", kind, target_id, e))?;

    Ok(SubmitOutcome::Queued(action))
  }

  pub async fn approve_conflict(
    &self,
    conflict_id: &str,
    notes: Option<&str>,
  ) -> Result<SubmitOutcome> {
    self
      .submit_mutation(ActionKind::ApproveConflict, conflict_id, notes)
      .await
  }

  pub async fn reject_conflict(
    &self,
    conflict_id: &str,
    notes: Option<&str>,
  ) -> Result<SubmitOutcome> {
    self
      .submit_mutation(ActionKind::RejectConflict, conflict_id, notes)
      .await
  }

  async fn dispatch(&self, kind: ActionKind, target_id: &str, notes: Option<&str>) -> Result<()> {
    let notes = notes.unwrap_or_default();
    match kind {
      ActionKind::ApproveConflict => self.api.approve_conflict(target_id, notes).await,
      ActionKind::RejectConflict => self.api.reject_conflict(target_id, notes).await,
    }
  }

  // ==========================================================================
  // Drain
  // ==========================================================================

  /// Send every queued action, oldest first, removing the ones that succeed.
  ///
  /// Returns zeros without doing anything if a drain is already running or
  /// the network is down. A failed action stays queued and does not stop the
  /// pass.
  pub async fn drain_queue(&self) -> DrainReport {
    let Some(_guard) = DrainGuard::acquire(&self.sync_in_progress) else {
      tracing::debug!("drain already in progress");
      return DrainReport::default();
    };

    if !self.probe.is_online().await {
      tracing::debug!("offline, skipping drain");
      return DrainReport::default();
    }

    let actions = match self.queue.list() {
      Ok(actions) => actions,
      Err(e) => {
        tracing::warn!(error = %e, "could not read action queue");
        Vec::new()
      }
    };

    let mut report = DrainReport::default();
    for action in actions {
      match self
        .dispatch(action.kind, &action.target_id, action.notes.as_deref())
        .await
      {
        Ok(()) => {
          if let Err(e) = self.queue.remove(&action.id) {
            tracing::warn!(id = %action.id, error = %e, "applied action could not be removed");
          }
          report.success += 1;
        }
        Err(e) => {
          tracing::warn!(id = %action.id, kind = %action.kind, error = %e, "queued action failed");
          report.failed += 1;
        }
      }
    }

    self.mark_synced();
    tracing::info!(success = report.success, failed = report.failed, "drain finished");
    report
  }

  pub fn is_syncing(&self) -> bool {
    self.sync_in_progress.load(Ordering::Acquire)
  }

  // ==========================================================================
  // Inspection
  // ==========================================================================

  pub fn pending_actions(&self) -> Result<Vec<QueuedAction>> {
    self.queue.list()
  }

  pub fn pending_count(&self) -> Result<usize> {
    self.queue.len()
  }

  /// Drop every pending action. Only for an explicit user discard.
  pub fn discard_pending(&self) -> Result<()> {
    tracing::info!("discarding pending actions");
    self.queue.clear()
  }

  /// Time of the most recent successful fetch or drain pass.
  pub fn last_sync(&self) -> Option<DateTime<Utc>> {
    let raw = match self.store.get(LAST_SYNC_KEY) {
      Ok(raw) => raw?,
      Err(e) => {
        tracing::warn!(error = %e, "could not read last sync marker");
        return None;
      }
    };

    DateTime::parse_from_rfc3339(&raw)
      .map(|dt| dt.with_timezone(&Utc))
      .ok()
  }

  /// Cached entry write time for `entity`, if a valid entry exists.
  pub fn cached_at(&self, entity: EntityType) -> Option<DateTime<Utc>> {
    self
      .cache
      .read::<serde_json::Value>(entity)
      .map(|entry| entry.written_at)
  }

  fn mark_synced(&self) {
    let now = self.clock.now().to_rfc3339();
    if let Err(e) = set_with_eviction(
      self.store.as_ref(),
      LAST_SYNC_KEY,
      &now,
      &EntityType::all_storage_keys(),
    ) {
      tracing::warn!(error = %e, "could not update last sync marker");
    }
  }
}

/// Holds the in-progress flag for the duration of a drain.
struct DrainGuard<'a> {
  flag: &'a AtomicBool,
}

impl<'a> DrainGuard<'a> {
  fn acquire(flag: &'a AtomicBool) -> Option<Self> {
    flag
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| Self { flag })
  }
}

impl Drop for DrainGuard<'_> {
  fn drop(&mut self) {
    self.flag.store(false, Ordering::Release);
  }
}
