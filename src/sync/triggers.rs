//! Drain triggers a host can run alongside the engine.
//!
//! The engine never schedules itself. These helpers cover the usual
//! triggers: a timer while a dependent screen is open, and reconnection.
//! Abort the returned handle to stop a trigger.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::SyncEngine;
use crate::config::Config;
use crate::event::{ConnectivityEvent, Subscription};

/// Handles of the triggers started by [`spawn_from_config`].
pub struct Triggers {
  pub periodic: JoinHandle<()>,
  pub reconnect: JoinHandle<()>,
}

impl Triggers {
  pub fn abort(&self) {
    self.periodic.abort();
    self.reconnect.abort();
  }
}

/// Start the periodic trigger at `sync.drain_interval_secs` and the
/// reconnect trigger on `reconnects`.
pub fn spawn_from_config(
  engine: Arc<SyncEngine>,
  config: &Config,
  reconnects: Subscription,
) -> Triggers {
  tracing::debug!(every = ?config.drain_interval(), "starting drain triggers");
  Triggers {
    periodic: spawn_periodic(engine.clone(), config.drain_interval()),
    reconnect: spawn_on_reconnect(engine, reconnects),
  }
}

/// Drain every `every`, starting immediately. Periods under a millisecond are
/// raised to one.
pub fn spawn_periodic(engine: Arc<SyncEngine>, every: Duration) -> JoinHandle<()> {
  let every = every.max(Duration::from_millis(1));
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
      ticker.tick().await;
      engine.drain_queue().await;
    }
  })
}

/// Drain whenever the subscription reports the network came back.
///
/// Ends when the publishing side goes away.
pub fn spawn_on_reconnect(engine: Arc<SyncEngine>, mut events: Subscription) -> JoinHandle<()> {
  tokio::spawn(async move {
    while let Some(event) = events.next().await {
      if event == ConnectivityEvent::Online {
        tracing::debug!("connectivity restored, draining");
        engine.drain_queue().await;
      }
    }
  })
}
