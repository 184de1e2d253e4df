//! Network probe: answers "am I online right now?" on demand.
//!
//! The probe is a routing signal only. A failing platform query never surfaces
//! as an error; the last known state is reused instead.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::event::{ConnectivityEvent, EventHub, Subscription};

/// Pull-based connectivity check.
#[async_trait]
pub trait NetworkProbe: Send + Sync {
  async fn is_online(&self) -> bool;
}

/// The underlying platform query. May fail.
#[async_trait]
pub trait ConnectivitySource: Send + Sync {
  async fn query(&self) -> Result<bool>;
}

/// Probe that remembers the last answer of its source and falls back to it
/// when the source errors.
pub struct CachedProbe<S: ConnectivitySource> {
  source: S,
  last_known: AtomicBool,
  events: EventHub,
}

impl<S: ConnectivitySource> CachedProbe<S> {
  pub fn new(source: S, assume_online: bool) -> Self {
    Self {
      source,
      last_known: AtomicBool::new(assume_online),
      events: EventHub::default(),
    }
  }

  /// Last value observed, without querying the source.
  pub fn last_known(&self) -> bool {
    self.last_known.load(Ordering::Acquire)
  }

  /// Subscribe to state changes observed by this probe.
  pub fn subscribe(&self) -> Subscription {
    self.events.subscribe()
  }
}

#[async_trait]
impl<S: ConnectivitySource> NetworkProbe for CachedProbe<S> {
  async fn is_online(&self) -> bool {
    match self.source.query().await {
      Ok(online) => {
        let previous = self.last_known.swap(online, Ordering::AcqRel);
        if previous != online {
          tracing::info!(online, "connectivity changed");
          self.events.publish(ConnectivityEvent::from_online(online));
        }
        online
      }
      Err(e) => {
        let online = self.last_known();
        tracing::warn!(error = %e, online, "connectivity query failed, reusing last known state");
        online
      }
    }
  }
}

/// Reachability check against an HTTP endpoint.
///
/// Any response (whatever the status) means the network is up. Connect and
/// timeout errors mean it is down. Anything else is reported as a query
/// failure.
pub struct HttpReachability {
  client: reqwest::Client,
  url: url::Url,
}

impl HttpReachability {
  pub fn new(url: url::Url, timeout: Duration) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .connect_timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to build reachability client: {}", e))?;

    Ok(Self { client, url })
  }
}

#[async_trait]
impl ConnectivitySource for HttpReachability {
  async fn query(&self) -> Result<bool> {
    match self.client.head(self.url.clone()).send().await {
      Ok(_) => Ok(true),
      Err(e) if e.is_connect() || e.is_timeout() => Ok(false),
      Err(e) => Err(eyre!("Reachability check against {} failed: {}", self.url, e)),
    }
  }
}

/// Probe whose state is pushed in by the host platform integration.
#[derive(Debug)]
pub struct ManualProbe {
  online: AtomicBool,
  events: EventHub,
}

impl ManualProbe {
  pub fn new(online: bool) -> Self {
    Self {
      online: AtomicBool::new(online),
      events: EventHub::default(),
    }
  }

  /// Record the platform's connectivity state, notifying subscribers on change.
  pub fn set_online(&self, online: bool) {
    let previous = self.online.swap(online, Ordering::AcqRel);
    if previous != online {
      self.events.publish(ConnectivityEvent::from_online(online));
    }
  }

  pub fn subscribe(&self) -> Subscription {
    self.events.subscribe()
  }
}

#[async_trait]
impl NetworkProbe for ManualProbe {
  async fn is_online(&self) -> bool {
    self.online.load(Ordering::Acquire)
  }
}
