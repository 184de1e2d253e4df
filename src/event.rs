use tokio::sync::broadcast;

/// Connectivity change notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
  /// Network became reachable
  Online,
  /// Network was lost
  Offline,
}

impl ConnectivityEvent {
  pub fn from_online(online: bool) -> Self {
    if online {
      ConnectivityEvent::Online
    } else {
      ConnectivityEvent::Offline
    }
  }
}

/// Fan-out hub that probes publish to and sync triggers subscribe to
#[derive(Debug, Clone)]
pub struct EventHub {
  tx: broadcast::Sender<ConnectivityEvent>,
}

impl EventHub {
  /// Create a hub buffering up to `capacity` undelivered events per subscriber
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity.max(1));
    Self { tx }
  }

  /// Publish an event. Having no subscribers is not an error.
  pub fn publish(&self, event: ConnectivityEvent) {
    let _ = self.tx.send(event);
  }

  /// Register a new subscriber. Drop the subscription to deregister.
  pub fn subscribe(&self) -> Subscription {
    Subscription {
      rx: self.tx.subscribe(),
    }
  }

  pub fn subscriber_count(&self) -> usize {
    self.tx.receiver_count()
  }
}

impl Default for EventHub {
  fn default() -> Self {
    Self::new(16)
  }
}

/// A registered listener on an [`EventHub`]
#[derive(Debug)]
pub struct Subscription {
  rx: broadcast::Receiver<ConnectivityEvent>,
}

impl Subscription {
  /// Receive the next event, or `None` once the hub is gone
  pub async fn next(&mut self) -> Option<ConnectivityEvent> {
    loop {
      match self.rx.recv().await {
        Ok(event) => return Some(event),
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
          tracing::debug!(skipped, "connectivity subscriber lagged");
        }
        Err(broadcast::error::RecvError::Closed) => return None,
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_subscriber_receives_published_events() {
    let hub = EventHub::default();
    let mut sub = hub.subscribe();

    hub.publish(ConnectivityEvent::Offline);
    hub.publish(ConnectivityEvent::Online);

    assert_eq!(sub.next().await, Some(ConnectivityEvent::Offline));
    assert_eq!(sub.next().await, Some(ConnectivityEvent::Online));
  }

  #[tokio::test]
  async fn test_dropping_subscription_deregisters() {
    let hub = EventHub::default();
    let sub = hub.subscribe();
    assert_eq!(hub.subscriber_count(), 1);
    drop(sub);
    assert_eq!(hub.subscriber_count(), 0);

    // No listeners left; publishing must still be fine
    hub.publish(ConnectivityEvent::Online);
  }

  #[tokio::test]
  async fn test_next_returns_none_after_hub_dropped() {
    let hub = EventHub::default();
    let mut sub = hub.subscribe();
    drop(hub);
    assert_eq!(sub.next().await, None);
  }
}
