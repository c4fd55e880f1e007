//! Live-event fan-out bus.
//!
//! Built directly on `tokio::sync::broadcast`, already a transitive
//! dependency via `tokio`'s `sync` feature. Subscribers (the transport
//! layer, out of scope here) receive best-effort delivery; a lagging
//! subscriber drops old events rather than blocking publishers.

use domain::models::DispatchEvent;
use domain::services::EventPublisher;
use tokio::sync::broadcast;

/// Default channel capacity: generous enough to absorb a burst between
/// publishes and a slow subscriber's next poll without immediately lagging.
const CHANNEL_CAPACITY: usize = 1024;

/// In-process event bus. Cheap to clone (wraps a `broadcast::Sender`).
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DispatchEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Registers a new subscriber. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: DispatchEvent) {
        // send() errors only when there are no subscribers; best-effort fan-out
        // means that's not a failure worth propagating.
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn subscriber_receives_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(DispatchEvent::DriverCreated {
            driver_id: Uuid::nil(),
        });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.type_name(), "DRIVER_CREATED");
    }

    #[tokio::test]
    async fn publishing_with_no_subscribers_does_not_error() {
        let bus = EventBus::new();
        bus.publish(DispatchEvent::DriverCreated {
            driver_id: Uuid::nil(),
        });
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive_the_event() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(DispatchEvent::RideCreated {
            ride_id: Uuid::nil(),
            rider_id: Uuid::nil(),
        });

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }
}
