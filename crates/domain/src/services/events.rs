//! Live-event fan-out seam.

use crate::models::event::DispatchEvent;

/// Publishes a `DispatchEvent` to all currently-connected subscribers,
/// best-effort. `api::events::EventBus` is the concrete `tokio::sync::broadcast`
/// implementation; every service that needs to publish takes
/// `Arc<dyn EventPublisher>` rather than a concrete bus type.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: DispatchEvent);
}
