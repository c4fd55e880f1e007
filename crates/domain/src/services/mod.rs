//! Service-trait seams that `crates/api` wires to concrete implementations.
//!
//! Kept in `domain` (not `api`) so that any future consumer of the domain
//! layer — another transport, a test harness — can supply its own
//! notification/event-bus implementation without depending on `axum`.

pub mod events;
pub mod notification;

pub use events::EventPublisher;
pub use notification::{MockNotificationService, NotificationService};
