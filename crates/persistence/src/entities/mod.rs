//! Database row types (`sqlx::FromRow`) and their conversions into `domain::models`.

pub mod driver;
pub mod idempotency_key;
pub mod outbox_event;
pub mod payment;
pub mod ride;
pub mod state_transition;
pub mod trip;

pub use driver::DriverEntity;
pub use idempotency_key::IdempotencyKeyEntity;
pub use outbox_event::OutboxEventEntity;
pub use payment::PaymentEntity;
pub use ride::RideEntity;
pub use state_transition::StateTransitionEntity;
pub use trip::TripEntity;
