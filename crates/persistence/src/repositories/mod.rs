//! Repository implementations, one module per aggregate.

pub mod driver;
pub mod idempotency_key;
pub mod outbox_event;
pub mod payment;
pub mod ride;
pub mod trip;

pub use driver::DriverRepository;
pub use idempotency_key::IdempotencyKeyRepository;
pub use outbox_event::OutboxEventRepository;
pub use payment::PaymentRepository;
pub use ride::RideRepository;
pub use trip::TripRepository;
