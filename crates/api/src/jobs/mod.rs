//! Background job scheduler and job implementations.

mod dispatch_worker;
mod idempotency_cleanup;
mod location_writer;
mod outbox_worker;
mod pool_metrics;
mod scheduler;

pub use dispatch_worker::DispatchWorkerJob;
pub use idempotency_cleanup::IdempotencyCleanupJob;
pub use location_writer::LocationWriterJob;
pub use outbox_worker::OutboxWorkerJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
