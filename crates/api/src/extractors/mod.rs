//! Custom Axum extractors.

pub mod idempotency_key;

#[allow(unused_imports)] // Re-exports for downstream use
pub use idempotency_key::{IdempotencyKey, OptionalIdempotencyKey, IDEMPOTENCY_KEY_HEADER};
