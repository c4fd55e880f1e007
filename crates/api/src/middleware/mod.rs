//! HTTP middleware components.

pub mod logging;
pub mod metrics;
pub mod rate_limit;
pub mod security_headers;
pub mod trace_id;

#[allow(unused_imports)] // Re-exports for downstream use
pub use metrics::{
    init_metrics, metrics_handler, metrics_middleware, record_dispatch_tick,
    record_outbox_outcome,
};
#[allow(unused_imports)] // Re-exports for downstream use
pub use rate_limit::{
    general_rate_limit_middleware, location_rate_limit_middleware,
    payment_rate_limit_middleware, KeyedRateLimiter,
};
#[allow(unused_imports)] // Re-exports for downstream use
pub use security_headers::security_headers_middleware;
#[allow(unused_imports)] // Re-exports for downstream use
pub use trace_id::{trace_id, RequestId, REQUEST_ID_HEADER};
