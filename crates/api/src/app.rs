use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    general_rate_limit_middleware, location_rate_limit_middleware, metrics_middleware,
    payment_rate_limit_middleware, security_headers_middleware, trace_id, KeyedRateLimiter,
};
use crate::routes::{drivers, health, payments, rides, trips};
use crate::services::assignment::AssignmentService;
use crate::services::driver_registry::DriverRegistryService;
use crate::services::payment_service::PaymentService;
use crate::services::ride_intake::RideIntakeService;
use crate::services::trip_service::TripService;
use persistence::repositories::idempotency_key::IdempotencyKeyRepository;

/// Shared application state handed to every route handler. Each service
/// owns its own repository and the persistence/transaction concerns behind
/// it; this struct only wires the handles route handlers need and the
/// three independently-quota'd rate limiters the router layer enforces.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub driver_registry: Arc<DriverRegistryService>,
    pub ride_intake: Arc<RideIntakeService>,
    pub trip_service: Arc<TripService>,
    pub assignment: Arc<AssignmentService>,
    pub payment_service: Arc<PaymentService>,
    pub idempotency_keys: IdempotencyKeyRepository,
    pub general_rate_limiter: Arc<KeyedRateLimiter>,
    pub location_rate_limiter: Arc<KeyedRateLimiter>,
    pub payment_rate_limiter: Arc<KeyedRateLimiter>,
}

/// Everything `main` constructs before calling `create_app` — kept as one
/// struct so wiring order (repositories -> services -> app) lives in one
/// place rather than as a dozen loose `create_app` parameters.
pub struct AppDeps {
    pub pool: PgPool,
    pub config: Config,
    pub driver_registry: Arc<DriverRegistryService>,
    pub ride_intake: Arc<RideIntakeService>,
    pub trip_service: Arc<TripService>,
    pub assignment: Arc<AssignmentService>,
    pub payment_service: Arc<PaymentService>,
    pub idempotency_keys: IdempotencyKeyRepository,
}

pub fn create_app(deps: AppDeps) -> Router {
    let config = Arc::new(deps.config);

    let general_rate_limiter = Arc::new(KeyedRateLimiter::per_15min(
        config.security.general_rate_limit_per_15min,
    ));
    let location_rate_limiter = Arc::new(KeyedRateLimiter::per_minute(
        config.security.location_rate_limit_per_min,
    ));
    let payment_rate_limiter = Arc::new(KeyedRateLimiter::per_15min(
        config.security.payment_rate_limit_per_15min,
    ));

    let state = AppState {
        pool: deps.pool,
        config: config.clone(),
        driver_registry: deps.driver_registry,
        ride_intake: deps.ride_intake,
        trip_service: deps.trip_service,
        assignment: deps.assignment,
        payment_service: deps.payment_service,
        idempotency_keys: deps.idempotency_keys,
        general_rate_limiter,
        location_rate_limiter,
        payment_rate_limiter,
    };

    let cors = if config.security.cors_origins.is_empty()
        || config.security.cors_origins.iter().any(|o| o == "*")
    {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .route("/metrics", get(crate::middleware::metrics_handler));

    // Location updates get their own quota (120/min/driver) so a busy fleet
    // of drivers never exhausts the general bucket.
    let location_routes = Router::new()
        .route("/api/v1/drivers/:driver_id/location", put(drivers::update_location))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            location_rate_limit_middleware,
        ));

    // Payment creation gets its own tighter quota (10/15min/client); the
    // webhook is excluded since it is PSP-initiated, not client-initiated.
    let payment_routes = Router::new()
        .route("/api/v1/payments", post(payments::create_payment))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            payment_rate_limit_middleware,
        ));

    let general_routes = Router::new()
        .route("/api/v1/drivers", post(drivers::create_driver))
        .route("/api/v1/drivers", get(drivers::list_drivers))
        .route("/api/v1/drivers/:driver_id", get(drivers::get_driver))
        .route(
            "/api/v1/drivers/:driver_id/status",
            put(drivers::update_status),
        )
        .route(
            "/api/v1/drivers/:driver_id/accept",
            post(drivers::accept_ride),
        )
        .route("/api/v1/rides", post(rides::create_ride))
        .route("/api/v1/rides", get(rides::list_rides))
        .route("/api/v1/rides/:ride_id", get(rides::get_ride))
        .route("/api/v1/trips/:trip_id", get(trips::get_trip))
        .route("/api/v1/trips/:trip_id/start", post(trips::start_trip))
        .route("/api/v1/trips/:trip_id/pause", post(trips::pause_trip))
        .route("/api/v1/trips/:trip_id/resume", post(trips::resume_trip))
        .route("/api/v1/trips/:trip_id/cancel", post(trips::cancel_trip))
        .route("/api/v1/trips/:trip_id/end", post(trips::end_trip))
        .route("/api/v1/trips/:trip_id/receipt", get(trips::trip_receipt))
        .route("/api/v1/payments/:payment_id", get(payments::get_payment))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            general_rate_limit_middleware,
        ));

    // PSP webhook: no client-facing quota, authenticated by HMAC signature instead.
    let webhook_routes =
        Router::new().route("/api/v1/payments/webhook", post(payments::psp_webhook));

    let app = Router::new()
        .merge(health_routes)
        .merge(general_routes)
        .merge(location_routes)
        .merge(payment_routes)
        .merge(webhook_routes);

    // Global middleware (order matters: bottom layers run first).
    app.layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
