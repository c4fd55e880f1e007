use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod app;
mod config;
mod error;
mod extractors;
mod jobs;
mod middleware;
mod routes;
mod services;

use app::AppDeps;
use domain::services::{EventPublisher, MockNotificationService, NotificationService};
use persistence::geo::DriverGeoIndex;
use persistence::repositories::driver::DriverRepository;
use persistence::repositories::idempotency_key::IdempotencyKeyRepository;
use persistence::repositories::outbox_event::OutboxEventRepository;
use persistence::repositories::payment::PaymentRepository;
use persistence::repositories::ride::RideRepository;
use persistence::repositories::trip::TripRepository;
use services::assignment::AssignmentService;
use services::driver_registry::{DriverRegistryService, LOCATION_QUEUE_CAPACITY};
use services::events::EventBus;
use services::matching::MatchPolicy;
use services::payment_service::PaymentService;
use services::psp::SimulatedPspClient;
use services::ride_intake::RideIntakeService;
use services::trip_service::TripService;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::Config::load()?;

    middleware::logging::init_logging(&config.logging);
    middleware::metrics::init_metrics();
    info!("Prometheus metrics initialized");

    info!("Starting dispatch-core API v{}", env!("CARGO_PKG_VERSION"));

    let db_config = persistence::db::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        connect_timeout_secs: config.database.connect_timeout_secs,
        idle_timeout_secs: config.database.idle_timeout_secs,
    };
    let pool = persistence::db::create_pool(&db_config).await?;

    info!("Running database migrations...");
    sqlx::migrate!("../persistence/migrations").run(&pool).await?;
    info!("Migrations completed");

    let events: Arc<dyn EventPublisher> = Arc::new(EventBus::new());
    let notifications: Arc<dyn NotificationService> = Arc::new(MockNotificationService::new());
    let geo_index = Arc::new(DriverGeoIndex::new(Duration::from_secs(
        config.geo.freshness_secs,
    )));

    let (location_tx, location_rx) = tokio::sync::mpsc::channel(LOCATION_QUEUE_CAPACITY);

    let driver_registry = Arc::new(DriverRegistryService::new(
        DriverRepository::new(pool.clone()),
        pool.clone(),
        geo_index.clone(),
        events.clone(),
        location_tx,
    ));

    let match_policy = MatchPolicy {
        radius_km: config.r#match.radius_km,
        limit: config.r#match.limit,
    };

    let ride_intake = Arc::new(RideIntakeService::new(
        RideRepository::new(pool.clone()),
        geo_index.clone(),
        events.clone(),
        match_policy,
    ));

    let trip_service = Arc::new(TripService::new(
        TripRepository::new(pool.clone()),
        pool.clone(),
        events.clone(),
        notifications.clone(),
    ));

    let assignment = Arc::new(AssignmentService::new(
        pool.clone(),
        events.clone(),
        notifications.clone(),
    ));

    let outbox = OutboxEventRepository::new(pool.clone());
    let psp = Arc::new(SimulatedPspClient::new(Duration::from_secs(
        config.payment.psp_timeout_secs,
    )));
    let payment_service = Arc::new(PaymentService::new(
        PaymentRepository::new(pool.clone()),
        outbox.clone(),
        pool.clone(),
        events.clone(),
        psp,
        config.payment.clone(),
        config.security.psp_webhook_secret.clone(),
    ));

    let idempotency_keys = IdempotencyKeyRepository::new(
        pool.clone(),
        chrono::Duration::seconds(config.idempotency.ttl_secs),
    );

    let mut scheduler = jobs::JobScheduler::new();
    scheduler.register(jobs::DispatchWorkerJob::new(
        pool.clone(),
        geo_index.clone(),
        assignment.clone(),
        events.clone(),
        match_policy,
        config.dispatch.poll_interval_secs,
        config.dispatch.match_timeout_secs as i64,
        config.dispatch.batch_size,
        config.dispatch.subbatch,
        config.dispatch.max_age_secs,
    ));
    scheduler.register(jobs::OutboxWorkerJob::new(
        outbox,
        payment_service.clone(),
        config.outbox.poll_interval_secs,
        config.outbox.batch_size,
    ));
    scheduler.register(jobs::LocationWriterJob::new(
        DriverRepository::new(pool.clone()),
        location_rx,
        1,
    ));
    scheduler.register(jobs::IdempotencyCleanupJob::new(idempotency_keys.clone()));
    scheduler.register(jobs::PoolMetricsJob::new(pool.clone()));
    scheduler.start();

    let addr = config.socket_addr();

    let app = app::create_app(AppDeps {
        pool: pool.clone(),
        config,
        driver_registry,
        ride_intake,
        trip_service,
        assignment,
        payment_service,
        idempotency_keys,
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal");
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(30)).await;

    info!("Server shutdown complete");
    Ok(())
}
