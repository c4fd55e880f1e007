use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub r#match: MatchConfig,
    #[serde(default)]
    pub outbox: OutboxConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub idempotency: IdempotencyConfig,
    #[serde(default)]
    pub geo: GeoConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_body_size")]
    #[allow(dead_code)] // wired once request-body limiting middleware lands
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// CORS + the three rate-limit buckets binding on the HTTP boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// General requests: 100 / 15 min / client.
    #[serde(default = "default_general_rate_limit")]
    pub general_rate_limit_per_15min: u32,

    /// Location updates: 120 / min / driver.
    #[serde(default = "default_location_rate_limit")]
    pub location_rate_limit_per_min: u32,

    /// Payment creation: 10 / 15 min / client.
    #[serde(default = "default_payment_rate_limit")]
    pub payment_rate_limit_per_15min: u32,

    /// HMAC-SHA256 secret shared with the PSP for verifying `X-PSP-Signature`
    /// on incoming webhook calls. Required, not optional — there is no
    /// unauthenticated fallback path for the webhook handler.
    #[serde(default)]
    pub psp_webhook_secret: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            general_rate_limit_per_15min: default_general_rate_limit(),
            location_rate_limit_per_min: default_location_rate_limit(),
            payment_rate_limit_per_15min: default_payment_rate_limit(),
            psp_webhook_secret: String::new(),
        }
    }
}

/// Dispatch Worker tunables.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_dispatch_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Per-ride match window; a ride still MATCHING past this age is expired.
    #[serde(default = "default_dispatch_match_timeout_secs")]
    pub match_timeout_secs: u64,

    #[serde(default = "default_dispatch_batch_size")]
    pub batch_size: i64,

    /// Concurrency within a batch (tokio::task::JoinSet width).
    #[serde(default = "default_dispatch_subbatch")]
    pub subbatch: usize,

    /// Rides older than this are no longer candidates for matching at all,
    /// regardless of the per-ride match window (defense against a stuck
    /// worker letting ancient rows accumulate).
    #[serde(default = "default_dispatch_max_age_secs")]
    pub max_age_secs: i64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_dispatch_poll_interval_secs(),
            match_timeout_secs: default_dispatch_match_timeout_secs(),
            batch_size: default_dispatch_batch_size(),
            subbatch: default_dispatch_subbatch(),
            max_age_secs: default_dispatch_max_age_secs(),
        }
    }
}

/// Matching Service policy.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchConfig {
    #[serde(default = "default_match_radius_km")]
    pub radius_km: f64,

    #[serde(default = "default_match_limit")]
    pub limit: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            radius_km: default_match_radius_km(),
            limit: default_match_limit(),
        }
    }
}

/// Outbox Worker tunables.
#[derive(Debug, Clone, Deserialize)]
pub struct OutboxConfig {
    #[serde(default = "default_outbox_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_outbox_batch_size")]
    pub batch_size: i64,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_outbox_poll_interval_secs(),
            batch_size: default_outbox_batch_size(),
        }
    }
}

/// Payment retry policy driving the Outbox Worker's backoff schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Backoff in seconds, indexed by `retry_count` after increment. The
    /// last entry is reused once `retry_count` exceeds the table's length.
    #[serde(default = "default_payment_retry_backoff_secs")]
    pub retry_backoff_secs: Vec<u64>,

    #[serde(default = "default_payment_max_retries")]
    pub max_retries: i32,

    /// Timeout for a single PSP call.
    #[serde(default = "default_payment_psp_timeout_secs")]
    pub psp_timeout_secs: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            retry_backoff_secs: default_payment_retry_backoff_secs(),
            max_retries: default_payment_max_retries(),
            psp_timeout_secs: default_payment_psp_timeout_secs(),
        }
    }
}

impl PaymentConfig {
    /// Backoff for the given (post-increment) retry count, clamped to the
    /// last configured entry once the table is exhausted.
    pub fn backoff_for(&self, retry_count: i32) -> std::time::Duration {
        let idx = (retry_count.max(1) - 1) as usize;
        let secs = self
            .retry_backoff_secs
            .get(idx)
            .or_else(|| self.retry_backoff_secs.last())
            .copied()
            .unwrap_or(480);
        std::time::Duration::from_secs(secs)
    }
}

/// Idempotency Cache TTL.
#[derive(Debug, Clone, Deserialize)]
pub struct IdempotencyConfig {
    #[serde(default = "default_idempotency_ttl_secs")]
    pub ttl_secs: i64,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_idempotency_ttl_secs(),
        }
    }
}

/// Geospatial Index freshness window.
#[derive(Debug, Clone, Deserialize)]
pub struct GeoConfig {
    #[serde(default = "default_geo_freshness_secs")]
    pub freshness_secs: u64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            freshness_secs: default_geo_freshness_secs(),
        }
    }
}

// Default value functions

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_body_size() -> usize {
    1_048_576
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_general_rate_limit() -> u32 {
    100
}
fn default_location_rate_limit() -> u32 {
    120
}
fn default_payment_rate_limit() -> u32 {
    10
}
fn default_dispatch_poll_interval_secs() -> u64 {
    2
}
fn default_dispatch_match_timeout_secs() -> u64 {
    60
}
fn default_dispatch_batch_size() -> i64 {
    10
}
fn default_dispatch_subbatch() -> usize {
    5
}
fn default_dispatch_max_age_secs() -> i64 {
    300 // 5 minutes
}
fn default_match_radius_km() -> f64 {
    5.0
}
fn default_match_limit() -> usize {
    5
}
fn default_outbox_poll_interval_secs() -> u64 {
    5
}
fn default_outbox_batch_size() -> i64 {
    10
}
fn default_payment_retry_backoff_secs() -> Vec<u64> {
    vec![30, 120, 480]
}
fn default_payment_max_retries() -> i32 {
    3
}
fn default_payment_psp_timeout_secs() -> u64 {
    10
}
fn default_idempotency_ttl_secs() -> i64 {
    300
}
fn default_geo_freshness_secs() -> u64 {
    60
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with DC__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("DC").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// This method creates a config entirely from defaults and overrides,
    /// without relying on config files (which may not be accessible during tests).
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        // Embed defaults directly to avoid file system dependency in tests
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30
            max_body_size = 1048576

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []
            general_rate_limit_per_15min = 100
            location_rate_limit_per_min = 120
            payment_rate_limit_per_15min = 10
            psp_webhook_secret = "test-webhook-secret"

            [dispatch]
            poll_interval_secs = 2
            match_timeout_secs = 60
            batch_size = 10
            subbatch = 5
            max_age_secs = 300

            [match]
            radius_km = 5.0
            limit = 5

            [outbox]
            poll_interval_secs = 5
            batch_size = 10

            [payment]
            retry_backoff_secs = [30, 120, 480]
            max_retries = 3
            psp_timeout_secs = 10

            [idempotency]
            ttl_secs = 300

            [geo]
            freshness_secs = 60
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "DC__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.r#match.limit == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "match.limit cannot be 0".to_string(),
            ));
        }

        if self.payment.retry_backoff_secs.is_empty() {
            return Err(ConfigValidationError::InvalidValue(
                "payment.retry_backoff_secs cannot be empty".to_string(),
            ));
        }

        if self.security.psp_webhook_secret.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "DC__SECURITY__PSP_WEBHOOK_SECRET environment variable must be set".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .expect("Invalid socket address")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_for_test_applies_overrides() {
        let cfg = Config::load_for_test(&[
            ("database.url", "postgres://localhost/dispatch_test"),
            ("dispatch.batch_size", "3"),
        ])
        .unwrap();
        assert_eq!(cfg.database.url, "postgres://localhost/dispatch_test");
        assert_eq!(cfg.dispatch.batch_size, 3);
    }

    #[test]
    fn defaults_match_documented_configuration_values() {
        let cfg = Config::load_for_test(&[]).unwrap();
        assert_eq!(cfg.dispatch.poll_interval_secs, 2);
        assert_eq!(cfg.dispatch.match_timeout_secs, 60);
        assert_eq!(cfg.dispatch.batch_size, 10);
        assert_eq!(cfg.dispatch.subbatch, 5);
        assert_eq!(cfg.r#match.radius_km, 5.0);
        assert_eq!(cfg.r#match.limit, 5);
        assert_eq!(cfg.outbox.poll_interval_secs, 5);
        assert_eq!(cfg.outbox.batch_size, 10);
        assert_eq!(cfg.payment.retry_backoff_secs, vec![30, 120, 480]);
        assert_eq!(cfg.payment.max_retries, 3);
        assert_eq!(cfg.idempotency.ttl_secs, 300);
        assert_eq!(cfg.geo.freshness_secs, 60);
        assert_eq!(cfg.security.general_rate_limit_per_15min, 100);
        assert_eq!(cfg.security.location_rate_limit_per_min, 120);
        assert_eq!(cfg.security.payment_rate_limit_per_15min, 10);
    }

    #[test]
    fn payment_backoff_clamps_to_last_entry_past_table_length() {
        let cfg = PaymentConfig::default();
        assert_eq!(cfg.backoff_for(1), std::time::Duration::from_secs(30));
        assert_eq!(cfg.backoff_for(2), std::time::Duration::from_secs(120));
        assert_eq!(cfg.backoff_for(3), std::time::Duration::from_secs(480));
        assert_eq!(cfg.backoff_for(10), std::time::Duration::from_secs(480));
    }

    #[test]
    fn validate_rejects_empty_database_url() {
        let cfg = Config::load_for_test(&[("database.url", "")]).unwrap();
        assert!(cfg.validate().is_err());
    }
}
