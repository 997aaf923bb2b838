//! Application settings and configuration structures.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// Redis configuration (webhook job queue)
    pub redis: RedisSettings,

    /// JWT verification settings
    pub jwt: JwtSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// Outbound WooCommerce REST client settings
    pub woocommerce: WooCommerceSettings,

    /// Inbound webhook processing settings
    pub webhooks: WebhookSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL. When empty, webhook jobs use an in-process queue.
    pub url: String,
}

/// JWT verification configuration.
///
/// Tokens are issued by the identity service; this backend only verifies them.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Shared HS256 secret
    pub secret: String,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

/// WooCommerce REST API client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WooCommerceSettings {
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Page size for list endpoints (WooCommerce caps this at 100)
    pub per_page: u32,

    /// Upper bound on pages fetched in a single sync run
    pub max_pages: u32,

    /// User-Agent sent to stores
    pub user_agent: String,
}

/// Webhook queue and worker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSettings {
    /// Redis list holding pending jobs
    pub queue_name: String,

    /// Redis list receiving jobs that exhausted their attempts
    pub dead_letter_queue: String,

    /// How long a delivery id is remembered for duplicate detection
    pub dedup_ttl_secs: u64,

    /// Attempts before a job is dead-lettered
    pub max_attempts: u32,

    /// Blocking pop timeout for workers
    pub poll_timeout_secs: u64,

    /// Number of concurrent workers
    pub workers: usize,
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// WooCommerce rejects `per_page` above this value.
pub const MAX_WOO_PAGE_SIZE: u32 = 100;

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// if the JWT secret is too short, or if the WooCommerce page size is
    /// out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            .set_default("environment", environment.clone())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 4000)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("redis.url", "")?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])?
            .set_default("woocommerce.request_timeout_secs", 30)?
            .set_default("woocommerce.per_page", 50)?
            .set_default("woocommerce.max_pages", 50)?
            .set_default(
                "woocommerce.user_agent",
                concat!("parcel-hub/", env!("CARGO_PKG_VERSION")),
            )?
            .set_default("webhooks.queue_name", "woo:webhooks")?
            .set_default("webhooks.dead_letter_queue", "woo:webhooks:dead")?
            .set_default("webhooks.dedup_ttl_secs", 86400)?
            .set_default("webhooks.max_attempts", 5)?
            .set_default("webhooks.poll_timeout_secs", 5)?
            .set_default("webhooks.workers", 2)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__SERVER__PORT=4000 -> server.port = 4000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| settings.validate())
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::Message(format!(
                "JWT secret must be at least {} characters. Current length: {}",
                MIN_JWT_SECRET_LENGTH,
                self.jwt.secret.len()
            )));
        }
        if self.woocommerce.per_page == 0 || self.woocommerce.per_page > MAX_WOO_PAGE_SIZE {
            return Err(ConfigError::Message(format!(
                "woocommerce.per_page must be between 1 and {}",
                MAX_WOO_PAGE_SIZE
            )));
        }
        if self.webhooks.max_attempts == 0 {
            return Err(ConfigError::Message(
                "webhooks.max_attempts must be at least 1".into(),
            ));
        }
        Ok(self)
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl RedisSettings {
    /// Whether a Redis URL was configured.
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_settings() -> Settings {
        Settings {
            server: ServerSettings {
                host: "127.0.0.1".into(),
                port: 4000,
            },
            database: DatabaseSettings {
                url: "postgres://localhost/parcel_hub_test".into(),
                max_connections: 2,
                min_connections: 0,
                acquire_timeout: 1,
            },
            redis: RedisSettings { url: String::new() },
            jwt: JwtSettings {
                secret: "a".repeat(MIN_JWT_SECRET_LENGTH),
            },
            cors: CorsSettings {
                allowed_origins: vec![],
            },
            woocommerce: WooCommerceSettings {
                request_timeout_secs: 5,
                per_page: 50,
                max_pages: 10,
                user_agent: "parcel-hub/test".into(),
            },
            webhooks: WebhookSettings {
                queue_name: "q".into(),
                dead_letter_queue: "q:dead".into(),
                dedup_ttl_secs: 60,
                max_attempts: 3,
                poll_timeout_secs: 1,
                workers: 1,
            },
            environment: "test".into(),
        }
    }

    #[test]
    fn rejects_short_jwt_secret() {
        let mut settings = sample_settings();
        settings.jwt.secret = "short".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_oversized_page() {
        let mut settings = sample_settings();
        settings.woocommerce.per_page = 250;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn accepts_sane_settings() {
        let settings = sample_settings().validate().unwrap();
        assert_eq!(settings.server_addr(), "127.0.0.1:4000");
        assert!(!settings.redis.is_configured());
    }
}
