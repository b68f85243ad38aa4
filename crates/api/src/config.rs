//! Server configuration loaded from environment variables.

use std::time::Duration;

use bundlekit_store::media::PollPolicy;

/// Server configuration loaded from environment variables.
///
/// All fields except the shop credentials have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Shop domain, e.g. `my-shop.myshopify.com`.
    pub shop_domain: String,
    /// Admin API version (default: `2025-07`).
    pub api_version: String,
    /// Admin API access token.
    pub admin_token: String,
    /// Id of the cart-transform resource owning the snapshot document.
    pub cart_transform_id: String,
    /// Media readiness poll attempts (default: `10`).
    pub media_poll_attempts: u32,
    /// Delay between media readiness polls in ms (default: `500`).
    pub media_poll_interval_ms: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `HOST`                    | `0.0.0.0`               |
    /// | `PORT`                    | `3000`                  |
    /// | `CORS_ORIGINS`            | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                    |
    /// | `SHOP_DOMAIN`             | (required)              |
    /// | `API_VERSION`             | `2025-07`               |
    /// | `ADMIN_API_TOKEN`         | (required)              |
    /// | `CART_TRANSFORM_ID`       | (required)              |
    /// | `MEDIA_POLL_ATTEMPTS`     | `10`                    |
    /// | `MEDIA_POLL_INTERVAL_MS`  | `500`                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shop_domain = std::env::var("SHOP_DOMAIN").expect("SHOP_DOMAIN must be set");
        let api_version = std::env::var("API_VERSION").unwrap_or_else(|_| "2025-07".into());
        let admin_token = std::env::var("ADMIN_API_TOKEN").expect("ADMIN_API_TOKEN must be set");
        let cart_transform_id =
            std::env::var("CART_TRANSFORM_ID").expect("CART_TRANSFORM_ID must be set");

        let media_poll_attempts: u32 = std::env::var("MEDIA_POLL_ATTEMPTS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("MEDIA_POLL_ATTEMPTS must be a valid u32");

        let media_poll_interval_ms: u64 = std::env::var("MEDIA_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "500".into())
            .parse()
            .expect("MEDIA_POLL_INTERVAL_MS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shop_domain,
            api_version,
            admin_token,
            cart_transform_id,
            media_poll_attempts,
            media_poll_interval_ms,
        }
    }

    /// The media poll budget as a [`PollPolicy`].
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.media_poll_attempts,
            interval: Duration::from_millis(self.media_poll_interval_ms),
        }
    }
}
