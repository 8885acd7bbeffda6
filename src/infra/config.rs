use std::env;
use std::net::SocketAddr;

use axum::http::HeaderValue;
use secrecy::SecretString;

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub cors_origin: HeaderValue,
    /// Bearer token for the admin entrant listing.
    pub admin_token: SecretString,
    pub redis_url: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max_requests: u64,
    /// Whether to trust X-Forwarded-For headers. Set to true when behind a reverse proxy (Caddy, nginx).
    /// SECURITY: Only enable this when the API is not directly exposed to the internet.
    pub trust_proxy: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind_addr: SocketAddr = env::var("BIND_ADDR")
            .unwrap_or("127.0.0.1:3001".to_string())
            .parse()
            .expect("BIND_ADDR must be a valid socket address");

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let cors_origin: HeaderValue = env::var("CORS_ORIGIN")
            .unwrap_or("http://localhost:3000".to_string())
            .parse()
            .expect("CORS_ORIGIN must be a valid header value");

        let admin_token: SecretString =
            SecretString::new(env::var("ADMIN_TOKEN").expect("ADMIN_TOKEN must be set").into());

        let redis_url = env::var("REDIS_URL").unwrap_or("redis://127.0.0.1:6379".to_string());

        let rate_limit_window_secs: u64 = env::var("RATE_LIMIT_WINDOW_SECS")
            .unwrap_or("900".to_string())
            .parse()
            .expect("RATE_LIMIT_WINDOW_SECS must be a valid number");

        let rate_limit_max_requests: u64 = env::var("RATE_LIMIT_MAX_REQUESTS")
            .unwrap_or("10".to_string())
            .parse()
            .expect("RATE_LIMIT_MAX_REQUESTS must be a valid number");

        // Default to false for security - must explicitly enable when behind a trusted proxy
        let trust_proxy = env::var("TRUST_PROXY")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            bind_addr,
            database_url,
            cors_origin,
            admin_token,
            redis_url,
            rate_limit_window_secs,
            rate_limit_max_requests,
            trust_proxy,
        }
    }
}
