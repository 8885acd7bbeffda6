//! Test app state builder for HTTP-level testing.
//!
//! Creates a minimal `AppState` backed by the in-memory mocks.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;

use crate::{
    adapters::http::app_state::AppState,
    domain::entities::entrant::Entrant,
    infra::{RateLimiterTrait, config::AppConfig},
    test_utils::{InMemoryEntrantRepo, InMemoryRateLimiter},
    use_cases::waitlist::{EntrantRepo, WaitlistUseCases},
};

pub const TEST_ADMIN_TOKEN: &str = "test-admin-token";

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let entrant = create_test_entrant(|e| e.email = "a@example.com".to_string());
/// let app_state = TestAppStateBuilder::new().with_entrant(entrant).build();
/// ```
pub struct TestAppStateBuilder {
    entrants: Vec<Entrant>,
    admin_token: String,
    rate_limiter: Option<Arc<dyn RateLimiterTrait>>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            entrants: vec![],
            admin_token: TEST_ADMIN_TOKEN.to_string(),
            rate_limiter: None,
        }
    }

    /// Add a single pre-existing entrant.
    pub fn with_entrant(mut self, entrant: Entrant) -> Self {
        self.entrants.push(entrant);
        self
    }

    /// Add pre-existing entrants.
    pub fn with_entrants(mut self, entrants: Vec<Entrant>) -> Self {
        self.entrants.extend(entrants);
        self
    }

    /// Override the admin bearer token.
    pub fn with_admin_token(mut self, token: &str) -> Self {
        self.admin_token = token.to_string();
        self
    }

    /// Substitute a non-permissive rate limiter.
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiterTrait>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    pub fn build(self) -> AppState {
        let config = AppConfig {
            bind_addr: "127.0.0.1:0".parse::<SocketAddr>().unwrap(),
            database_url: "postgres://unused".to_string(),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            admin_token: SecretString::new(self.admin_token.into()),
            redis_url: "redis://unused".to_string(),
            rate_limit_window_secs: 900,
            rate_limit_max_requests: 10,
            trust_proxy: false,
        };

        let repo = Arc::new(InMemoryEntrantRepo::with_entrants(self.entrants));
        let waitlist_use_cases = WaitlistUseCases::new(repo as Arc<dyn EntrantRepo>);

        let rate_limiter = self
            .rate_limiter
            .unwrap_or_else(|| Arc::new(InMemoryRateLimiter::permissive()));

        AppState {
            config: Arc::new(config),
            waitlist_use_cases: Arc::new(waitlist_use_cases),
            rate_limiter,
        }
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
