use thiserror::Error;

pub mod app;
pub mod config;
pub mod db;
pub mod rate_limit;
pub mod setup;

pub use rate_limit::{RateLimiterTrait, RedisRateLimiter};

#[derive(Error, Debug)]
pub enum InfraError {
    #[error("Redis connection failed: {0}")]
    RedisConnection(#[from] redis::RedisError),
}
