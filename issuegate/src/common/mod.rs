//! Shared building blocks for the governance components

/// Periodic housekeeping tasks
pub mod background;

/// Environment variable loading
pub mod env_loader;

/// Sliding-window rate limiting
pub mod rate_limiter;

/// Monotonic ULID generation
pub mod ulid_generator;

pub use background::CleanupHandle;
pub use env_loader::EnvLoader;
pub use rate_limiter::{
    Admission, OperationClass, RateLimitStats, RateLimiter, RateLimiterConfig, RateLimiters,
};
pub use ulid_generator::generate_monotonic_ulid;
