//! Security primitives for the control endpoint.
//!
//! # Data Flow
//! ```text
//! Incoming control request:
//!     → rate_limit.rs (global token bucket)
//!     → control::auth (bearer token / client certificate)
//!     → handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Rate limiting runs before authentication so bad credentials are throttled too

pub mod rate_limit;

pub use rate_limit::RateLimiter;
