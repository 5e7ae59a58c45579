//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, resolve $VAR secrets)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!
//! On SIGHUP (or POST {"signal": "SIGHUP"}):
//!     reload chain step → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<AppConfig>
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A failed reload leaves the previous configuration in place

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{AppConfig, ControlConfig, DoubleTapSettings, ObservabilityConfig, RateLimitConfig, TlsConfig};
