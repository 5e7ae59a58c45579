//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! control listener bind
//!     → tls.rs (optional TLS, optional mandatory client certificates)
//!     → axum-server accept loop
//!     → control router
//! ```

pub mod tls;

pub use tls::{load_tls_config, TlsError};
