//! Cross-platform process signal management.
//!
//! A [`Manager`] owns a registry of per-signal handlers plus a cleanup chain
//! and a reload chain, listens for OS signals through a [`platform::Platform`],
//! escalates a repeated interrupt into a forced exit, and exposes the same
//! dispatch path over an authenticated HTTP control endpoint for signals a
//! platform cannot deliver natively.
//!
//! ```no_run
//! use signalman::{LogicalSignal, Manager};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), signalman::Error> {
//! let manager = Manager::new();
//! manager.on_shutdown(|_token| async {
//!     println!("flushing");
//!     Ok(())
//! });
//! manager.handle(LogicalSignal::Hangup, |_token| async { Ok(()) });
//!
//! let received = manager.listen(CancellationToken::new()).await?;
//! println!("handled {received:?}");
//! # Ok(())
//! # }
//! ```

// Core
pub mod catalog;
pub mod lifecycle;
pub mod platform;

// Control surface
pub mod control;
pub mod net;
pub mod security;

// Cross-cutting concerns
pub mod config;
pub mod observability;

pub use catalog::{SignalCatalog, TomlCatalog};
pub use config::AppConfig;
pub use lifecycle::{
    BoxError, DoubleTapConfig, Error, Harness, HandlerResult, LogicalSignal, Manager, Phase, Registration,
};
pub use platform::{Platform, SignalCapability};
