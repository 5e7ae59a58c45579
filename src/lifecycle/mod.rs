//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → cleanup chain (LIFO)
//!     SIGHUP         → reload chain (FIFO, fail-fast)
//!
//! Dispatch (manager.rs):
//!     native delivery / injection (harness.rs) → intake queue
//!         → listen() → double_tap.rs (interrupts only)
//!         → per-signal handlers (registry.rs) → categorical chain
//! ```
//!
//! # Design Decisions
//! - Registration never fails; unsupported signals degrade to a no-op
//! - Second interrupt inside the double-tap window exits immediately
//! - Chain failures carry the failing step's position and are not retried

pub mod double_tap;
pub mod error;
pub mod global;
pub mod harness;
pub mod manager;
pub mod registry;
pub mod signals;

pub use double_tap::{DoubleTapConfig, DEFAULT_EXIT_CODE};
pub use error::Error;
pub use harness::Harness;
pub use manager::{ExitHook, Manager, ManagerBuilder, Phase};
pub use registry::{BoxError, HandlerResult, Registration};
pub use signals::{LogicalSignal, SignalCategory, UnknownSignal};
