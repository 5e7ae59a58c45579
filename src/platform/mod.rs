//! Platform signal boundary.
//!
//! # Data Flow
//! ```text
//! OS signal (SIGTERM, Ctrl+C, ...)
//!     → NativeListener (unix.rs / windows.rs)
//!     → forward() task
//!     → manager intake queue (LogicalSignal)
//! ```
//!
//! # Design Decisions
//! - All `cfg(unix)` / `cfg(windows)` branches live in this module
//! - The manager only sees `LogicalSignal` values, never native numbers
//! - `Simulated` reports a fixed capability set and never delivers,
//!   so hosts and tests can drive the manager purely by injection

pub mod capability;
pub mod simulated;
#[cfg(unix)]
pub mod unix;
#[cfg(windows)]
pub mod windows;

use std::fmt;
use std::io;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::lifecycle::signals::LogicalSignal;

pub use capability::{CapabilityResolver, SignalCapability};
pub use simulated::Simulated;

/// A subscription to one native signal.
pub trait NativeListener: Send {
    /// Wait for the next delivery. `None` once the stream is closed.
    fn recv(&mut self) -> BoxFuture<'_, Option<()>>;
}

/// One platform family's mapping between logical and native signals.
pub trait Platform: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Whether the OS can deliver `signal` natively.
    fn supports(&self, signal: LogicalSignal) -> bool;

    /// Register native delivery for `signal`.
    fn listen(&self, signal: LogicalSignal) -> io::Result<Box<dyn NativeListener>>;
}

/// The platform this binary was compiled for.
pub fn current() -> Arc<dyn Platform> {
    #[cfg(unix)]
    {
        Arc::new(unix::Unix)
    }
    #[cfg(windows)]
    {
        Arc::new(windows::Windows)
    }
    #[cfg(not(any(unix, windows)))]
    {
        Arc::new(Simulated::new([]))
    }
}

pub(crate) fn unsupported(platform: &str, signal: LogicalSignal) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{} has no native delivery on {}", signal, platform),
    )
}

/// Forwarding tasks feeding native signals into an intake queue.
///
/// Dropping the subscription stops forwarding.
#[derive(Debug)]
pub struct Subscription {
    signals: Vec<LogicalSignal>,
    tasks: Vec<JoinHandle<()>>,
}

impl Subscription {
    /// Signals with native delivery registered, in request order.
    pub fn signals(&self) -> &[LogicalSignal] {
        &self.signals
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Register native delivery for `signals` and forward each delivery to `tx`.
///
/// Signals the platform cannot deliver are skipped. A forwarding task waits
/// for queue space instead of dropping a delivery; repeated deliveries of the
/// same signal coalesce in the OS while it waits.
pub fn forward(
    platform: &dyn Platform,
    signals: &[LogicalSignal],
    tx: mpsc::Sender<LogicalSignal>,
) -> io::Result<Subscription> {
    let mut subscribed = Vec::with_capacity(signals.len());
    let mut tasks = Vec::with_capacity(signals.len());
    for &signal in signals {
        if !platform.supports(signal) {
            tracing::debug!(%signal, platform = platform.name(), "Skipping native registration");
            continue;
        }
        let mut listener = platform.listen(signal)?;
        let tx = tx.clone();
        subscribed.push(signal);
        tasks.push(tokio::spawn(async move {
            while listener.recv().await.is_some() {
                tracing::debug!(%signal, "Native signal received");
                if tx.send(signal).await.is_err() {
                    break;
                }
            }
        }));
    }
    Ok(Subscription {
        signals: subscribed,
        tasks,
    })
}
