//! Handler registry.
//!
//! # Responsibilities
//! - Store per-signal callbacks keyed by a monotonically increasing index
//! - Store the cleanup chain (LIFO) and the reload chain (FIFO, fail-fast)
//! - Hand out snapshots so handlers never run under the manager lock
//!
//! # Design Decisions
//! - Removal is by registration index, so cancelling one entry never shifts
//!   the identity of another
//! - Callers only ever hold a [`Registration`], never the entry itself

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::error::Error;
use super::manager::State;
use super::signals::LogicalSignal;

/// Error type returned by handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type HandlerResult = Result<(), BoxError>;

pub(crate) type Callback =
    Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

pub(crate) fn boxed<F, Fut>(handler: F) -> Callback
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |token| Box::pin(handler(token)))
}

#[derive(Clone)]
pub(crate) struct HandlerEntry {
    pub(crate) index: u64,
    pub(crate) callback: Callback,
}

#[derive(Default)]
pub(crate) struct Registry {
    next_index: u64,
    handlers: BTreeMap<LogicalSignal, Vec<HandlerEntry>>,
    shutdown: Vec<Callback>,
    reload: Vec<Callback>,
}

impl Registry {
    pub(crate) fn add_handler(&mut self, signal: LogicalSignal, callback: Callback) -> u64 {
        let index = self.next_index;
        self.next_index += 1;
        self.handlers
            .entry(signal)
            .or_default()
            .push(HandlerEntry { index, callback });
        index
    }

    pub(crate) fn remove_handler(&mut self, signal: LogicalSignal, index: u64) -> bool {
        let Some(entries) = self.handlers.get_mut(&signal) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.index != index);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.handlers.remove(&signal);
        }
        removed
    }

    /// Per-signal handlers in registration order.
    pub(crate) fn handlers_for(&self, signal: LogicalSignal) -> Vec<HandlerEntry> {
        self.handlers.get(&signal).cloned().unwrap_or_default()
    }

    /// Signals with at least one per-signal handler.
    pub(crate) fn watched_signals(&self) -> Vec<LogicalSignal> {
        self.handlers.keys().copied().collect()
    }

    pub(crate) fn push_shutdown(&mut self, callback: Callback) {
        self.shutdown.push(callback);
    }

    pub(crate) fn push_reload(&mut self, callback: Callback) {
        self.reload.push(callback);
    }

    pub(crate) fn cleanup_chain(&self) -> CleanupChain {
        CleanupChain {
            steps: self.shutdown.clone(),
        }
    }

    pub(crate) fn reload_chain(&self) -> ReloadChain {
        ReloadChain {
            steps: self.reload.clone(),
        }
    }

    pub(crate) fn handler_count(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }
}

/// Shutdown steps, executed last registered first.
pub(crate) struct CleanupChain {
    steps: Vec<Callback>,
}

impl CleanupChain {
    pub(crate) fn len(&self) -> usize {
        self.steps.len()
    }

    /// Run every step in reverse registration order, stopping at the first
    /// failure. Steps are numbered by registration position.
    pub(crate) async fn run(&self, token: &CancellationToken) -> Result<(), Error> {
        let total = self.steps.len();
        for (position, step) in self.steps.iter().enumerate().rev() {
            tracing::debug!(step = position + 1, total, "Running shutdown step");
            step(token.clone()).await.map_err(|source| Error::ShutdownStep {
                step: position + 1,
                total,
                source,
            })?;
        }
        Ok(())
    }
}

/// Reload steps, executed in registration order.
pub(crate) struct ReloadChain {
    steps: Vec<Callback>,
}

impl ReloadChain {
    pub(crate) fn len(&self) -> usize {
        self.steps.len()
    }

    pub(crate) async fn run(&self, token: &CancellationToken) -> Result<(), Error> {
        let total = self.steps.len();
        for (position, step) in self.steps.iter().enumerate() {
            tracing::debug!(step = position + 1, total, "Running reload step");
            step(token.clone()).await.map_err(|source| Error::ReloadStep {
                step: position + 1,
                total,
                source,
            })?;
        }
        Ok(())
    }
}

/// Cancellation capability for a per-signal handler.
///
/// A registration for a signal the platform cannot deliver is a no-op:
/// cancelling it does nothing.
#[derive(Clone)]
pub struct Registration {
    signal: LogicalSignal,
    target: Option<(Weak<RwLock<State>>, u64)>,
}

impl Registration {
    pub(crate) fn active(state: Weak<RwLock<State>>, signal: LogicalSignal, index: u64) -> Self {
        Self {
            signal,
            target: Some((state, index)),
        }
    }

    pub(crate) fn noop(signal: LogicalSignal) -> Self {
        Self {
            signal,
            target: None,
        }
    }

    pub fn signal(&self) -> LogicalSignal {
        self.signal
    }

    pub fn is_noop(&self) -> bool {
        self.target.is_none()
    }

    /// Registration index; `None` for a no-op registration.
    pub fn index(&self) -> Option<u64> {
        self.target.as_ref().map(|(_, index)| *index)
    }

    /// Remove the handler. Returns `true` the first time an entry is removed.
    pub fn cancel(&self) -> bool {
        let Some((state, index)) = &self.target else {
            return false;
        };
        let Some(state) = state.upgrade() else {
            return false;
        };
        let mut state = state.write().unwrap_or_else(PoisonError::into_inner);
        state.registry.remove_handler(self.signal, *index)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("signal", &self.signal)
            .field("index", &self.index())
            .finish()
    }
}
