//! The signal manager: registry, dispatch state machine and escalation.
//!
//! # States
//! ```text
//! Idle → Listening:        listen() called
//! Listening → Dispatching: a signal arrived on the intake queue
//! Dispatching → Idle:      handlers and chain finished (ok or error)
//! any → Terminated:        stop()
//! ```
//!
//! # Design Decisions
//! - One `listen` at a time per manager; a second call fails fast
//! - Native delivery and test injection feed the same bounded queue, so
//!   dispatch never knows where a signal came from
//! - Handlers run sequentially on the dispatching task, never under the lock
//! - No per-handler timeout; the caller's token is passed to every handler
//! - HTTP dispatch may overlap a `listen` dispatch; handlers must tolerate it
//! - Native forwarding lives as long as the manager, not one `listen` call
//! - Signals that arrive mid-dispatch are held for the next `listen`; a
//!   shutdown already running or pending absorbs further shutdown signals

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::double_tap::{DoubleTapConfig, DoubleTapState, Tap};
use super::error::Error;
use super::registry::{boxed, HandlerResult, Registration, Registry};
use super::signals::{LogicalSignal, SignalCategory};
use crate::catalog::{SignalCatalog, TomlCatalog};
use crate::observability::telemetry::{DispatchSource, MetricsSink, TelemetryEvent, TelemetrySink};
use crate::platform::{self, CapabilityResolver, Platform, SignalCapability};

/// Capacity of the signal intake queue.
const INTAKE_CAPACITY: usize = 1;

/// Called with the exit code on double-tap escalation.
pub type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

/// Where the manager is in its dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Listening,
    Dispatching,
    Terminated,
}

pub(crate) struct State {
    pub(crate) registry: Registry,
    pub(crate) double_tap: DoubleTapState,
    quiet: bool,
}

/// A signal held back because another was dispatching when it arrived.
#[derive(Debug, Clone, Copy)]
struct Pending {
    signal: LogicalSignal,
    /// Already fed to double-tap on arrival.
    tapped: bool,
}

struct Intake {
    rx: mpsc::Receiver<LogicalSignal>,
    pending: VecDeque<Pending>,
}

impl Intake {
    fn next_pending(&mut self) -> Option<Pending> {
        self.pending.pop_front()
    }

    /// Hold `next` until `current` finishes dispatching.
    fn hold(&mut self, current: LogicalSignal, next: Pending) {
        let shutdown = |signal: LogicalSignal| signal.category() == SignalCategory::Shutdown;
        let absorbed = if shutdown(next.signal) {
            shutdown(current) || self.pending.iter().any(|p| shutdown(p.signal))
        } else {
            self.pending.iter().any(|p| p.signal == next.signal)
        };
        if absorbed {
            tracing::debug!(signal = %next.signal, in_flight = %current, "Coalescing signal received during dispatch");
            return;
        }
        tracing::debug!(signal = %next.signal, in_flight = %current, "Holding signal until dispatch finishes");
        self.pending.push_back(next);
    }
}

struct Shared {
    state: Arc<RwLock<State>>,
    resolver: CapabilityResolver,
    catalog: Arc<dyn SignalCatalog>,
    platform: Arc<dyn Platform>,
    telemetry: Arc<dyn TelemetrySink>,
    diagnostics: Mutex<Box<dyn Write + Send>>,
    exit_hook: ExitHook,
    intake_tx: mpsc::Sender<LogicalSignal>,
    intake: tokio::sync::Mutex<Intake>,
    native: Mutex<Option<platform::Subscription>>,
    running: AtomicBool,
    phase: watch::Sender<Phase>,
    stopped: CancellationToken,
}

/// Orchestrates shutdown and reload handlers for a process.
///
/// Cheap to clone; clones share the same registry and queue.
#[derive(Clone)]
pub struct Manager {
    shared: Arc<Shared>,
}

/// Builder for [`Manager`].
pub struct ManagerBuilder {
    catalog: Option<Arc<dyn SignalCatalog>>,
    platform: Option<Arc<dyn Platform>>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    diagnostics: Option<Box<dyn Write + Send>>,
    exit_hook: Option<ExitHook>,
    quiet: bool,
}

impl ManagerBuilder {
    pub fn new() -> Self {
        Self {
            catalog: None,
            platform: None,
            telemetry: None,
            diagnostics: None,
            exit_hook: None,
            quiet: false,
        }
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<dyn SignalCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Arc<dyn Platform>) -> Self {
        self.platform = Some(platform);
        self
    }

    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Where diagnostic lines go (stderr by default).
    #[must_use]
    pub fn with_diagnostics(mut self, writer: impl Write + Send + 'static) -> Self {
        self.diagnostics = Some(Box::new(writer));
        self
    }

    /// Replace `std::process::exit` for double-tap escalation.
    #[must_use]
    pub fn with_exit_hook(mut self, hook: impl Fn(i32) + Send + Sync + 'static) -> Self {
        self.exit_hook = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn build(self) -> Manager {
        let catalog = self
            .catalog
            .unwrap_or_else(|| TomlCatalog::builtin() as Arc<dyn SignalCatalog>);
        let platform = self.platform.unwrap_or_else(platform::current);
        let resolver = CapabilityResolver::resolve(platform.as_ref(), catalog.as_ref());
        let (intake_tx, intake_rx) = mpsc::channel(INTAKE_CAPACITY);
        let (phase, _) = watch::channel(Phase::Idle);

        tracing::debug!(
            platform = resolver.platform(),
            catalog_version = resolver.catalog_version(),
            "Signal manager created"
        );

        Manager {
            shared: Arc::new(Shared {
                state: Arc::new(RwLock::new(State {
                    registry: Registry::default(),
                    double_tap: DoubleTapState::default(),
                    quiet: self.quiet,
                })),
                resolver,
                catalog,
                platform,
                telemetry: self.telemetry.unwrap_or_else(|| Arc::new(MetricsSink)),
                diagnostics: Mutex::new(self.diagnostics.unwrap_or_else(|| Box::new(io::stderr()))),
                exit_hook: self
                    .exit_hook
                    .unwrap_or_else(|| Arc::new(|code| std::process::exit(code))),
                intake_tx,
                intake: tokio::sync::Mutex::new(Intake {
                    rx: intake_rx,
                    pending: VecDeque::new(),
                }),
                native: Mutex::new(None),
                running: AtomicBool::new(false),
                phase,
                stopped: CancellationToken::new(),
            }),
        }
    }
}

impl Default for ManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("platform", &self.shared.platform.name())
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl Shared {
    /// Publish `phase` unless the manager has stopped. `Terminated` is final.
    fn transition(&self, phase: Phase) {
        self.phase.send_if_modified(|current| {
            if *current == Phase::Terminated || self.stopped.is_cancelled() || *current == phase {
                return false;
            }
            *current = phase;
            true
        });
    }
}

/// Clears the running flag when a `listen` call ends, however it ends.
struct ListenGuard<'a>(&'a Shared);

impl Drop for ListenGuard<'_> {
    fn drop(&mut self) {
        self.0.transition(Phase::Idle);
        self.0.running.store(false, Ordering::Release);
    }
}

impl Manager {
    /// Manager for the current platform with the built-in catalog.
    pub fn new() -> Self {
        ManagerBuilder::new().build()
    }

    pub fn builder() -> ManagerBuilder {
        ManagerBuilder::new()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.shared.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.shared.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether this host can deliver `signal` natively.
    pub fn supports(&self, signal: LogicalSignal) -> bool {
        self.shared.resolver.supports(signal)
    }

    pub fn capability(&self, signal: LogicalSignal) -> Option<&SignalCapability> {
        self.shared.resolver.capability(signal)
    }

    pub fn capabilities(&self) -> &CapabilityResolver {
        &self.shared.resolver
    }

    pub fn catalog(&self) -> &Arc<dyn SignalCatalog> {
        &self.shared.catalog
    }

    /// Register a callback for `signal`.
    ///
    /// Never fails. When the platform cannot deliver the signal the handler
    /// is not stored: a diagnostic naming the alternative is emitted and a
    /// no-op registration is returned.
    pub fn handle<F, Fut>(&self, signal: LogicalSignal, handler: F) -> Registration
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        if !self.supports(signal) {
            self.report_unsupported(signal);
            return Registration::noop(signal);
        }
        let index = self.write().registry.add_handler(signal, boxed(handler));
        tracing::debug!(%signal, index, "Signal handler registered");
        Registration::active(Arc::downgrade(&self.shared.state), signal, index)
    }

    /// Append a cleanup step. Steps run last registered first.
    pub fn on_shutdown<F, Fut>(&self, handler: F)
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.write().registry.push_shutdown(boxed(handler));
    }

    /// Append a reload step. Steps run in registration order; the first
    /// failure aborts the reload.
    pub fn on_reload<F, Fut>(&self, handler: F)
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.write().registry.push_reload(boxed(handler));
    }

    /// Turn on double-tap escalation for interrupts.
    ///
    /// Unset fields of `config` are resolved from the catalog now, once.
    /// Returns the effective configuration.
    pub fn enable_double_tap(&self, config: DoubleTapConfig) -> DoubleTapConfig {
        let resolved = config.resolve(self.shared.catalog.as_ref());
        tracing::debug!(
            window_ms = resolved.window.as_millis() as u64,
            exit_code = resolved.exit_code,
            "Double-tap escalation enabled"
        );
        self.write().double_tap.configure(Some(resolved.clone()));
        resolved
    }

    pub fn disable_double_tap(&self) {
        self.write().double_tap.configure(None);
    }

    pub fn double_tap_config(&self) -> Option<DoubleTapConfig> {
        self.read().double_tap.config().cloned()
    }

    /// Suppress diagnostic lines (unsupported signals, double-tap prompt).
    pub fn set_quiet(&self, quiet: bool) {
        self.write().quiet = quiet;
    }

    pub fn is_quiet(&self) -> bool {
        self.read().quiet
    }

    pub fn phase(&self) -> Phase {
        *self.shared.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<Phase> {
        self.shared.phase.subscribe()
    }

    /// Whether a `listen` call is in progress.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.is_cancelled()
    }

    pub(crate) fn intake(&self) -> &mpsc::Sender<LogicalSignal> {
        &self.shared.intake_tx
    }

    /// Signals `listen` subscribes to.
    pub fn watched_signals(&self) -> Vec<LogicalSignal> {
        let registered = self.read().registry.watched_signals();
        let candidates = if registered.is_empty() {
            LogicalSignal::DEFAULT_SET.to_vec()
        } else {
            registered
        };
        candidates
            .into_iter()
            .filter(|signal| self.supports(*signal))
            .collect()
    }

    /// Wait for one signal and dispatch it.
    ///
    /// Returns `Ok(Some(signal))` once the signal has been fully processed,
    /// `Ok(None)` if [`stop`](Self::stop) was called, and
    /// `Err(Error::Cancelled)` if `token` was cancelled first. Callers that
    /// want continuous operation call this in a loop.
    pub async fn listen(&self, token: CancellationToken) -> Result<Option<LogicalSignal>, Error> {
        let shared = &*self.shared;
        if shared.stopped.is_cancelled() {
            return Ok(None);
        }
        if shared
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyRunning);
        }
        let _guard = ListenGuard(shared);

        let mut intake = shared.intake.lock().await;
        if shared.stopped.is_cancelled() {
            return Ok(None);
        }
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let native = self.subscribe_native()?;
        tracing::debug!(native, pending = intake.pending.len(), "Listening for signals");

        shared.transition(Phase::Listening);
        let Pending { signal, tapped } = match intake.next_pending() {
            Some(pending) => pending,
            None => {
                let received = tokio::select! {
                    received = intake.rx.recv() => received,
                    () = token.cancelled() => return Err(Error::Cancelled),
                    () = shared.stopped.cancelled() => return Ok(None),
                };
                let Some(signal) = received else {
                    return Ok(None);
                };
                Pending { signal, tapped: false }
            }
        };
        shared.transition(Phase::Dispatching);
        tracing::info!(%signal, "Signal received");

        // Keep draining the queue while handlers run: a second interrupt can
        // still escalate a shutdown that is stuck.
        let dispatch = self.dispatch_inner(signal, token.clone(), DispatchSource::Listen, !tapped);
        tokio::pin!(dispatch);
        loop {
            tokio::select! {
                result = &mut dispatch => return result.map(|()| Some(signal)),
                Some(next) = intake.rx.recv() => {
                    let mut tapped = false;
                    if next == LogicalSignal::Interrupt {
                        if let Some(code) = self.tap() {
                            return Err(self.force_exit(code));
                        }
                        tapped = true;
                    }
                    intake.hold(signal, Pending { signal: next, tapped });
                }
            }
        }
    }

    /// Bring native forwarding in line with the watched signals.
    ///
    /// Returns how many signals have native delivery.
    fn subscribe_native(&self) -> Result<usize, Error> {
        let watched = self.watched_signals();
        let mut native = self
            .shared
            .native
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(subscription) = native.as_ref() {
            if subscription.signals() == watched.as_slice() {
                return Ok(subscription.len());
            }
        }
        *native = None;
        let subscription = platform::forward(
            self.shared.platform.as_ref(),
            &watched,
            self.shared.intake_tx.clone(),
        )?;
        tracing::debug!(signals = ?subscription.signals(), "Native signal forwarding updated");
        let count = subscription.len();
        *native = Some(subscription);
        Ok(count)
    }

    /// Run the handlers for `signal` as if it had been delivered by the OS.
    pub async fn dispatch(&self, signal: LogicalSignal, token: CancellationToken) -> Result<(), Error> {
        self.dispatch_from(signal, token, DispatchSource::Direct).await
    }

    pub(crate) async fn dispatch_from(
        &self,
        signal: LogicalSignal,
        token: CancellationToken,
        source: DispatchSource,
    ) -> Result<(), Error> {
        self.dispatch_inner(signal, token, source, true).await
    }

    /// `tap` is false for an interrupt that was fed to double-tap on arrival.
    async fn dispatch_inner(
        &self,
        signal: LogicalSignal,
        token: CancellationToken,
        source: DispatchSource,
        tap: bool,
    ) -> Result<(), Error> {
        let result = self.run_handlers(signal, &token, tap).await;
        let success = result.is_ok();
        if let Err(err) = &result {
            if !matches!(err, Error::ForcedExit { .. }) {
                tracing::error!(%signal, source = source.as_str(), error = %err, "Signal dispatch failed");
            }
        }
        self.shared.telemetry.record(&TelemetryEvent::Dispatched {
            signal,
            source,
            success,
        });
        result
    }

    async fn run_handlers(
        &self,
        signal: LogicalSignal,
        token: &CancellationToken,
        tap: bool,
    ) -> Result<(), Error> {
        if tap && signal == LogicalSignal::Interrupt {
            if let Some(code) = self.tap() {
                return Err(self.force_exit(code));
            }
        }

        let handlers = self.read().registry.handlers_for(signal);
        for entry in handlers {
            (entry.callback)(token.clone())
                .await
                .map_err(|source| Error::Handler {
                    signal,
                    index: entry.index,
                    source,
                })?;
        }

        match signal.category() {
            SignalCategory::Reload => {
                let chain = self.read().registry.reload_chain();
                tracing::info!(steps = chain.len(), "Running reload chain");
                chain.run(token).await
            }
            SignalCategory::Shutdown => {
                let chain = self.read().registry.cleanup_chain();
                tracing::info!(steps = chain.len(), "Running shutdown chain");
                chain.run(token).await
            }
            SignalCategory::Custom => Ok(()),
        }
    }

    /// Feed one interrupt to the double-tap state machine.
    ///
    /// Returns the exit code when the interrupt escalates.
    fn tap(&self) -> Option<i32> {
        let armed = {
            let mut state = self.write();
            match state.double_tap.tap(Instant::now()) {
                Tap::Disabled => return None,
                Tap::Escalate { exit_code } => return Some(exit_code),
                Tap::Armed {
                    generation,
                    window,
                    message,
                } => {
                    let weak = Arc::downgrade(&self.shared.state);
                    let timer = tokio::spawn(async move {
                        tokio::time::sleep(window).await;
                        if let Some(state) = weak.upgrade() {
                            state
                                .write()
                                .unwrap_or_else(PoisonError::into_inner)
                                .double_tap
                                .expire(generation);
                        }
                    });
                    state.double_tap.set_timer(generation, timer);
                    (window, message)
                }
            }
        };

        let (window, message) = armed;
        tracing::info!(window_ms = window.as_millis() as u64, "Interrupt received, double-tap window open");
        self.shared
            .telemetry
            .record(&TelemetryEvent::DoubleTapArmed { window });
        self.diagnostic(&message);
        None
    }

    fn force_exit(&self, code: i32) -> Error {
        tracing::warn!(code, "Second interrupt inside double-tap window, forcing exit");
        self.shared
            .telemetry
            .record(&TelemetryEvent::ForcedExit { code });
        (self.shared.exit_hook)(code);
        Error::ForcedExit { code }
    }

    fn report_unsupported(&self, signal: LogicalSignal) {
        let (message, hint) = match self.capability(signal) {
            Some(cap) => (cap.native_fallback_message.clone(), cap.operation_hint.clone()),
            None => (
                format!("{signal} is not supported on this platform"),
                "use the HTTP control endpoint".to_string(),
            ),
        };
        tracing::warn!(%signal, hint = %hint, "{}", message);
        self.shared
            .telemetry
            .record(&TelemetryEvent::UnsupportedSignal {
                signal,
                alternative: hint.clone(),
            });
        self.diagnostic(&format!("{message} ({hint})"));
    }

    fn diagnostic(&self, line: &str) {
        if self.is_quiet() {
            return;
        }
        let mut out = self
            .shared
            .diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }

    /// Unblock any in-flight `listen` and refuse future ones. Idempotent.
    pub fn stop(&self) {
        if !self.shared.stopped.is_cancelled() {
            tracing::info!("Signal manager stopping");
        }
        self.shared.stopped.cancel();
        self.shared.phase.send_replace(Phase::Terminated);
        self.shared
            .native
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
