//! Injectable telemetry sink.
//!
//! The manager reports notable lifecycle events here. What happens to them
//! (metrics, audit log, nothing) is the host's choice.

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use crate::lifecycle::signals::LogicalSignal;
use crate::observability::metrics;

/// Where a dispatched signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchSource {
    /// Received by `Manager::listen` (native delivery or injection).
    Listen,
    /// HTTP control endpoint.
    Control,
    /// Direct call to `Manager::dispatch`.
    Direct,
}

impl DispatchSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DispatchSource::Listen => "listen",
            DispatchSource::Control => "control",
            DispatchSource::Direct => "direct",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// A handler was registered for a signal this host cannot deliver.
    UnsupportedSignal {
        signal: LogicalSignal,
        alternative: String,
    },
    /// First interrupt seen; a second one within `window` forces exit.
    DoubleTapArmed { window: Duration },
    ForcedExit { code: i32 },
    Dispatched {
        signal: LogicalSignal,
        source: DispatchSource,
        success: bool,
    },
}

pub trait TelemetrySink: Send + Sync + fmt::Debug {
    fn record(&self, event: &TelemetryEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn record(&self, _event: &TelemetryEvent) {}
}

/// Forwards events to the `metrics` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSink;

impl TelemetrySink for MetricsSink {
    fn record(&self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::UnsupportedSignal { signal, .. } => metrics::record_unsupported(*signal),
            TelemetryEvent::ForcedExit { code } => metrics::record_forced_exit(*code),
            TelemetryEvent::Dispatched {
                signal,
                source,
                success,
            } => metrics::record_dispatch(*signal, source.as_str(), *success),
            TelemetryEvent::DoubleTapArmed { .. } => {}
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl TelemetrySink for MemorySink {
    fn record(&self, event: &TelemetryEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
