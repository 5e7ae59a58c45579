//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Manager / control endpoint produce:
//!     → tracing events (logging.rs installs the subscriber)
//!     → TelemetryEvent (telemetry.rs, injectable sink)
//!         → MetricsSink → metrics.rs counters → Prometheus scrape
//! ```
//!
//! # Design Decisions
//! - The manager never talks to an exporter directly, only to a sink
//! - Metrics are cheap counters; no exporter installed means no-op
//! - Log level configurable via config and `RUST_LOG`

pub mod logging;
pub mod metrics;
pub mod telemetry;

pub use telemetry::{DispatchSource, MemorySink, MetricsSink, NoopSink, TelemetryEvent, TelemetrySink};
