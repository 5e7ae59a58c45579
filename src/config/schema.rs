//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::lifecycle::DoubleTapConfig;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Suppress diagnostic lines on stderr.
    pub quiet: bool,

    /// Optional signal catalog replacing the built-in one.
    pub catalog_path: Option<PathBuf>,

    pub double_tap: DoubleTapSettings,

    pub control: ControlConfig,

    pub observability: ObservabilityConfig,
}

/// Double-tap interrupt escalation.
///
/// Zero / empty values fall back to the signal catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DoubleTapSettings {
    pub enabled: bool,

    /// Window in milliseconds.
    pub window_ms: u64,

    pub message: String,

    pub exit_code: i32,
}

impl Default for DoubleTapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: 0,
            message: String::new(),
            exit_code: 0,
        }
    }
}

impl DoubleTapSettings {
    pub fn to_config(&self) -> DoubleTapConfig {
        DoubleTapConfig {
            window: Duration::from_millis(self.window_ms),
            message: self.message.clone(),
            exit_code: self.exit_code,
        }
    }
}

/// HTTP control endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlConfig {
    pub enabled: bool,

    /// Bind address (e.g., "127.0.0.1:8089").
    pub bind_address: String,

    /// Route the endpoint is served on.
    pub path: String,

    /// Bearer token. `$VAR` / `${VAR}` are read from the environment.
    pub bearer_token: Option<String>,

    pub rate_limit: RateLimitConfig,

    /// TLS; with `client_ca_path` set, clients must present a certificate.
    pub tls: Option<TlsConfig>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8089".to_string(),
            path: "/admin/signal".to_string(),
            bearer_token: None,
            rate_limit: RateLimitConfig::default(),
            tls: None,
        }
    }
}

impl ControlConfig {
    pub fn require_client_cert(&self) -> bool {
        self.tls
            .as_ref()
            .is_some_and(|tls| tls.client_ca_path.is_some())
    }
}

/// Token bucket for the control endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sustained rate; fractional values allow e.g. one per minute.
    pub requests_per_second: f64,

    /// Burst capacity.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 1.0,
            burst: 5,
        }
    }
}

/// TLS configuration for the control listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,

    /// CA bundle (PEM) used to verify client certificates.
    #[serde(default)]
    pub client_ca_path: Option<PathBuf>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
