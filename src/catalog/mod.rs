//! Signal metadata catalog.
//!
//! # Data Flow
//! ```text
//! signals.toml (embedded) or operator-supplied TOML file
//!     → TomlCatalog (parse once)
//!     → SignalCatalog::definition("SIGINT")
//!     → capability resolution / double-tap defaults
//! ```
//!
//! The manager only reads the catalog; it never owns or versions it. Hosts
//! may supply their own implementation of [`SignalCatalog`].

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

const BUILTIN_CATALOG: &str = include_str!("signals.toml");

/// What a platform without native delivery should do instead.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NativeFallback {
    /// Diagnostic line printed when a handler for the signal is registered.
    pub log_message: String,
    /// Operator-facing hint naming the alternative trigger.
    pub operation_hint: String,
}

/// Catalog entry for one signal.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SignalDefinition {
    /// Catalog key, e.g. `SIGTERM`.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Default time budget for the signal's handling.
    pub timeout_seconds: u64,
    #[serde(default)]
    pub double_tap_window_seconds: Option<f64>,
    #[serde(default)]
    pub double_tap_message: Option<String>,
    #[serde(default)]
    pub double_tap_exit_code: Option<i32>,
    #[serde(default)]
    pub native_fallback: Option<NativeFallback>,
}

/// Read-only source of per-signal defaults and fallback descriptions.
pub trait SignalCatalog: Send + Sync + fmt::Debug {
    /// Look up a signal by catalog key (`SIGTERM`, `SIGHUP`, ...).
    fn definition(&self, id: &str) -> Option<SignalDefinition>;

    /// Version string of the loaded catalog.
    fn version(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    version: String,
    #[serde(default, rename = "signal")]
    signals: Vec<SignalDefinition>,
}

/// Error raised when a catalog document cannot be loaded.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Catalog backed by a TOML document.
#[derive(Debug, Clone)]
pub struct TomlCatalog {
    version: String,
    signals: HashMap<String, SignalDefinition>,
}

impl TomlCatalog {
    /// Parse a catalog document.
    pub fn parse(content: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = toml::from_str(content)?;
        let signals = doc
            .signals
            .into_iter()
            .map(|def| (def.id.to_ascii_uppercase(), def))
            .collect();
        Ok(Self {
            version: doc.version,
            signals,
        })
    }

    /// Load a catalog document from disk.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// The catalog compiled into the crate.
    pub fn builtin() -> Arc<TomlCatalog> {
        static BUILTIN: OnceLock<Arc<TomlCatalog>> = OnceLock::new();
        BUILTIN
            .get_or_init(|| {
                Arc::new(TomlCatalog::parse(BUILTIN_CATALOG).expect("embedded signal catalog is valid"))
            })
            .clone()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

impl SignalCatalog for TomlCatalog {
    fn definition(&self, id: &str) -> Option<SignalDefinition> {
        self.signals.get(&id.to_ascii_uppercase()).cloned()
    }

    fn version(&self) -> &str {
        &self.version
    }
}
