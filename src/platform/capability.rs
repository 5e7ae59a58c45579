//! Capability resolution: platform support crossed with catalog metadata.
//!
//! Resolved once when a manager is built; immutable afterwards.

use std::collections::BTreeMap;
use std::time::Duration;

use super::Platform;
use crate::catalog::SignalCatalog;
use crate::lifecycle::signals::LogicalSignal;

const CONTROL_ENDPOINT_HINT: &str = "use the HTTP control endpoint";

/// Whether and how a signal can be delivered on this host.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalCapability {
    pub signal: LogicalSignal,
    pub supported: bool,
    /// Diagnostic shown when the signal cannot be delivered natively.
    pub native_fallback_message: String,
    /// Suggested alternative trigger.
    pub operation_hint: String,
    /// Catalog default time budget, if the catalog knows the signal.
    pub default_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct CapabilityResolver {
    platform: &'static str,
    catalog_version: String,
    capabilities: BTreeMap<LogicalSignal, SignalCapability>,
}

impl CapabilityResolver {
    pub fn resolve(platform: &dyn Platform, catalog: &dyn SignalCatalog) -> Self {
        let capabilities = LogicalSignal::ALL
            .into_iter()
            .map(|signal| (signal, resolve_one(signal, platform, catalog)))
            .collect();
        Self {
            platform: platform.name(),
            catalog_version: catalog.version().to_string(),
            capabilities,
        }
    }

    pub fn supports(&self, signal: LogicalSignal) -> bool {
        self.capabilities
            .get(&signal)
            .is_some_and(|cap| cap.supported)
    }

    /// Name-based lookup; names the manager does not know are unsupported.
    pub fn supports_name(&self, name: &str) -> bool {
        name.parse::<LogicalSignal>()
            .is_ok_and(|signal| self.supports(signal))
    }

    pub fn capability(&self, signal: LogicalSignal) -> Option<&SignalCapability> {
        self.capabilities.get(&signal)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignalCapability> {
        self.capabilities.values()
    }

    pub fn platform(&self) -> &'static str {
        self.platform
    }

    pub fn catalog_version(&self) -> &str {
        &self.catalog_version
    }
}

fn resolve_one(
    signal: LogicalSignal,
    platform: &dyn Platform,
    catalog: &dyn SignalCatalog,
) -> SignalCapability {
    let Some(def) = catalog.definition(signal.id()) else {
        return SignalCapability {
            signal,
            supported: false,
            native_fallback_message: format!(
                "{} is not present in signal catalog {}",
                signal,
                catalog.version()
            ),
            operation_hint: CONTROL_ENDPOINT_HINT.to_string(),
            default_timeout: None,
        };
    };

    let supported = platform.supports(signal);
    let (native_fallback_message, operation_hint) = match (supported, def.native_fallback) {
        (true, _) => (String::new(), String::new()),
        (false, Some(fallback)) => (fallback.log_message, fallback.operation_hint),
        (false, None) => (
            format!("{} has no native delivery on {}", signal, platform.name()),
            CONTROL_ENDPOINT_HINT.to_string(),
        ),
    };

    SignalCapability {
        signal,
        supported,
        native_fallback_message,
        operation_hint,
        default_timeout: Some(Duration::from_secs(def.timeout_seconds)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TomlCatalog;
    use crate::platform::Simulated;

    #[test]
    fn test_windows_like_platform_lacks_hangup() {
        let resolver = CapabilityResolver::resolve(&Simulated::windows_like(), &*TomlCatalog::builtin());
        assert!(resolver.supports(LogicalSignal::Terminate));
        assert!(resolver.supports(LogicalSignal::Interrupt));
        assert!(!resolver.supports(LogicalSignal::Hangup));

        let cap = resolver.capability(LogicalSignal::Hangup).unwrap();
        assert!(cap.native_fallback_message.contains("SIGHUP"));
        assert!(cap.operation_hint.contains("SIGHUP"));
        assert_eq!(cap.default_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_unknown_names_resolve_unsupported() {
        let resolver = CapabilityResolver::resolve(&Simulated::all(), &*TomlCatalog::builtin());
        assert!(resolver.supports_name("sigterm"));
        assert!(!resolver.supports_name("SIGWINCH"));
        assert!(!resolver.supports_name(""));
    }

    #[test]
    fn test_signal_missing_from_catalog_is_unsupported() {
        let catalog = TomlCatalog::parse(
            r#"
            version = "minimal"

            [[signal]]
            id = "SIGTERM"
            name = "terminate"
            timeout_seconds = 5
            "#,
        )
        .unwrap();
        let resolver = CapabilityResolver::resolve(&Simulated::all(), &catalog);
        assert!(resolver.supports(LogicalSignal::Terminate));
        assert!(!resolver.supports(LogicalSignal::Interrupt));

        let cap = resolver.capability(LogicalSignal::Interrupt).unwrap();
        assert!(cap.native_fallback_message.contains("minimal"));
        assert_eq!(cap.default_timeout, None);
    }

    #[test]
    fn test_supported_signal_has_no_fallback_text() {
        let resolver = CapabilityResolver::resolve(&Simulated::all(), &*TomlCatalog::builtin());
        let cap = resolver.capability(LogicalSignal::Hangup).unwrap();
        assert!(cap.supported);
        assert!(cap.native_fallback_message.is_empty());
    }
}
