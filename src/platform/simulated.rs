//! A platform with a fixed capability set and no native delivery.

use std::collections::BTreeSet;
use std::io;

use futures_util::future::BoxFuture;

use super::{unsupported, NativeListener, Platform};
use crate::lifecycle::signals::LogicalSignal;

/// Reports the configured signals as supported but never delivers any.
///
/// Signals reach a manager on this platform only by injection or through
/// the HTTP control endpoint.
#[derive(Debug, Clone, Default)]
pub struct Simulated {
    supported: BTreeSet<LogicalSignal>,
}

impl Simulated {
    pub fn new(supported: impl IntoIterator<Item = LogicalSignal>) -> Self {
        Self {
            supported: supported.into_iter().collect(),
        }
    }

    /// Every logical signal supported.
    pub fn all() -> Self {
        Self::new(LogicalSignal::ALL)
    }

    /// The capability set of a Windows host.
    pub fn windows_like() -> Self {
        Self::new([
            LogicalSignal::Terminate,
            LogicalSignal::Interrupt,
            LogicalSignal::Quit,
        ])
    }
}

struct Silent;

impl NativeListener for Silent {
    fn recv(&mut self) -> BoxFuture<'_, Option<()>> {
        Box::pin(std::future::pending())
    }
}

impl Platform for Simulated {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn supports(&self, signal: LogicalSignal) -> bool {
        self.supported.contains(&signal)
    }

    fn listen(&self, signal: LogicalSignal) -> io::Result<Box<dyn NativeListener>> {
        if !self.supports(signal) {
            return Err(unsupported(self.name(), signal));
        }
        Ok(Box::new(Silent))
    }
}
