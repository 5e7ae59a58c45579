//! Logical signal identities.
//!
//! # Responsibilities
//! - Name the signals the manager understands, independent of the OS
//! - Parse the names accepted on the wire (`SIGTERM`, `TERM`, `terminate`)
//! - Classify each signal into the chain it triggers
//!
//! # Design Decisions
//! - SIGTERM/SIGINT trigger the cleanup chain
//! - SIGHUP triggers the reload chain, not shutdown
//! - Quit and the user-defined signals only run their own handlers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Platform-independent identity of a control signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalSignal {
    Terminate,
    Interrupt,
    Hangup,
    Quit,
    User1,
    User2,
}

/// The categorical action a signal triggers after its own handlers ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalCategory {
    /// Run the cleanup chain (last registered, first executed).
    Shutdown,
    /// Run the reload chain (registration order, fail-fast).
    Reload,
    /// Per-signal handlers only.
    Custom,
}

impl LogicalSignal {
    /// Every signal, in catalog order.
    pub const ALL: [LogicalSignal; 6] = [
        LogicalSignal::Terminate,
        LogicalSignal::Interrupt,
        LogicalSignal::Hangup,
        LogicalSignal::Quit,
        LogicalSignal::User1,
        LogicalSignal::User2,
    ];

    /// Signals watched by `listen` when no per-signal handler is registered.
    pub const DEFAULT_SET: [LogicalSignal; 3] = [
        LogicalSignal::Terminate,
        LogicalSignal::Interrupt,
        LogicalSignal::Hangup,
    ];

    /// Conventional POSIX name, also the catalog key.
    pub fn id(self) -> &'static str {
        match self {
            LogicalSignal::Terminate => "SIGTERM",
            LogicalSignal::Interrupt => "SIGINT",
            LogicalSignal::Hangup => "SIGHUP",
            LogicalSignal::Quit => "SIGQUIT",
            LogicalSignal::User1 => "SIGUSR1",
            LogicalSignal::User2 => "SIGUSR2",
        }
    }

    /// Lowercase logical name.
    pub fn name(self) -> &'static str {
        match self {
            LogicalSignal::Terminate => "terminate",
            LogicalSignal::Interrupt => "interrupt",
            LogicalSignal::Hangup => "hangup",
            LogicalSignal::Quit => "quit",
            LogicalSignal::User1 => "user1",
            LogicalSignal::User2 => "user2",
        }
    }

    pub fn category(self) -> SignalCategory {
        match self {
            LogicalSignal::Terminate | LogicalSignal::Interrupt => SignalCategory::Shutdown,
            LogicalSignal::Hangup => SignalCategory::Reload,
            LogicalSignal::Quit | LogicalSignal::User1 | LogicalSignal::User2 => {
                SignalCategory::Custom
            }
        }
    }
}

impl fmt::Display for LogicalSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Returned when a name matches no known signal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signal: {0}")]
pub struct UnknownSignal(pub String);

impl FromStr for LogicalSignal {
    type Err = UnknownSignal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
        let signal = match bare {
            "TERM" | "TERMINATE" => LogicalSignal::Terminate,
            "INT" | "INTERRUPT" => LogicalSignal::Interrupt,
            "HUP" | "HANGUP" => LogicalSignal::Hangup,
            "QUIT" => LogicalSignal::Quit,
            "USR1" | "USER1" => LogicalSignal::User1,
            "USR2" | "USER2" => LogicalSignal::User2,
            _ => return Err(UnknownSignal(s.to_string())),
        };
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_all_spellings() {
        assert_eq!("SIGTERM".parse(), Ok(LogicalSignal::Terminate));
        assert_eq!("term".parse(), Ok(LogicalSignal::Terminate));
        assert_eq!("terminate".parse(), Ok(LogicalSignal::Terminate));
        assert_eq!(" sighup ".parse(), Ok(LogicalSignal::Hangup));
        assert_eq!("USR2".parse(), Ok(LogicalSignal::User2));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "SIGWINCH".parse::<LogicalSignal>().unwrap_err();
        assert_eq!(err.to_string(), "unknown signal: SIGWINCH");
        assert!("".parse::<LogicalSignal>().is_err());
        // "SIG" alone strips to an empty name
        assert!("SIG".parse::<LogicalSignal>().is_err());
    }

    #[test]
    fn test_categories() {
        assert_eq!(LogicalSignal::Terminate.category(), SignalCategory::Shutdown);
        assert_eq!(LogicalSignal::Interrupt.category(), SignalCategory::Shutdown);
        assert_eq!(LogicalSignal::Hangup.category(), SignalCategory::Reload);
        assert_eq!(LogicalSignal::Quit.category(), SignalCategory::Custom);
    }
}
