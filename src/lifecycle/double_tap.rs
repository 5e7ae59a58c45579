//! Double-tap interrupt escalation.
//!
//! # State Transitions
//! ```text
//! Disabled → (no escalation, ever)
//! Idle     → Armed:     first interrupt; timer started for `window`
//! Armed    → Idle:      timer fires (or deadline observed as passed)
//! Armed    → Escalated: second interrupt before the deadline
//! ```
//!
//! The state lives inside the manager's lock. The timer task takes the same
//! lock and only clears the state if its generation still matches, so a
//! timer racing a second tap can never undo an escalation or a re-arm.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::catalog::SignalCatalog;
use crate::lifecycle::signals::LogicalSignal;

const FALLBACK_WINDOW: Duration = Duration::from_secs(2);
const FALLBACK_MESSAGE: &str = "Press Ctrl+C again to force quit";
/// Conventional exit status for interrupt-triggered termination.
pub const DEFAULT_EXIT_CODE: i32 = 130;

/// Double-tap settings. Zero or empty fields are filled from the catalog's
/// interrupt definition when the feature is enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoubleTapConfig {
    pub window: Duration,
    pub message: String,
    pub exit_code: i32,
}

impl DoubleTapConfig {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            ..Self::default()
        }
    }

    /// Fill unset fields from the catalog, then from built-in fallbacks.
    pub fn resolve(mut self, catalog: &dyn SignalCatalog) -> Self {
        let def = catalog.definition(LogicalSignal::Interrupt.id());
        if self.window.is_zero() {
            self.window = def
                .as_ref()
                .and_then(|d| d.double_tap_window_seconds)
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .map(Duration::from_secs_f64)
                .unwrap_or(FALLBACK_WINDOW);
        }
        if self.message.is_empty() {
            self.message = def
                .as_ref()
                .and_then(|d| d.double_tap_message.clone())
                .unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
        }
        if self.exit_code == 0 {
            self.exit_code = def
                .as_ref()
                .and_then(|d| d.double_tap_exit_code)
                .unwrap_or(DEFAULT_EXIT_CODE);
        }
        self
    }
}

/// Outcome of one interrupt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tap {
    /// Feature not enabled.
    Disabled,
    /// First tap; the window is now open.
    Armed {
        generation: u64,
        window: Duration,
        message: String,
    },
    /// Second tap inside the window.
    Escalate { exit_code: i32 },
}

#[derive(Debug, Default)]
pub(crate) struct DoubleTapState {
    config: Option<DoubleTapConfig>,
    active: bool,
    deadline: Option<Instant>,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl DoubleTapState {
    pub(crate) fn configure(&mut self, config: Option<DoubleTapConfig>) {
        self.disarm();
        self.config = config;
    }

    pub(crate) fn config(&self) -> Option<&DoubleTapConfig> {
        self.config.as_ref()
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn tap(&mut self, now: Instant) -> Tap {
        let Some(config) = &self.config else {
            return Tap::Disabled;
        };

        let within_window = self.active && self.deadline.is_some_and(|deadline| now < deadline);
        if within_window {
            let exit_code = config.exit_code;
            self.disarm();
            return Tap::Escalate { exit_code };
        }

        let window = config.window;
        let message = config.message.clone();
        self.disarm();
        self.active = true;
        self.deadline = Some(now + window);
        Tap::Armed {
            generation: self.generation,
            window,
            message,
        }
    }

    /// Attach the timer task for the window opened at `generation`.
    pub(crate) fn set_timer(&mut self, generation: u64, timer: JoinHandle<()>) {
        if generation == self.generation && self.active {
            self.timer = Some(timer);
        } else {
            timer.abort();
        }
    }

    /// Timer callback. Stale generations are ignored.
    pub(crate) fn expire(&mut self, generation: u64) {
        if generation == self.generation {
            self.active = false;
            self.deadline = None;
            self.timer = None;
        }
    }

    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.active = false;
        self.deadline = None;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TomlCatalog;

    fn enabled(window_ms: u64) -> DoubleTapState {
        let mut state = DoubleTapState::default();
        state.configure(Some(
            DoubleTapConfig::new(Duration::from_millis(window_ms)).resolve(&*TomlCatalog::builtin()),
        ));
        state
    }

    #[test]
    fn test_disabled_never_escalates() {
        let mut state = DoubleTapState::default();
        let now = Instant::now();
        assert_eq!(state.tap(now), Tap::Disabled);
        assert_eq!(state.tap(now), Tap::Disabled);
    }

    #[test]
    fn test_second_tap_inside_window_escalates() {
        let mut state = enabled(50);
        let now = Instant::now();
        assert!(matches!(state.tap(now), Tap::Armed { .. }));
        assert!(state.is_active());
        assert_eq!(
            state.tap(now + Duration::from_millis(49)),
            Tap::Escalate { exit_code: 130 }
        );
        assert!(!state.is_active());
    }

    #[test]
    fn test_tap_after_deadline_is_a_fresh_first_tap() {
        let mut state = enabled(50);
        let now = Instant::now();
        assert!(matches!(state.tap(now), Tap::Armed { .. }));
        // Deadline is exclusive
        assert!(matches!(
            state.tap(now + Duration::from_millis(50)),
            Tap::Armed { .. }
        ));
    }

    #[test]
    fn test_stale_timer_does_not_clear_new_window() {
        let mut state = enabled(50);
        let now = Instant::now();
        let Tap::Armed { generation: first, .. } = state.tap(now) else {
            panic!("expected first tap to arm");
        };
        let Tap::Armed { generation: second, .. } = state.tap(now + Duration::from_millis(60)) else {
            panic!("expected late tap to re-arm");
        };
        assert_ne!(first, second);

        state.expire(first);
        assert!(state.is_active());
        state.expire(second);
        assert!(!state.is_active());
    }

    #[test]
    fn test_resolve_fills_from_catalog() {
        let config = DoubleTapConfig::default().resolve(&*TomlCatalog::builtin());
        assert_eq!(config.window, Duration::from_secs(2));
        assert_eq!(config.exit_code, 130);
        assert_eq!(config.message, "Press Ctrl+C again to force quit");

        let custom = DoubleTapConfig {
            window: Duration::from_millis(300),
            message: "again!".into(),
            exit_code: 3,
        }
        .resolve(&*TomlCatalog::builtin());
        assert_eq!(custom.window, Duration::from_millis(300));
        assert_eq!(custom.message, "again!");
        assert_eq!(custom.exit_code, 3);
    }

    #[test]
    fn test_resolve_without_catalog_entry_uses_fallbacks() {
        let catalog = TomlCatalog::parse("version = \"empty\"").unwrap();
        let config = DoubleTapConfig::default().resolve(&catalog);
        assert_eq!(config.window, FALLBACK_WINDOW);
        assert_eq!(config.exit_code, DEFAULT_EXIT_CODE);
    }
}
