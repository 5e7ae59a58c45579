//! Process-wide default manager.
//!
//! Convenience for binaries with a single lifecycle. Libraries and tests
//! should construct their own [`Manager`].

use std::future::Future;
use std::sync::OnceLock;

use tokio_util::sync::CancellationToken;

use super::double_tap::DoubleTapConfig;
use super::error::Error;
use super::manager::Manager;
use super::registry::{HandlerResult, Registration};
use super::signals::LogicalSignal;

static DEFAULT: OnceLock<Manager> = OnceLock::new();

/// The default manager, created on first use.
pub fn default_manager() -> &'static Manager {
    DEFAULT.get_or_init(Manager::new)
}

pub fn handle<F, Fut>(signal: LogicalSignal, handler: F) -> Registration
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    default_manager().handle(signal, handler)
}

pub fn on_shutdown<F, Fut>(handler: F)
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    default_manager().on_shutdown(handler);
}

pub fn on_reload<F, Fut>(handler: F)
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    default_manager().on_reload(handler);
}

pub fn enable_double_tap(config: DoubleTapConfig) -> DoubleTapConfig {
    default_manager().enable_double_tap(config)
}

pub async fn listen(token: CancellationToken) -> Result<Option<LogicalSignal>, Error> {
    default_manager().listen(token).await
}

pub fn stop() {
    default_manager().stop();
}
