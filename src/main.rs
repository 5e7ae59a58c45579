//! signalman daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   OS signal ──▶ platform ──┐
//!                            ├──▶ intake queue ──▶ Manager::listen ──▶ handlers ──▶ chain
//!   POST /admin/signal ──────┘        (control endpoint dispatches directly)
//!
//!   SIGHUP ──▶ reload chain ──▶ reload config file ──▶ ArcSwap<AppConfig>
//!   SIGTERM/SIGINT ──▶ cleanup chain ──▶ stop control endpoint ──▶ stop manager
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use signalman::catalog::{SignalCatalog, TomlCatalog};
use signalman::config::{load_config, AppConfig};
use signalman::lifecycle::{BoxError, HandlerResult, Manager};
use signalman::observability::{logging, metrics, MetricsSink};
use signalman::control;

#[derive(Parser)]
#[command(name = "signalman", version)]
#[command(about = "Signal-driven lifecycle daemon with an HTTP control endpoint", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "SIGNALMAN_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "signalman starting");

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let catalog: Arc<dyn SignalCatalog> = match &config.catalog_path {
        Some(path) => Arc::new(TomlCatalog::load(path)?),
        None => TomlCatalog::builtin(),
    };

    let manager = Manager::builder()
        .with_catalog(catalog)
        .with_telemetry(Arc::new(MetricsSink))
        .quiet(config.quiet)
        .build();
    apply_double_tap(&manager, &config);

    for cap in manager.capabilities().iter().filter(|cap| !cap.supported) {
        tracing::info!(signal = %cap.signal, hint = %cap.operation_hint, "Signal unavailable natively");
    }

    // Registered first so it runs last in the cleanup chain.
    let server_token = CancellationToken::new();
    {
        let server_token = server_token.clone();
        let stopper = manager.clone();
        manager.on_shutdown(move |_token| {
            server_token.cancel();
            stopper.stop();
            async { Ok(()) }
        });
    }

    let current = Arc::new(ArcSwap::from_pointee(config));
    if let Some(path) = cli.config.clone() {
        let current = current.clone();
        let target = manager.clone();
        manager.on_reload(move |_token| {
            let result = reload_config(&path, &current, &target);
            async move { result }
        });
    }

    let server = {
        let config = current.load_full();
        if config.control.enabled {
            let manager = manager.clone();
            let token = server_token.clone();
            Some(tokio::spawn(async move {
                if let Err(err) = control::serve(manager, &config.control, token).await {
                    tracing::error!(error = %err, "Control endpoint failed");
                }
            }))
        } else {
            None
        }
    };

    let listen_token = CancellationToken::new();
    let outcome = loop {
        match manager.listen(listen_token.clone()).await {
            Ok(Some(signal)) => tracing::info!(%signal, "Signal handled"),
            Ok(None) => break Ok(()),
            Err(err) if err.is_handler_failure() => {
                tracing::error!(error = %err, "Signal handling failed");
                if manager.is_stopped() {
                    break Err(err);
                }
            }
            Err(err) => break Err(err),
        }
    };

    server_token.cancel();
    if let Some(server) = server {
        let _ = server.await;
    }

    outcome?;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn apply_double_tap(manager: &Manager, config: &AppConfig) {
    if config.double_tap.enabled {
        let resolved = manager.enable_double_tap(config.double_tap.to_config());
        tracing::debug!(
            window_ms = resolved.window.as_millis() as u64,
            exit_code = resolved.exit_code,
            "Double-tap escalation enabled"
        );
    } else {
        manager.disable_double_tap();
    }
}

/// Reload step: swap in the new configuration only if it validates.
fn reload_config(path: &Path, current: &ArcSwap<AppConfig>, manager: &Manager) -> HandlerResult {
    let next = load_config(path).map_err(BoxError::from)?;
    let previous = current.load();

    if previous.control.bind_address != next.control.bind_address
        || previous.control.tls.is_some() != next.control.tls.is_some()
        || previous.control.enabled != next.control.enabled
    {
        tracing::warn!("Control endpoint settings changed; restart to apply them");
    }

    manager.set_quiet(next.quiet);
    apply_double_tap(manager, &next);
    current.store(Arc::new(next));
    tracing::info!(path = %path.display(), "Configuration reloaded");
    Ok(())
}
