//! HTTP control endpoint.
//!
//! # Data Flow
//! ```text
//! POST <path> {"signal": "SIGHUP", ...}
//!     → record_status (metrics by response status)
//!     → require_post (405)
//!     → rate_limit (429, one bucket for all callers)
//!     → auth::require_auth (401)
//!     → handlers::dispatch_signal (400 / 500 / 200)
//!         → Manager::dispatch_from(.., DispatchSource::Control)
//! ```
//!
//! # Design Decisions
//! - The endpoint exists for signals a platform cannot deliver natively, so it
//!   reuses the manager's dispatch path instead of reimplementing it
//! - Each request gets a child of the server's root token, cancelled when the
//!   grace period ends or the server shuts down

pub mod auth;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::any, Extension, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::ControlConfig;
use crate::lifecycle::Manager;
use crate::net::tls::{load_tls_config, TlsError};
use crate::security::RateLimiter;

pub use auth::{AuthPolicy, ClientCertificate};
pub use handlers::{ControlError, SignalRequest, SignalResponse};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// State shared by the control middleware and handler.
#[derive(Clone)]
pub struct ControlState {
    pub manager: Manager,
    pub limiter: Arc<RateLimiter>,
    pub auth: Arc<AuthPolicy>,
    /// Parent of every per-request dispatch token.
    pub root: CancellationToken,
}

impl ControlState {
    pub fn new(manager: Manager, config: &ControlConfig, root: CancellationToken) -> Self {
        Self {
            manager,
            limiter: Arc::new(RateLimiter::new(
                config.rate_limit.requests_per_second,
                config.rate_limit.burst,
            )),
            auth: Arc::new(AuthPolicy::new(
                config.bearer_token.clone(),
                config.require_client_cert(),
            )),
            root,
        }
    }
}

/// Build the control router serving `config.path`.
pub fn router(state: ControlState, path: &str) -> Router {
    if state.auth.is_open() {
        tracing::warn!(
            path,
            "Control endpoint has no bearer token or client certificate configured; this is unsafe for production"
        );
    }

    Router::new()
        .route(path, any(handlers::dispatch_signal))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_auth))
        .layer(middleware::from_fn_with_state(state.clone(), handlers::rate_limit))
        .layer(middleware::from_fn(handlers::require_post))
        .layer(middleware::from_fn(handlers::record_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("invalid control bind address '{0}'")]
    InvalidAddress(String),
    #[error(transparent)]
    Tls(#[from] TlsError),
    #[error("control server failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Serve the control endpoint until `shutdown` is cancelled.
pub async fn serve(manager: Manager, config: &ControlConfig, shutdown: CancellationToken) -> Result<(), ServeError> {
    let addr: SocketAddr = config
        .bind_address
        .parse()
        .map_err(|_| ServeError::InvalidAddress(config.bind_address.clone()))?;
    let state = ControlState::new(manager, config, shutdown.child_token());
    let app = router(state, &config.path);

    match &config.tls {
        Some(tls) => {
            let rustls = load_tls_config(tls)?;
            let app = if tls.client_ca_path.is_some() {
                app.layer(Extension(ClientCertificate))
            } else {
                app
            };

            let handle = axum_server::Handle::new();
            let graceful = handle.clone();
            tokio::spawn(async move {
                shutdown.cancelled().await;
                graceful.graceful_shutdown(Some(SHUTDOWN_GRACE));
            });

            tracing::info!(
                address = %addr,
                path = %config.path,
                mutual_tls = tls.client_ca_path.is_some(),
                "Control endpoint listening (TLS)"
            );
            axum_server::bind_rustls(addr, rustls)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = TcpListener::bind(addr).await?;
            serve_listener(listener, app, shutdown).await?;
        }
    }

    tracing::info!("Control endpoint stopped");
    Ok(())
}

/// Serve a prepared router over plain HTTP on an already bound listener.
pub async fn serve_listener(listener: TcpListener, app: Router, shutdown: CancellationToken) -> std::io::Result<()> {
    tracing::info!(address = %listener.local_addr()?, "Control endpoint listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}
