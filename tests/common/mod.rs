//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use signalman::config::ControlConfig;
use signalman::control::{self, ControlState};
use signalman::observability::MemorySink;
use signalman::platform::Simulated;
use signalman::Manager;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// A manager with no native delivery and a recording exit hook.
pub struct TestManager {
    pub manager: Manager,
    pub telemetry: Arc<MemorySink>,
    pub exit_code: Arc<AtomicI32>,
}

impl TestManager {
    pub fn new(platform: Simulated) -> Self {
        let telemetry = Arc::new(MemorySink::new());
        let exit_code = Arc::new(AtomicI32::new(-1));
        let code = exit_code.clone();
        let manager = Manager::builder()
            .with_platform(Arc::new(platform))
            .with_telemetry(telemetry.clone())
            .with_diagnostics(std::io::sink())
            .with_exit_hook(move |c| code.store(c, Ordering::SeqCst))
            .quiet(true)
            .build();
        Self {
            manager,
            telemetry,
            exit_code,
        }
    }

    #[allow(dead_code)]
    pub fn exit_code(&self) -> Option<i32> {
        match self.exit_code.load(Ordering::SeqCst) {
            -1 => None,
            code => Some(code),
        }
    }
}

/// Control endpoint bound to an ephemeral port. Stops when dropped.
pub struct ControlServer {
    pub addr: SocketAddr,
    shutdown: CancellationToken,
}

impl ControlServer {
    pub async fn start(manager: Manager, config: ControlConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let app = control::router(ControlState::new(manager, &config, shutdown.child_token()), &config.path);

        let token = shutdown.clone();
        tokio::spawn(async move {
            control::serve_listener(listener, app, token).await.unwrap();
        });

        Self { addr, shutdown }
    }

    pub fn url(&self) -> String {
        format!("http://{}/admin/signal", self.addr)
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
