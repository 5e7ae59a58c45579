//! Signal injection for tests and embedding hosts.
//!
//! Injection writes into the same intake queue that native delivery feeds,
//! so a listening manager cannot tell an injected signal from a real one.

use std::time::Duration;

use tokio::task::JoinHandle;

use super::error::Error;
use super::manager::{Manager, Phase};
use super::signals::LogicalSignal;

/// Upper bound on how long `inject` waits for queue space.
pub const INJECT_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct Harness {
    manager: Manager,
}

impl Harness {
    pub fn new(manager: &Manager) -> Self {
        Self {
            manager: manager.clone(),
        }
    }

    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    /// Deliver `signal` to a listening manager.
    ///
    /// Fails with [`Error::NotListening`] unless a `listen` call is waiting,
    /// and with [`Error::InjectTimeout`] if the queue stays full for
    /// [`INJECT_TIMEOUT`].
    pub async fn inject(&self, signal: LogicalSignal) -> Result<(), Error> {
        if self.manager.phase() != Phase::Listening {
            return Err(Error::NotListening);
        }
        self.manager
            .intake()
            .send_timeout(signal, INJECT_TIMEOUT)
            .await
            .map_err(|_| Error::InjectTimeout(signal))?;
        tracing::debug!(%signal, "Signal injected");
        Ok(())
    }

    /// Block until the manager is waiting for a signal.
    pub async fn wait_for_listen(&self, timeout: Duration) -> Result<(), Error> {
        let mut phase = self.manager.subscribe_phase();
        let ready = matches!(
            tokio::time::timeout(timeout, phase.wait_for(|p| *p == Phase::Listening)).await,
            Ok(Ok(_))
        );
        if ready {
            Ok(())
        } else {
            Err(Error::ListenTimeout)
        }
    }

    pub fn is_running(&self) -> bool {
        self.manager.is_running()
    }

    pub fn phase(&self) -> Phase {
        self.manager.phase()
    }

    /// Call `stop` on the manager after `delay`.
    pub fn stop_after(&self, delay: Duration) -> JoinHandle<()> {
        let manager = self.manager.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            manager.stop();
        })
    }
}
