//! POSIX signal delivery through Tokio.

use std::io;

use futures_util::future::BoxFuture;
use tokio::signal::unix::{signal as register, Signal, SignalKind};

use super::{NativeListener, Platform};
use crate::lifecycle::signals::LogicalSignal;

/// Linux, macOS and the BSDs: every logical signal has a native equivalent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unix;

fn kind(signal: LogicalSignal) -> SignalKind {
    match signal {
        LogicalSignal::Terminate => SignalKind::terminate(),
        LogicalSignal::Interrupt => SignalKind::interrupt(),
        LogicalSignal::Hangup => SignalKind::hangup(),
        LogicalSignal::Quit => SignalKind::quit(),
        LogicalSignal::User1 => SignalKind::user_defined1(),
        LogicalSignal::User2 => SignalKind::user_defined2(),
    }
}

struct UnixListener(Signal);

impl NativeListener for UnixListener {
    fn recv(&mut self) -> BoxFuture<'_, Option<()>> {
        Box::pin(self.0.recv())
    }
}

impl Platform for Unix {
    fn name(&self) -> &'static str {
        "unix"
    }

    fn supports(&self, _signal: LogicalSignal) -> bool {
        true
    }

    fn listen(&self, signal: LogicalSignal) -> io::Result<Box<dyn NativeListener>> {
        Ok(Box::new(UnixListener(register(kind(signal))?)))
    }
}
