//! Windows console control events.
//!
//! Terminate maps to the console close event, interrupt to Ctrl+C and quit
//! to Ctrl+Break. There is no hangup or user-defined signal; those are
//! reachable only through the HTTP control endpoint.

use std::io;

use futures_util::future::BoxFuture;
use tokio::signal::windows::{ctrl_break, ctrl_c, ctrl_close, CtrlBreak, CtrlC, CtrlClose};

use super::{unsupported, NativeListener, Platform};
use crate::lifecycle::signals::LogicalSignal;

#[derive(Debug, Clone, Copy, Default)]
pub struct Windows;

enum ConsoleListener {
    Close(CtrlClose),
    CtrlC(CtrlC),
    Break(CtrlBreak),
}

impl NativeListener for ConsoleListener {
    fn recv(&mut self) -> BoxFuture<'_, Option<()>> {
        match self {
            ConsoleListener::Close(inner) => Box::pin(inner.recv()),
            ConsoleListener::CtrlC(inner) => Box::pin(inner.recv()),
            ConsoleListener::Break(inner) => Box::pin(inner.recv()),
        }
    }
}

impl Platform for Windows {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn supports(&self, signal: LogicalSignal) -> bool {
        matches!(
            signal,
            LogicalSignal::Terminate | LogicalSignal::Interrupt | LogicalSignal::Quit
        )
    }

    fn listen(&self, signal: LogicalSignal) -> io::Result<Box<dyn NativeListener>> {
        let listener = match signal {
            LogicalSignal::Terminate => ConsoleListener::Close(ctrl_close()?),
            LogicalSignal::Interrupt => ConsoleListener::CtrlC(ctrl_c()?),
            LogicalSignal::Quit => ConsoleListener::Break(ctrl_break()?),
            other => return Err(unsupported(self.name(), other)),
        };
        Ok(Box::new(listener))
    }
}
