//! Turns host stop signals into supervisor shutdown.
//!
//! The first SIGINT or SIGTERM cancels the shared [`CancellationToken`], which
//! makes the supervisor stop its program through the normal SIGTERM / grace /
//! SIGKILL escalation. A second one, of either kind, exits the process on the
//! spot without touching the program, which is then left running on its own.

use std::{fmt, io};

use tokio::{
    signal::unix::{signal, Signal, SignalKind},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// A host signal asking the supervisor to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    Interrupt,
    Terminate,
}

impl StopSignal {
    pub fn number(self) -> i32 {
        match self {
            Self::Interrupt => nix::sys::signal::Signal::SIGINT as i32,
            Self::Terminate => nix::sys::signal::Signal::SIGTERM as i32,
        }
    }

    /// Exit status used when this signal forces the supervisor out.
    pub fn exit_code(self) -> i32 {
        128 + self.number()
    }
}

impl fmt::Display for StopSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => write!(f, "SIGINT"),
            Self::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// What the relay does with a received stop signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayAction {
    /// Shutdown was requested; the token has been cancelled.
    Cancel,
    /// Stop was requested again; the process must exit now.
    ForceExit(StopSignal),
}

pub struct SignalRelay {
    token: CancellationToken,
    interrupt: Signal,
    terminate: Signal,
    received: u32,
}

impl SignalRelay {
    /// Installs the SIGINT and SIGTERM handlers.
    ///
    /// Signals arriving after this call are queued even if the relay is not
    /// yet being polled, so create it before the first cycle starts.
    pub fn new(token: CancellationToken) -> io::Result<Self> {
        Ok(Self {
            token,
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            received: 0,
        })
    }

    /// Waits for the next stop signal.
    pub async fn recv(&mut self) -> Option<StopSignal> {
        tokio::select! {
            received = self.interrupt.recv() => received.map(|()| StopSignal::Interrupt),
            received = self.terminate.recv() => received.map(|()| StopSignal::Terminate),
        }
    }

    /// Applies the "ask once, then force" policy to a received signal.
    pub fn on_signal(&mut self, signal: StopSignal) -> RelayAction {
        self.received = self.received.saturating_add(1);
        if self.received == 1 {
            warn!(
                signal = %signal,
                number = signal.number(),
                "Got {signal} ({}) signal, shutting down...",
                signal.number()
            );
            self.token.cancel();
            RelayAction::Cancel
        } else {
            error!(
                signal = %signal,
                number = signal.number(),
                "Got {signal} ({}) signal, exiting!",
                signal.number()
            );
            RelayAction::ForceExit(signal)
        }
    }

    /// Relays signals until a second one arrives, then exits the process.
    pub async fn run(mut self) {
        while let Some(signal) = self.recv().await {
            if let RelayAction::ForceExit(signal) = self.on_signal(signal) {
                std::process::exit(signal.exit_code());
            }
        }
    }

    /// Runs the relay on its own tokio task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_signal_cancels_second_forces_exit() {
        let token = CancellationToken::new();
        let mut relay = SignalRelay::new(token.clone()).unwrap();

        assert_eq!(relay.on_signal(StopSignal::Terminate), RelayAction::Cancel);
        assert!(token.is_cancelled());

        assert_eq!(
            relay.on_signal(StopSignal::Interrupt),
            RelayAction::ForceExit(StopSignal::Interrupt)
        );
        assert_eq!(
            relay.on_signal(StopSignal::Terminate),
            RelayAction::ForceExit(StopSignal::Terminate)
        );
    }

    #[tokio::test]
    async fn already_cancelled_token_still_counts_first_signal() {
        let token = CancellationToken::new();
        token.cancel();
        let mut relay = SignalRelay::new(token.clone()).unwrap();
        assert_eq!(relay.on_signal(StopSignal::Interrupt), RelayAction::Cancel);
        assert!(token.is_cancelled());
    }

    #[test]
    fn exit_codes() {
        assert_eq!(StopSignal::Interrupt.exit_code(), 130);
        assert_eq!(StopSignal::Terminate.exit_code(), 143);
        assert_eq!(StopSignal::Terminate.to_string(), "SIGTERM");
    }
}
