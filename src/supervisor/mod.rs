pub(crate) mod builder;
pub(crate) mod cycle;
pub(crate) mod handle;

use std::{io, time::Duration};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{child::Command, supervisor::handle::SupervisorHandle};

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("no program to run")]
    EmptyCommand,
    #[error("failed to start {program}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to wait for program (pid {pid:?})")]
    Wait {
        pid: Option<u32>,
        #[source]
        source: io::Error,
    },
    #[error("supervisor task panicked")]
    Panicked,
}

/// Runs one program forever, restarting it every `run_period`.
///
/// Each cycle launches the program, lets it run for `run_period`, sends it
/// SIGTERM, waits up to `grace_period`, sends SIGKILL if it is still alive,
/// and launches it again once it has been reaped. A program that exits on its
/// own is relaunched right away.
///
/// Cancelling the token (see [`SupervisorHandle::shutdown`]) cuts the current
/// run period short. The grace period is still honoured, and no new cycle is
/// started afterwards.
pub struct Supervisor {
    pub(crate) command: Command,
    pub(crate) run_period: Duration,
    pub(crate) grace_period: Duration,
    pub(crate) token: CancellationToken,
    pub(crate) cycles: u64,
}

impl Supervisor {
    /// Runs the supervisor on a new tokio task and returns a handle to it.
    pub fn run(self) -> SupervisorHandle {
        let token = self.token.clone();
        let join_handle = tokio::spawn(self.run_forever());
        SupervisorHandle::new(join_handle, token)
    }

    /// Runs cycles back to back until a launch fails or shutdown is requested.
    ///
    /// Without a shutdown request this never returns `Ok`. Once the token is
    /// cancelled, the cycle in flight still escalates through SIGTERM, the
    /// grace period and SIGKILL, and the loop then returns `Ok(())` instead of
    /// launching the program again. Only a second stop signal, handled by
    /// [`SignalRelay`](crate::SignalRelay), ends the process sooner.
    pub async fn run_forever(mut self) -> Result<(), SupervisorError> {
        loop {
            if self.token.is_cancelled() {
                info!(cycles = self.cycles, "Shutdown requested, not restarting");
                return Ok(());
            }
            let report = self.run_cycle().await?;
            report.log();
        }
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn run_period(&self) -> Duration {
        self.run_period
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Number of cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }
}
