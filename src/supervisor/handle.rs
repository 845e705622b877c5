use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::SupervisorError;

/// Controls a supervisor started with [`Supervisor::run`](crate::Supervisor::run).
#[derive(Debug)]
pub struct SupervisorHandle {
    join_handle: JoinHandle<Result<(), SupervisorError>>,
    token: CancellationToken,
}

impl SupervisorHandle {
    pub(crate) fn new(
        join_handle: JoinHandle<Result<(), SupervisorError>>,
        token: CancellationToken,
    ) -> Self {
        Self { join_handle, token }
    }

    /// Requests shutdown: the running program is stopped through the usual
    /// SIGTERM / grace / SIGKILL escalation and no new cycle is started.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits for the supervisor to stop, after a shutdown or a launch failure.
    pub async fn wait(self) -> Result<(), SupervisorError> {
        self.join_handle
            .await
            .map_err(|_| SupervisorError::Panicked)?
    }
}
