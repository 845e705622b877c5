use std::{ffi::OsString, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{child::Command, Supervisor, SupervisorError};

/// Builds a `Supervisor` for one program.
///
/// Defaults to a 60 second run period and a 10 second grace period.
pub struct SupervisorBuilder {
    command: Command,
    run_period: Duration,
    grace_period: Duration,
    token: Option<CancellationToken>,
}

impl SupervisorBuilder {
    pub const DEFAULT_RUN_PERIOD: Duration = Duration::from_secs(60);
    pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

    /// Creates a builder for `program`, with no arguments and default periods.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self::from_command(Command::new(program))
    }

    pub fn from_command(command: Command) -> Self {
        Self {
            command,
            run_period: Self::DEFAULT_RUN_PERIOD,
            grace_period: Self::DEFAULT_GRACE_PERIOD,
            token: None,
        }
    }

    pub fn with_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.command = self.command.arg(arg);
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.command = self.command.args(args);
        self
    }

    /// Sets how long the program runs before it is sent SIGTERM.
    pub fn with_run_period(mut self, period: Duration) -> Self {
        self.run_period = period;
        self
    }

    /// Sets how long to wait after SIGTERM before sending SIGKILL.
    pub fn with_grace_period(mut self, period: Duration) -> Self {
        self.grace_period = period;
        self
    }

    /// Shares a cancellation token with the supervisor, typically the one a
    /// [`SignalRelay`](crate::SignalRelay) cancels on the first stop signal.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Constructs the `Supervisor`, rejecting an empty program.
    pub fn build(self) -> Result<Supervisor, SupervisorError> {
        if self.command.is_empty() {
            return Err(SupervisorError::EmptyCommand);
        }
        Ok(Supervisor {
            command: self.command,
            run_period: self.run_period,
            grace_period: self.grace_period,
            token: self.token.unwrap_or_default(),
            cycles: 0,
        })
    }
}
