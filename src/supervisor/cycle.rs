use std::{
    fmt,
    os::unix::process::ExitStatusExt,
    process::ExitStatus,
    time::{Duration, Instant},
};

use nix::sys::signal::Signal;
use tracing::{debug, info, warn};

use crate::{
    child::{Delivery, SupervisedChild},
    Supervisor, SupervisorError,
};

/// How far a cycle had to escalate before its child exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// The child exited on its own during the run period.
    None,
    /// The child exited after SIGTERM, within the grace period.
    Terminated,
    /// The child had to be sent SIGKILL.
    Killed,
}

impl fmt::Display for Escalation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Terminated => write!(f, "terminated"),
            Self::Killed => write!(f, "killed"),
        }
    }
}

/// Outcome of one completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: u64,
    pub pid: Option<u32>,
    pub status: ExitStatus,
    pub escalation: Escalation,
    /// Outcome of the SIGTERM request, if the cycle got that far.
    pub sigterm: Option<Delivery>,
    /// Outcome of the SIGKILL request, if the cycle got that far.
    pub sigkill: Option<Delivery>,
    pub elapsed: Duration,
}

impl CycleReport {
    pub(crate) fn log(&self) {
        let status = DisplayStatus(self.status);
        if self.status.success() {
            info!(
                cycle = self.cycle,
                pid = ?self.pid,
                %status,
                escalation = %self.escalation,
                sigterm = ?self.sigterm,
                sigkill = ?self.sigkill,
                elapsed = ?self.elapsed,
                "Program exited"
            );
        } else {
            warn!(
                cycle = self.cycle,
                pid = ?self.pid,
                %status,
                escalation = %self.escalation,
                sigterm = ?self.sigterm,
                sigkill = ?self.sigkill,
                elapsed = ?self.elapsed,
                "Program exited"
            );
        }
    }
}

struct DisplayStatus(ExitStatus);

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.0.code() {
            return write!(f, "exit code {code}");
        }
        match self.0.signal() {
            Some(raw) => match Signal::try_from(raw) {
                Ok(signal) => write!(f, "killed by {signal} ({raw})"),
                Err(_) => write!(f, "killed by signal {raw}"),
            },
            None => write!(f, "{}", self.0),
        }
    }
}

impl Supervisor {
    /// Runs one launch → run → terminate → kill cycle and returns once the
    /// child has been reaped.
    ///
    /// Only a failure to launch (or to collect the exit status) is an error;
    /// any exit status of the child, including death by signal, is a report.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, SupervisorError> {
        self.cycles = self.cycles.saturating_add(1);
        let cycle = self.cycles;

        let mut child = SupervisedChild::spawn(&self.command)?;
        let pid = child.pid();
        let started = Instant::now();
        info!(cycle, pid = ?pid, command = %self.command, "Starting...");

        let report = |status: ExitStatus,
                      escalation: Escalation,
                      sigterm: Option<Delivery>,
                      sigkill: Option<Delivery>| CycleReport {
            cycle,
            pid,
            status,
            escalation,
            sigterm,
            sigkill,
            elapsed: started.elapsed(),
        };

        // Running.
        {
            let run_timer = tokio::time::sleep(self.run_period);
            tokio::pin!(run_timer);
            tokio::select! {
                biased;
                status = child.exited() => return Ok(report(status?, Escalation::None, None, None)),
                _ = self.token.cancelled() => {
                    debug!(cycle, pid = ?pid, "Shutdown requested, stopping program");
                }
                _ = &mut run_timer => {
                    debug!(cycle, pid = ?pid, run = ?self.run_period, "Run period elapsed");
                }
            }
        }

        // Terminating. Cancellation has been spent; only the grace timer or
        // the child can end this wait.
        info!(cycle, pid = ?pid, elapsed = ?started.elapsed(), "Sending SIGTERM");
        let sigterm = child.signal(Signal::SIGTERM).await;
        log_delivery(cycle, pid, Signal::SIGTERM, sigterm);
        {
            let grace_timer = tokio::time::sleep(self.grace_period);
            tokio::pin!(grace_timer);
            tokio::select! {
                biased;
                status = child.exited() => {
                    return Ok(report(status?, Escalation::Terminated, Some(sigterm), None));
                }
                _ = &mut grace_timer => {}
            }
        }

        // Killing. No further escalation exists, so wait as long as it takes.
        info!(cycle, pid = ?pid, elapsed = ?started.elapsed(), "Sending SIGKILL");
        let sigkill = child.signal(Signal::SIGKILL).await;
        log_delivery(cycle, pid, Signal::SIGKILL, sigkill);
        let status = child.exited().await?;
        Ok(report(status, Escalation::Killed, Some(sigterm), Some(sigkill)))
    }
}

/// A signal that could not be sent is not fatal: the next wait observes the
/// exit that made it pointless.
fn log_delivery(cycle: u64, pid: Option<u32>, signal: Signal, delivery: Delivery) {
    match delivery {
        Delivery::Delivered => {}
        Delivery::AlreadyExited => {
            warn!(cycle, pid = ?pid, %signal, "Failed to send {signal}: program already exited");
        }
        Delivery::Failed(errno) => {
            warn!(cycle, pid = ?pid, %signal, error = %errno, "Failed to send {signal}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_status_exit_code() {
        let status = ExitStatus::from_raw(3 << 8);
        assert_eq!(DisplayStatus(status).to_string(), "exit code 3");
    }

    #[test]
    fn display_status_signal() {
        let status = ExitStatus::from_raw(9);
        assert_eq!(DisplayStatus(status).to_string(), "killed by SIGKILL (9)");
    }
}
