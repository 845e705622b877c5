use std::{
    ffi::{OsStr, OsString},
    fmt, io,
    process::{ExitStatus, Stdio},
};

use nix::{
    errno::Errno,
    sys::signal::{kill, Signal},
    unistd::Pid,
};
use tokio::{
    process::Child,
    sync::{mpsc, oneshot},
};

use crate::SupervisorError;

/// The program and arguments launched on every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    program: OsString,
    args: Vec<OsString>,
}

impl Command {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.program.is_empty()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// What happened to a signal the cycle asked to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// `kill(2)` succeeded on the still unreaped child.
    Delivered,
    /// The child had already been reaped, so nothing was sent.
    AlreadyExited,
    /// `kill(2)` failed on the still unreaped child.
    Failed(Errno),
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered => write!(f, "delivered"),
            Self::AlreadyExited => write!(f, "already exited"),
            Self::Failed(errno) => write!(f, "failed: {errno}"),
        }
    }
}

type SignalRequest = (Signal, oneshot::Sender<Delivery>);

/// A child process owned by a single supervision cycle.
///
/// The `tokio::process::Child` lives in a background waiter task, the only
/// place that reaps it and the only place that signals it. A signal is sent
/// only while the child is unreaped (at worst a zombie), so its pid can never
/// have been handed to another process.
pub(crate) struct SupervisedChild {
    pid: Option<u32>,
    requests: mpsc::UnboundedSender<SignalRequest>,
    exit_rx: oneshot::Receiver<io::Result<ExitStatus>>,
    status: Option<ExitStatus>,
}

impl SupervisedChild {
    /// Spawns `command` with inherited stdio, in a process group of its own so
    /// that a terminal Ctrl-C reaches the supervisor only.
    pub(crate) fn spawn(command: &Command) -> Result<Self, SupervisorError> {
        let child = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .process_group(0)
            .spawn()
            .map_err(|source| SupervisorError::Launch {
                program: command.program.to_string_lossy().into_owned(),
                source,
            })?;

        let pid = child.id();
        let (requests, requests_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = oneshot::channel();
        tokio::spawn(reap(child, requests_rx, exit_tx));

        Ok(Self {
            pid,
            requests,
            exit_rx,
            status: None,
        })
    }

    pub(crate) fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Resolves once the waiter has reaped the child.
    ///
    /// Cancel-safe, so it can sit in a `select!` next to timers. Once the
    /// status is known it is returned again on every later call.
    pub(crate) async fn exited(&mut self) -> Result<ExitStatus, SupervisorError> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        let status = match (&mut self.exit_rx).await {
            Ok(Ok(status)) => status,
            Ok(Err(source)) => return Err(SupervisorError::Wait { pid: self.pid, source }),
            Err(_) => {
                return Err(SupervisorError::Wait {
                    pid: self.pid,
                    source: io::Error::other("exit status waiter dropped"),
                })
            }
        };
        self.status = Some(status);
        Ok(status)
    }

    /// Asks the waiter to send `signal` to the child only, not to its process
    /// group, and reports what happened.
    pub(crate) async fn signal(&self, signal: Signal) -> Delivery {
        if self.status.is_some() {
            return Delivery::AlreadyExited;
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.requests.send((signal, reply_tx)).is_err() {
            return Delivery::AlreadyExited;
        }
        // A dropped reply means the waiter reaped the child first.
        reply_rx.await.unwrap_or(Delivery::AlreadyExited)
    }
}

/// Waits for `child`, delivering signal requests while it is still unreaped.
///
/// Exit wins over a pending request: once `wait()` has returned, queued
/// requests are dropped unanswered.
async fn reap(
    mut child: Child,
    mut requests: mpsc::UnboundedReceiver<SignalRequest>,
    exit_tx: oneshot::Sender<io::Result<ExitStatus>>,
) {
    let status = loop {
        tokio::select! {
            biased;
            status = child.wait() => break status,
            Some((signal, reply)) = requests.recv() => {
                let _ = reply.send(deliver(&child, signal));
            }
        }
    };
    let _ = exit_tx.send(status);
}

fn deliver(child: &Child, signal: Signal) -> Delivery {
    // `id()` is `None` only once tokio has reaped the child.
    let Some(id) = child.id() else {
        return Delivery::AlreadyExited;
    };
    #[allow(clippy::cast_possible_wrap)]
    let pid = Pid::from_raw(id as i32);
    match kill(pid, signal) {
        Ok(()) => Delivery::Delivered,
        Err(errno) => Delivery::Failed(errno),
    }
}
