//! # run-under-control
//!
//! `run-under-control` keeps a single program running and restarts it on a
//! fixed schedule. Every cycle it:
//!
//! 1. starts the program in its own process group, with inherited stdio,
//! 2. lets it run for the run period (or until it exits by itself),
//! 3. sends it SIGTERM and waits up to the grace period,
//! 4. sends it SIGKILL if it is still alive and waits for it to die,
//! 5. starts it again.
//!
//! The first SIGINT/SIGTERM received by the supervisor stops the program the
//! same way and ends the loop; a second one exits immediately.
//!
//! ## Quick example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use run_under_control::{SignalRelay, SupervisorBuilder};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let token = CancellationToken::new();
//!     SignalRelay::new(token.clone())?.spawn();
//!
//!     let supervisor = SupervisorBuilder::new("my-server")
//!         .with_args(["--port", "8080"])
//!         .with_run_period(Duration::from_secs(3600))
//!         .with_grace_period(Duration::from_secs(10))
//!         .with_cancellation_token(token)
//!         .build()?;
//!
//!     supervisor.run().wait().await?;
//!     Ok(())
//! }
//! ```
//!
//! Unix only: process groups and SIGTERM/SIGKILL have no equivalent here on
//! other platforms.

#[cfg(not(unix))]
compile_error!("run-under-control relies on Unix process groups and signals");

pub use child::{Command, Delivery};
pub use signal_relay::{RelayAction, SignalRelay, StopSignal};
pub use supervisor::{
    builder::SupervisorBuilder,
    cycle::{CycleReport, Escalation},
    handle::SupervisorHandle,
    Supervisor, SupervisorError,
};

mod child;
pub mod signal_relay;
mod supervisor;
