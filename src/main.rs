mod cli;

use std::process::ExitCode;

use anyhow::Context;
use run_under_control::{SignalRelay, SupervisorBuilder};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let token = CancellationToken::new();
    // Handlers go in before the first launch so no stop signal is lost.
    SignalRelay::new(token.clone())
        .context("failed to install signal handlers")?
        .spawn();

    let mut command = cli.command.into_iter();
    let program = command.next().context("no program to run")?;
    let supervisor = SupervisorBuilder::new(program)
        .with_args(command)
        .with_run_period(cli.run)
        .with_grace_period(cli.grace)
        .with_cancellation_token(token)
        .build()?;

    tracing::debug!(
        command = %supervisor.command(),
        run = ?supervisor.run_period(),
        grace = ?supervisor.grace_period(),
        "Configuration loaded"
    );

    supervisor.run_forever().await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("RUC_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
