use std::time::Duration;

use run_under_control::SupervisorBuilder;

#[allow(unused)]
pub const RUN: Duration = Duration::from_millis(300);
#[allow(unused)]
pub const GRACE: Duration = Duration::from_millis(300);

/// A supervisor builder running `script` under `sh -c`, with short periods.
#[allow(unused)]
pub fn sh(script: &str) -> SupervisorBuilder {
    SupervisorBuilder::new("sh")
        .with_args(["-c", script])
        .with_run_period(RUN)
        .with_grace_period(GRACE)
}

/// Exits with the given code right away.
#[allow(unused)]
pub fn exits_with(code: i32) -> SupervisorBuilder {
    sh(&format!("exit {code}"))
}

/// Runs until terminated; dies on the first SIGTERM.
#[allow(unused)]
pub fn obedient() -> SupervisorBuilder {
    sh("exec sleep 30")
}

/// Ignores SIGTERM, so only SIGKILL stops it. The ignored disposition
/// survives the exec, so no orphaned `sleep` is left behind.
#[allow(unused)]
pub fn stubborn() -> SupervisorBuilder {
    sh("trap '' TERM; exec sleep 30")
}

/// Ignores SIGTERM but exits by itself after `after`.
#[allow(unused)]
pub fn slow_to_exit(after: Duration) -> SupervisorBuilder {
    sh(&format!("trap '' TERM; exec sleep {}", after.as_secs_f64()))
}
