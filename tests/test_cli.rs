use std::{
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

use nix::{
    sys::signal::{kill, Signal},
    unistd::Pid,
};

fn ruc() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_ruc"));
    command.stdin(Stdio::null()).stderr(Stdio::piped());
    command
}

fn signal(child: &Child, signal: Signal) {
    kill(Pid::from_raw(child.id() as i32), signal).unwrap();
}

fn wait_with_deadline(child: &mut Child, deadline: Duration) -> ExitStatus {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if started.elapsed() > deadline {
            let _ = child.kill();
            panic!("ruc did not exit within {deadline:?}");
        }
        thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn test_no_program_prints_usage_and_exits_2() {
    let output = ruc().arg("-run").arg("2s").output().unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"));
}

#[test]
fn test_missing_executable_is_fatal() {
    let output = ruc()
        .arg("/nonexistent/run-under-control-test")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to start"));
}

#[test]
fn test_first_signal_stops_program_and_exits() {
    let mut child = ruc()
        .args(["-run", "30s", "-grace", "5s", "sleep", "30"])
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    thread::sleep(Duration::from_millis(1000));

    signal(&child, Signal::SIGTERM);

    let status = wait_with_deadline(&mut child, Duration::from_secs(10));
    assert_eq!(status.code(), Some(0));
}

#[test]
fn test_second_signal_exits_immediately() {
    let mut child = ruc()
        .args(["-run", "30s", "-grace", "30s", "sh", "-c", "trap '' TERM; exec sleep 5"])
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    thread::sleep(Duration::from_millis(1000));

    signal(&child, Signal::SIGTERM);
    thread::sleep(Duration::from_millis(200));
    signal(&child, Signal::SIGINT);

    let status = wait_with_deadline(&mut child, Duration::from_secs(3));
    assert_eq!(status.code(), Some(130));
}
