use std::{ffi::OsString, time::Duration};

use clap::Parser;

/// Run a program, restart it every run period: SIGTERM first, SIGKILL after
/// the grace period, then start it again.
#[derive(Debug, Parser)]
#[command(
    name = "ruc",
    version,
    override_usage = "ruc [flags] <program> [program arguments...]"
)]
pub(crate) struct Cli {
    /// Period between starting the program and sending it SIGTERM
    #[arg(
        long = "run",
        value_name = "DURATION",
        default_value = "60s",
        value_parser = humantime::parse_duration
    )]
    pub(crate) run: Duration,

    /// Period between sending the program SIGTERM and SIGKILL
    #[arg(
        long = "grace",
        value_name = "DURATION",
        default_value = "10s",
        value_parser = humantime::parse_duration
    )]
    pub(crate) grace: Duration,

    /// Program to run, followed by its arguments
    #[arg(
        value_name = "PROGRAM",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub(crate) command: Vec<OsString>,
}

impl Cli {
    /// Parses the command line, accepting single-dash long flags (`-run 2s`).
    pub(crate) fn parse_args() -> Self {
        Self::parse_from(normalize_flags(std::env::args_os()))
    }
}

const LONG_FLAGS: [&str; 2] = ["run", "grace"];

/// Rewrites `-run`/`-grace` (and their `=value` forms) to `--run`/`--grace`.
///
/// Only the supervisor's own flags are touched: rewriting stops at `--` or at
/// the first positional argument, which is the program.
pub(crate) fn normalize_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    let mut out: Vec<OsString> = args.next().into_iter().collect();
    let mut expects_value = false;

    for arg in args.by_ref() {
        if expects_value {
            expects_value = false;
            out.push(arg);
            continue;
        }
        let Some(text) = arg.to_str() else {
            out.push(arg);
            break;
        };
        if text == "--" || !text.starts_with('-') {
            out.push(arg);
            break;
        }
        let flag = text.trim_start_matches('-');
        let (name, value) = match flag.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (flag, None),
        };
        if LONG_FLAGS.contains(&name) {
            expects_value = value.is_none();
            out.push(OsString::from(format!("--{flag}")));
        } else {
            out.push(arg);
        }
    }

    out.extend(args);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn single_dash_flags_are_rewritten() {
        let args = normalize_flags(os(&["ruc", "-run", "2s", "-grace=1s", "sleep", "10"]));
        assert_eq!(args, os(&["ruc", "--run", "2s", "--grace=1s", "sleep", "10"]));
    }

    #[test]
    fn program_arguments_are_left_alone() {
        let args = normalize_flags(os(&["ruc", "--run", "5s", "prog", "-run", "-grace=3"]));
        assert_eq!(args, os(&["ruc", "--run", "5s", "prog", "-run", "-grace=3"]));

        let args = normalize_flags(os(&["ruc", "--", "-run"]));
        assert_eq!(args, os(&["ruc", "--", "-run"]));
    }

    #[test]
    fn parse_with_defaults() {
        let cli = Cli::try_parse_from(normalize_flags(os(&["ruc", "sleep", "10"]))).unwrap();
        assert_eq!(cli.run, Duration::from_secs(60));
        assert_eq!(cli.grace, Duration::from_secs(10));
        assert_eq!(cli.command, os(&["sleep", "10"]));
    }

    #[test]
    fn parse_go_style_flags() {
        let cli = Cli::try_parse_from(normalize_flags(os(&[
            "ruc", "-run", "1m30s", "-grace", "500ms", "server", "--verbose", "-x",
        ])))
        .unwrap();
        assert_eq!(cli.run, Duration::from_secs(90));
        assert_eq!(cli.grace, Duration::from_millis(500));
        assert_eq!(cli.command, os(&["server", "--verbose", "-x"]));
    }

    #[test]
    fn missing_program_is_a_usage_error() {
        let err = Cli::try_parse_from(os(&["ruc", "--run", "2s"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn bad_duration_is_rejected() {
        assert!(Cli::try_parse_from(os(&["ruc", "--run", "soon", "true"])).is_err());
    }
}
