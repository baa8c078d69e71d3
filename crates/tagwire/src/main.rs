mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::exit::{SUCCESS, USAGE};
use crate::logging::{init_logging, LogFormat};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "tagwire", version, about = "Tag-routed JSON dispatch CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", env = "TAGWIRE_FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(
        long,
        value_name = "FORMAT",
        env = "TAGWIRE_LOG_FORMAT",
        default_value = "text",
        global = true
    )]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        env = "TAGWIRE_LOG_LEVEL",
        default_value = "info",
        global = true
    )]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Exit 2 belongs to `call`; argument errors report as usage.
            let code = if err.use_stderr() { USAGE } else { SUCCESS };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call_subcommand() {
        let cli = Cli::try_parse_from([
            "tagwire",
            "call",
            "/tmp/agent.sock",
            "rf",
            "--data",
            "/etc/hostname",
        ])
        .expect("call args should parse");

        assert!(matches!(cli.command, Command::Call(_)));
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "tagwire",
            "call",
            "/tmp/agent.sock",
            "wf",
            "--json",
            "{\"path\":\"/tmp/x\"}",
            "--data",
            "hello",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_serve_subcommand() {
        let cli = Cli::try_parse_from([
            "tagwire",
            "serve",
            "tcp:127.0.0.1:7000",
            "--workers",
            "4",
            "--max-requests",
            "10",
        ])
        .expect("serve args should parse");

        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.workers, 4);
                assert_eq!(args.max_requests, Some(10));
                assert!(!args.connect);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_workers() {
        let err = Cli::try_parse_from(["tagwire", "serve", "/tmp/a.sock", "--workers", "0"])
            .expect_err("zero workers should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn typed_timeout_and_level() {
        let cli = Cli::try_parse_from([
            "tagwire",
            "--log-level",
            "DEBUG",
            "call",
            "ws://localhost:8765",
            "gsi",
            "--timeout",
            "250ms",
        ])
        .expect("call args should parse");

        assert_eq!(cli.log_level, tracing::Level::DEBUG);
        match cli.command {
            Command::Call(args) => {
                assert_eq!(args.timeout, std::time::Duration::from_millis(250));
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let err = Cli::try_parse_from(["tagwire", "call", "/tmp/a.sock", "rf", "--timeout", "0s"])
            .expect_err("zero timeout should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
