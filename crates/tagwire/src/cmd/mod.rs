use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use tagwire_transport::Endpoint;

use crate::exit::{transport_error, CliResult};
use crate::output::OutputFormat;

pub mod call;
pub mod serve;
pub mod tags;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the built-in handlers on an endpoint.
    Serve(ServeArgs),
    /// Send one request and print the response.
    Call(CallArgs),
    /// List the built-in tags.
    Tags(TagsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Call(args) => call::run(args, format),
        Command::Tags(args) => tags::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Endpoint: `unix:/path.sock`, `tcp:host:port`, `ws://host:port`, or a socket path.
    pub endpoint: String,
    /// Dial out to the endpoint instead of listening on it.
    #[arg(long)]
    pub connect: bool,
    /// Dispatch threads per connection.
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: u16,
    /// Schema directory (`<tag>.schema.json`) for payload validation.
    #[arg(long, value_name = "DIR", env = "TAGWIRE_SCHEMA_DIR")]
    pub schemas: Option<PathBuf>,
    /// End each connection after N requests.
    #[arg(long, value_name = "N")]
    pub max_requests: Option<u64>,
    /// Exit after the first connection ends.
    #[arg(long)]
    pub once: bool,
    /// Serve on the tokio runtime, all connections concurrently.
    /// Implied for `ws://` endpoints.
    #[cfg(feature = "async")]
    #[arg(long = "async", conflicts_with_all = ["connect", "once"])]
    pub use_async: bool,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Endpoint: `unix:/path.sock`, `tcp:host:port`, `ws://host:port`, or a socket path.
    pub endpoint: String,
    /// Function tag, e.g. `rf`.
    pub tag: String,
    /// JSON payload.
    #[arg(long, conflicts_with = "data")]
    pub json: Option<String>,
    /// String payload.
    #[arg(long, conflicts_with = "json")]
    pub data: Option<String>,
    /// Maximum time to wait for the response (e.g. 5s, 500ms, 1m).
    #[arg(long, default_value = "5s", value_parser = call::parse_timeout)]
    pub timeout: Duration,
}

#[derive(Args, Debug, Default)]
pub struct TagsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_endpoint(input: &str) -> CliResult<Endpoint> {
    input
        .parse()
        .map_err(|err| transport_error("invalid endpoint", err))
}
