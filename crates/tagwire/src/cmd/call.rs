use std::time::Duration;

use serde_json::Value;
use tagwire_dispatch::{status, Response};
use tagwire_session::{Client, ClientConfig};
use tagwire_transport::Endpoint;
use tracing::debug;

use crate::cmd::{parse_endpoint, CallArgs};
use crate::exit::{session_error, CliError, CliResult, RESPONSE_NOT_OK, SUCCESS, USAGE};
use crate::output::{print_response, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint = parse_endpoint(&args.endpoint)?;
    let payload = resolve_payload(&args)?;
    debug!(
        endpoint = %endpoint,
        transport = endpoint.transport_name(),
        tag = %args.tag,
        "calling"
    );

    let response = match endpoint {
        Endpoint::WebSocket(_) => call_websocket(&endpoint, &args.tag, payload, args.timeout)?,
        _ => {
            let config = ClientConfig {
                timeout: args.timeout,
                ..ClientConfig::default()
            };
            let mut client = Client::connect_with_config(&endpoint, config)
                .map_err(|err| session_error("connect failed", err))?;
            client
                .call(&args.tag, payload)
                .map_err(|err| session_error("call failed", err))?
        }
    };

    print_response(&response, format);
    Ok(exit_code_for(&response))
}

/// Only a plain 200 counts as success.
fn exit_code_for(response: &Response) -> i32 {
    if response.status_code == status::OK {
        SUCCESS
    } else {
        RESPONSE_NOT_OK
    }
}

#[cfg(feature = "async")]
fn call_websocket(
    endpoint: &Endpoint,
    tag: &str,
    payload: Value,
    timeout: Duration,
) -> CliResult<Response> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| crate::exit::io_error("runtime setup failed", err))?;
    let request = tagwire_dispatch::Request::new(tag, payload, 1);
    runtime
        .block_on(tagwire_session::call_websocket(endpoint, &request, timeout))
        .map_err(|err| session_error("call failed", err))
}

#[cfg(not(feature = "async"))]
fn call_websocket(
    endpoint: &Endpoint,
    _tag: &str,
    _payload: Value,
    _timeout: Duration,
) -> CliResult<Response> {
    Err(CliError::new(
        USAGE,
        format!("{endpoint}: WebSocket endpoints need a build with the `async` feature"),
    ))
}

/// `--timeout` values: an integer with an optional `ms`, `s` or `m` unit.
/// A bare number is seconds.
pub fn parse_timeout(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    let digits = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (amount, unit) = input.split_at(digits);
    let amount: u64 = amount
        .parse()
        .map_err(|_| format!("'{input}' does not start with a whole number"))?;

    let timeout = match unit.trim() {
        "" | "s" => Duration::from_secs(amount),
        "ms" => Duration::from_millis(amount),
        "m" => Duration::from_secs(amount.saturating_mul(60)),
        other => return Err(format!("unknown unit '{other}', expected ms, s or m")),
    };
    if timeout.is_zero() {
        return Err("timeout must be greater than zero".to_string());
    }
    Ok(timeout)
}

fn resolve_payload(args: &CallArgs) -> CliResult<Value> {
    if let Some(json) = &args.json {
        return serde_json::from_str(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")));
    }
    if let Some(data) = &args.data {
        return Ok(Value::String(data.clone()));
    }
    Ok(Value::Null)
}
