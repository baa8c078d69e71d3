#![cfg(all(unix, feature = "cli"))]

use std::io;
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tagwire::dispatch::{decode_response, encode_request, Request};
use tagwire::frame::{FrameReader, FrameWriter};
use tagwire::transport::{connect, Endpoint, Listener};

fn spawn_server(socket: &Path, extra: &[&str]) -> Child {
    Command::new(env!("CARGO_BIN_EXE_tagwire"))
        .args(["--log-level", "error", "serve"])
        .arg(socket)
        .args(extra)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("serve command should start")
}

/// Waits until the server accepts; the check connection is closed at once.
fn wait_until_listening(socket: &Path, timeout: Duration) -> io::Result<()> {
    let endpoint = Endpoint::Unix(socket.to_path_buf());
    let start = Instant::now();
    loop {
        match connect(&endpoint) {
            Ok(_) => return Ok(()),
            Err(err) => {
                if start.elapsed() >= timeout {
                    return Err(io::Error::other(format!("connect timeout: {err}")));
                }
                thread::sleep(Duration::from_millis(25));
            }
        }
    }
}

fn call(socket: &Path, tag: &str, payload_args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tagwire"))
        .args(["--format", "json", "--log-level", "error", "call"])
        .arg(socket)
        .arg(tag)
        .args(payload_args)
        .output()
        .expect("call command should run")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be a JSON response")
}

fn stop(mut child: Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[test]
fn read_of_missing_file_returns_500_and_exit_2() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("agent.sock");
    let server = spawn_server(&socket, &[]);
    wait_until_listening(&socket, Duration::from_secs(3)).expect("server should listen");

    let output = call(&socket, "rf", &["--data", "/nonexistent/tagwire/x.txt"]);
    assert_eq!(output.status.code(), Some(2));

    let response = stdout_json(&output);
    assert_eq!(response["c"], 500);
    assert_eq!(response["e"], "File read error");
    assert_eq!(response["er"], "Cannot read file: /nonexistent/tagwire/x.txt");
    assert_eq!(response["r"], Value::Null);

    stop(server);
}

#[test]
fn unknown_tag_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("agent.sock");
    let server = spawn_server(&socket, &[]);
    wait_until_listening(&socket, Duration::from_secs(3)).expect("server should listen");

    let output = call(&socket, "unknown", &[]);
    assert_eq!(output.status.code(), Some(2));
    let response = stdout_json(&output);
    assert_eq!(response["c"], 404);
    assert_eq!(response["e"], "Function not found");
    assert_eq!(
        response["er"],
        "No callback registered for function: unknown"
    );

    stop(server);
}

#[test]
fn write_then_list_with_worker_pool() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("agent.sock");
    let data_dir = dir.path().join("data");
    std::fs::create_dir(&data_dir).unwrap();
    let server = spawn_server(&socket, &["--workers", "4"]);
    wait_until_listening(&socket, Duration::from_secs(3)).expect("server should listen");

    let file = data_dir.join("hello.txt");
    let payload = json!({"path": file, "content": "hi there"}).to_string();
    let output = call(&socket, "wf", &["--json", &payload]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout_json(&output)["r"]["bytesWritten"], 8);

    let output = call(&socket, "ld", &["--data", data_dir.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(0));
    let files = stdout_json(&output)["r"]["files"].clone();
    assert_eq!(files[0]["name"], "hello.txt");
    assert_eq!(files[0]["size"], 8);

    stop(server);
}

#[test]
fn schema_violation_returns_400() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("agent.sock");
    let schema_dir = dir.path().join("schemas");
    std::fs::create_dir(&schema_dir).unwrap();
    std::fs::write(
        schema_dir.join("wf.schema.json"),
        r#"{
            "type": "object",
            "properties": { "path": { "type": "string", "pattern": "^/tmp/" } },
            "required": ["path"]
        }"#,
    )
    .unwrap();

    let schema_arg = schema_dir.to_str().unwrap();
    let server = spawn_server(&socket, &["--schemas", schema_arg]);
    wait_until_listening(&socket, Duration::from_secs(3)).expect("server should listen");

    let output = call(&socket, "wf", &["--json", r#"{"path":"/etc/passwd"}"#]);
    assert_eq!(output.status.code(), Some(2));
    let response = stdout_json(&output);
    assert_eq!(response["c"], 400);
    assert_eq!(response["e"], "Payload conversion failed");

    stop(server);
}

#[test]
fn call_without_server_is_transport_error() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("absent.sock");
    let output = call(&socket, "gsi", &[]);
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("connect failed"));
}

#[test]
fn invalid_json_payload_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("agent.sock");
    let output = call(&socket, "wf", &["--json", "{broken"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn connect_mode_serves_the_controller() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("controller.sock");
    let controller = Listener::bind(&Endpoint::Unix(socket.clone())).unwrap();

    let mut agent = spawn_server(&socket, &["--connect", "--max-requests", "1"]);

    let stream = controller.accept().unwrap();
    let mut reader = FrameReader::new(stream.try_clone().unwrap());
    let mut writer = FrameWriter::new(stream);
    let request = Request::new("gsi", json!(["os"]), 42);
    writer.send_text(&encode_request(&request).unwrap()).unwrap();

    let response = decode_response(reader.read_text().unwrap().as_bytes()).unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.sequence, 42);
    assert!(response.result.get("osName").is_some());
    assert!(response.result.get("cpuInfo").is_none());

    let status = agent.wait().unwrap();
    assert_eq!(status.code(), Some(0));
}

#[cfg(feature = "async")]
#[test]
fn websocket_serve_and_call() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let url = format!("ws://127.0.0.1:{port}");
    let server = Command::new(env!("CARGO_BIN_EXE_tagwire"))
        .args(["--log-level", "error", "serve", &url])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("serve command should start");

    let start = Instant::now();
    while std::net::TcpStream::connect(("127.0.0.1", port)).is_err() {
        assert!(start.elapsed() < Duration::from_secs(3), "websocket server did not start");
        thread::sleep(Duration::from_millis(25));
    }

    let output = Command::new(env!("CARGO_BIN_EXE_tagwire"))
        .args(["--format", "json", "--log-level", "error", "call", &url, "gsi", "--json", r#"["os"]"#])
        .output()
        .expect("call command should run");
    assert_eq!(output.status.code(), Some(0));
    let response = stdout_json(&output);
    assert_eq!(response["c"], 200);
    assert!(response["r"].get("osName").is_some());

    stop(server);
}
