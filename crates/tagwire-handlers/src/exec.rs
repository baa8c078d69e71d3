//! `ec`: run a program and capture its output.

use std::process::{Command, Stdio};

use tagwire_dispatch::status::INTERNAL_ERROR;
use tagwire_dispatch::{Response, Sequence};
use tracing::{debug, info};

use crate::models::{ExecuteCommand, ExecuteCommandResult};

/// Runs `command` directly, without a shell, and waits for it to exit.
///
/// A non-zero exit status is still a 200: the caller gets the exit code
/// and both output streams. Only a failure to start the program is a 500.
pub fn execute_command(sequence: Sequence, request: ExecuteCommand) -> Response {
    let mut command = Command::new(&request.command);
    command
        .args(&request.arguments)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &request.working_directory {
        command.current_dir(dir);
    }

    info!(
        sequence,
        command = %request.command,
        args = request.arguments.len(),
        "executing command"
    );

    match command.output() {
        Ok(output) => {
            let exit_code = output.status.code().unwrap_or(-1);
            debug!(sequence, exit_code, "command finished");
            Response::success(
                sequence,
                &ExecuteCommandResult {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code,
                },
            )
        }
        Err(err) => {
            debug!(sequence, command = %request.command, error = %err, "command failed to start");
            Response::failure(
                sequence,
                INTERNAL_ERROR,
                "Command execution error",
                format_args!("Cannot execute command: {}", request.command),
            )
        }
    }
}
