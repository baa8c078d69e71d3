//! File and directory operations: `rf`, `wf`, `ld`.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tagwire_dispatch::status::INTERNAL_ERROR;
use tagwire_dispatch::{Response, Sequence};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

use crate::models::{
    DirectoryEntry, ListDirectory, ListDirectoryResult, ReadFile, ReadFileResult, WriteFile,
    WriteFileResult,
};

pub fn read_file(sequence: Sequence, request: ReadFile) -> Response {
    match fs::read(&request.path) {
        Ok(bytes) => {
            debug!(sequence, path = %request.path, len = bytes.len(), "read file");
            let content = String::from_utf8_lossy(&bytes).into_owned();
            Response::success(sequence, &ReadFileResult { content })
        }
        Err(err) => {
            debug!(sequence, path = %request.path, error = %err, "read file failed");
            Response::failure(
                sequence,
                INTERNAL_ERROR,
                "File read error",
                format_args!("Cannot read file: {}", request.path),
            )
        }
    }
}

pub fn write_file(sequence: Sequence, request: WriteFile) -> Response {
    let mut options = OpenOptions::new();
    options.create(true);
    if request.append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }

    let written = options
        .open(&request.path)
        .and_then(|mut file| file.write_all(request.content.as_bytes()));

    match written {
        Ok(()) => {
            let message = if request.append {
                "Content appended successfully"
            } else {
                "File written successfully"
            };
            Response::success(
                sequence,
                &WriteFileResult {
                    message: message.to_string(),
                    bytes_written: request.content.len() as u64,
                },
            )
        }
        Err(err) => {
            debug!(sequence, path = %request.path, error = %err, "write file failed");
            Response::failure(
                sequence,
                INTERNAL_ERROR,
                "File write error",
                format_args!("Cannot write file: {}", request.path),
            )
        }
    }
}

pub fn list_directory(sequence: Sequence, request: ListDirectory) -> Response {
    match read_entries(Path::new(&request.path), request.include_hidden) {
        Ok(files) => Response::success(sequence, &ListDirectoryResult { files }),
        Err(err) => {
            debug!(sequence, path = %request.path, error = %err, "list directory failed");
            Response::failure(
                sequence,
                INTERNAL_ERROR,
                "Directory list error",
                format_args!("Cannot list directory: {}", request.path),
            )
        }
    }
}

fn read_entries(dir: &Path, include_hidden: bool) -> std::io::Result<Vec<DirectoryEntry>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !include_hidden && name.starts_with('.') {
            continue;
        }

        // Follow symlinks; fall back to the link itself when it dangles.
        let metadata = match fs::metadata(entry.path()).or_else(|_| entry.metadata()) {
            Ok(metadata) => metadata,
            Err(err) => {
                debug!(name = %name, error = %err, "skipping unreadable entry");
                continue;
            }
        };

        let is_dir = metadata.is_dir();
        files.push(DirectoryEntry {
            name,
            kind: if is_dir { "directory" } else { "file" },
            size: if is_dir { 0 } else { metadata.len() },
            last_modified: metadata.modified().map(rfc3339).unwrap_or_default(),
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Whole-second RFC 3339 timestamp in UTC.
fn rfc3339(at: SystemTime) -> String {
    let seconds = match at.duration_since(UNIX_EPOCH) {
        Ok(since) => since.as_secs() as i64,
        Err(before) => -(before.duration().as_secs() as i64),
    };
    OffsetDateTime::from_unix_timestamp(seconds)
        .ok()
        .and_then(|at| at.format(&Rfc3339).ok())
        .unwrap_or_default()
}
