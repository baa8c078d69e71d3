use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde_json::Value;
use tagwire_dispatch::{encode_response, Response};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

pub fn print_response(response: &Response, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                encode_response(response).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["status".to_string(), response.status_code.to_string()])
                .add_row(vec!["sequence".to_string(), response.sequence.to_string()]);
            if !response.error.is_empty() {
                table.add_row(vec!["error".to_string(), response.error.clone()]);
            }
            if !response.error_reason.is_empty() {
                table.add_row(vec!["reason".to_string(), response.error_reason.clone()]);
            }
            table.add_row(vec!["result".to_string(), value_preview(&response.result)]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            print!("status={} sequence={}", response.status_code, response.sequence);
            if !response.error.is_empty() {
                print!(" error={:?}", response.error);
            }
            if !response.error_reason.is_empty() {
                print!(" reason={:?}", response.error_reason);
            }
            println!();
            if !response.result.is_null() {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&response.result)
                        .unwrap_or_else(|_| "null".to_string())
                );
            }
        }
        OutputFormat::Raw => {
            if response.is_success() {
                print_raw(&value_preview(&response.result));
            } else {
                print_raw(&response.error_reason);
            }
        }
    }
}

pub fn print_raw(text: &str) {
    let mut out = std::io::stdout();
    let _ = out.write_all(text.as_bytes());
    if !text.ends_with('\n') {
        let _ = out.write_all(b"\n");
    }
    let _ = out.flush();
}

/// Strings print bare; everything else as compact JSON.
fn value_preview(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
