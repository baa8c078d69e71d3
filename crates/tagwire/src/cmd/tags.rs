use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use tagwire_handlers::TAGS;

use crate::cmd::TagsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct TagInfo {
    tag: &'static str,
    payload: &'static str,
    description: &'static str,
}

#[derive(Serialize)]
struct TagsOutput {
    tags: Vec<TagInfo>,
}

pub fn run(_args: TagsArgs, format: OutputFormat) -> CliResult<i32> {
    let output = TagsOutput {
        tags: TAGS.iter().map(|&tag| describe(tag)).collect(),
    };

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TAG", "PAYLOAD", "DESCRIPTION"]);
            for info in &output.tags {
                table.add_row(vec![info.tag, info.payload, info.description]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for info in &output.tags {
                println!("{:<4} {:<44} {}", info.tag, info.payload, info.description);
            }
        }
        OutputFormat::Raw => {
            for info in &output.tags {
                println!("{}", info.tag);
            }
        }
    }

    Ok(SUCCESS)
}

fn describe(tag: &'static str) -> TagInfo {
    let (payload, description) = match tag {
        "rf" => ("\"<path>\"", "Read a file as text"),
        "wf" => ("{path, content?, append?}", "Write or append to a file"),
        "ld" => ("\"<path>\" | {path, includeHidden?}", "List a directory"),
        "ec" => ("{command, arguments?, workingDirectory?}", "Run a program"),
        "gsi" => ("null | [\"os\"|\"cpu\"|\"memory\"|\"disk\"]", "Report host information"),
        _ => ("?", ""),
    };
    TagInfo {
        tag,
        payload,
        description,
    }
}
