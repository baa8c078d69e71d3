//! The operations a tagwire agent exposes out of the box.
//!
//! | tag   | payload                                      |
//! |-------|----------------------------------------------|
//! | `rf`  | file path                                    |
//! | `wf`  | `{path, content, append}`                    |
//! | `ld`  | directory path or `{path, includeHidden}`    |
//! | `ec`  | `{command, arguments, workingDirectory}`     |
//! | `gsi` | `null` or a list of `os`/`cpu`/`memory`/`disk` |
//!
//! Every handler answers failures with a 500 and a human-readable reason;
//! none of them panics on bad input.

pub mod exec;
pub mod fs;
pub mod models;
pub mod sysinfo;

use tagwire_dispatch::HandlerRegistry;

pub use models::{
    DirectoryEntry, ExecuteCommand, ExecuteCommandResult, GetSystemInfo, InfoCategory,
    ListDirectory, ListDirectoryResult, ReadFile, ReadFileResult, SystemInfo, WriteFile,
    WriteFileResult,
};

/// Tags registered by [`register_all`], sorted.
pub const TAGS: [&str; 5] = ["ec", "gsi", "ld", "rf", "wf"];

/// Register every built-in operation.
pub fn register_all(registry: &mut HandlerRegistry) -> &mut HandlerRegistry {
    registry
        .register(fs::read_file)
        .register(fs::write_file)
        .register(fs::list_directory)
        .register(exec::execute_command)
        .register(sysinfo::get_system_info)
}
