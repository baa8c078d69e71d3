//! Payload contracts and result bodies of the built-in operations.

use serde::Serialize;
use serde_json::Value;
use tagwire_dispatch::contract::{
    expect_object, expect_str, optional_bool, optional_str, required_str, string_array,
    value_kind,
};
use tagwire_dispatch::{Payload, PayloadError};

/// `rf`: read a whole file as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadFile {
    pub path: String,
}

impl Payload for ReadFile {
    const TAG: &'static str = "rf";

    fn from_payload(value: &Value) -> Result<Self, PayloadError> {
        Ok(Self {
            path: expect_str(value)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadFileResult {
    pub content: String,
}

/// `wf`: write (or append) text to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFile {
    pub path: String,
    /// Empty when absent.
    pub content: String,
    pub append: bool,
}

impl Payload for WriteFile {
    const TAG: &'static str = "wf";

    fn from_payload(value: &Value) -> Result<Self, PayloadError> {
        let object = expect_object(value)?;
        Ok(Self {
            path: required_str(object, "path")?,
            content: optional_str(object, "content")?.unwrap_or_default(),
            append: optional_bool(object, "append", false)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteFileResult {
    pub message: String,
    pub bytes_written: u64,
}

/// `ld`: list a directory. Accepts a bare path string or an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDirectory {
    pub path: String,
    pub include_hidden: bool,
}

impl Payload for ListDirectory {
    const TAG: &'static str = "ld";

    fn from_payload(value: &Value) -> Result<Self, PayloadError> {
        if let Some(path) = value.as_str() {
            return Ok(Self {
                path: path.to_string(),
                include_hidden: false,
            });
        }

        let object = value.as_object().ok_or(PayloadError::WrongType {
            expected: "a string or an object",
            found: value_kind(value),
        })?;
        Ok(Self {
            path: required_str(object, "path")?,
            include_hidden: optional_bool(object, "includeHidden", false)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub name: String,
    /// `"file"` or `"directory"`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub size: u64,
    /// RFC 3339, UTC. Empty if the platform reports no modification time.
    pub last_modified: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListDirectoryResult {
    pub files: Vec<DirectoryEntry>,
}

/// `ec`: run a program to completion and capture its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteCommand {
    pub command: String,
    pub arguments: Vec<String>,
    pub working_directory: Option<String>,
}

impl Payload for ExecuteCommand {
    const TAG: &'static str = "ec";

    fn from_payload(value: &Value) -> Result<Self, PayloadError> {
        let object = expect_object(value)?;
        let command = required_str(object, "command")?;
        if command.is_empty() {
            return Err(PayloadError::Invalid("command must not be empty".to_string()));
        }
        Ok(Self {
            command,
            arguments: string_array(object, "arguments")?,
            working_directory: optional_str(object, "workingDirectory")?
                .filter(|dir| !dir.is_empty()),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCommandResult {
    pub stdout: String,
    pub stderr: String,
    /// `-1` when the process was ended by a signal.
    pub exit_code: i32,
}

/// One section of the `gsi` report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoCategory {
    Os,
    Cpu,
    Memory,
    Disk,
}

impl InfoCategory {
    pub const ALL: [InfoCategory; 4] = [
        InfoCategory::Os,
        InfoCategory::Cpu,
        InfoCategory::Memory,
        InfoCategory::Disk,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InfoCategory::Os => "os",
            InfoCategory::Cpu => "cpu",
            InfoCategory::Memory => "memory",
            InfoCategory::Disk => "disk",
        }
    }
}

impl std::str::FromStr for InfoCategory {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InfoCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| {
                PayloadError::Invalid(format!(
                    "unknown system info category '{s}' (expected os, cpu, memory or disk)"
                ))
            })
    }
}

/// `gsi`: report on the host. `null` asks for every category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetSystemInfo {
    pub categories: Vec<InfoCategory>,
}

impl GetSystemInfo {
    pub fn wants(&self, category: InfoCategory) -> bool {
        self.categories.contains(&category)
    }
}

impl Payload for GetSystemInfo {
    const TAG: &'static str = "gsi";

    fn from_payload(value: &Value) -> Result<Self, PayloadError> {
        let categories = match value {
            Value::Null => InfoCategory::ALL.to_vec(),
            Value::Array(items) => {
                let mut categories = Vec::with_capacity(items.len());
                for item in items {
                    let name = item.as_str().ok_or(PayloadError::WrongType {
                        expected: "an array of strings",
                        found: value_kind(item),
                    })?;
                    let category: InfoCategory = name.parse()?;
                    if !categories.contains(&category) {
                        categories.push(category);
                    }
                }
                categories
            }
            other => {
                return Err(PayloadError::WrongType {
                    expected: "null or an array of strings",
                    found: value_kind(other),
                })
            }
        };
        Ok(Self { categories })
    }
}

/// The `gsi` result. Categories that were not asked for are left out.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_memory: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_memory: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_disk: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_disk: Option<u64>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn read_file_requires_string() {
        assert_eq!(
            ReadFile::from_payload(&json!("/etc/hosts")).unwrap().path,
            "/etc/hosts"
        );
        assert_eq!(
            ReadFile::from_payload(&json!({"path": "/etc/hosts"}))
                .unwrap_err()
                .to_string(),
            "expected a string, found an object"
        );
    }

    #[test]
    fn write_file_defaults() {
        let request = WriteFile::from_payload(&json!({"path": "/tmp/a"})).unwrap();
        assert_eq!(request.content, "");
        assert!(!request.append);

        let err = WriteFile::from_payload(&json!({"content": "x"})).unwrap_err();
        assert_eq!(err.to_string(), "missing required field 'path'");

        let err = WriteFile::from_payload(&json!({"path": "/tmp/a", "append": "yes"})).unwrap_err();
        assert_eq!(err.to_string(), "field 'append' must be a boolean, found a string");
    }

    #[test]
    fn list_directory_accepts_both_shapes() {
        let bare = ListDirectory::from_payload(&json!("/var")).unwrap();
        assert_eq!(bare.path, "/var");
        assert!(!bare.include_hidden);

        let full =
            ListDirectory::from_payload(&json!({"path": "/var", "includeHidden": true})).unwrap();
        assert!(full.include_hidden);

        assert!(ListDirectory::from_payload(&json!(3)).is_err());
    }

    #[test]
    fn execute_command_fields() {
        let request = ExecuteCommand::from_payload(&json!({
            "command": "ls",
            "arguments": ["-l", "/"],
            "workingDirectory": ""
        }))
        .unwrap();
        assert_eq!(request.arguments, vec!["-l", "/"]);
        assert_eq!(request.working_directory, None);

        assert!(ExecuteCommand::from_payload(&json!({"command": ""})).is_err());
        assert!(ExecuteCommand::from_payload(&json!({"command": "ls", "arguments": [1]})).is_err());
    }

    #[test]
    fn system_info_categories() {
        let all = GetSystemInfo::from_payload(&Value::Null).unwrap();
        assert_eq!(all.categories, InfoCategory::ALL.to_vec());

        let some = GetSystemInfo::from_payload(&json!(["memory", "os", "memory"])).unwrap();
        assert_eq!(some.categories, vec![InfoCategory::Memory, InfoCategory::Os]);
        assert!(!some.wants(InfoCategory::Disk));

        let err = GetSystemInfo::from_payload(&json!(["gpu"])).unwrap_err();
        assert!(err.to_string().contains("unknown system info category 'gpu'"));

        assert!(GetSystemInfo::from_payload(&json!({})).is_err());
    }

    #[test]
    fn system_info_omits_unrequested() {
        let info = SystemInfo {
            os_name: Some("linux".to_string()),
            ..SystemInfo::default()
        };
        assert_eq!(serde_json::to_value(info).unwrap(), json!({"osName": "linux"}));
    }

    #[test]
    fn directory_entry_wire_names() {
        let entry = DirectoryEntry {
            name: "a".to_string(),
            kind: "file",
            size: 1,
            last_modified: "2024-01-01T00:00:00Z".to_string(),
        };
        assert_eq!(
            serde_json::to_value(entry).unwrap(),
            json!({"name": "a", "type": "file", "size": 1, "lastModified": "2024-01-01T00:00:00Z"})
        );
    }
}
