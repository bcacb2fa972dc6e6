//! Bridge protocol messages
//!
//! Newline-delimited JSON exchanged with the rendering process over stdio.
//! Calls name one of a fixed set of operations; anything outside that set is
//! rejected before it can reach the filesystem.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent from the rendering process to the bridge
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Invoke a named operation with positional arguments
    Call {
        id: u64,
        op: String,
        #[serde(default)]
        args: Vec<Value>,
    },
    /// The host created the application window
    WindowOpened {
        window_id: String,
        #[serde(default)]
        title: Option<String>,
    },
    /// The application window was closed
    WindowClosed,
    /// The application was re-activated (dock click, relaunch)
    Activate,
    /// Every window is gone
    AllWindowsClosed,
}

/// Messages sent from the bridge to the rendering process
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Result of a dispatched call
    Result { id: u64, value: Reply },
    /// A message that never reached an operation
    Rejected {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        message: String,
    },
    /// Something the host has to act on after a lifecycle event
    Lifecycle { action: LifecycleAction },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    None,
    /// No window exists; the host should create one
    CreateWindow,
    /// Keep running without windows (macOS convention)
    Stay,
    /// Shut the bridge down
    Quit,
}

/// Payload of a successful dispatch, one variant per result shape
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Usage(FolderUsageReport),
    Outcome(OperationOutcome),
    Flag(bool),
    /// Text content or a chosen path; `null` on failure or cancel
    Text(Option<String>),
    Names(Vec<String>),
}

/// `{success, error?}` result of a mutating operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

/// Space used by a folder relative to the capacity of its volume
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderUsageReport {
    pub used_space: String,
    pub total_space: String,
    pub percentage: f64,
}

impl FolderUsageReport {
    /// Report returned for an absent path or any failure
    pub fn empty() -> Self {
        Self {
            used_space: "0 MB".to_string(),
            total_space: "Unknown".to_string(),
            percentage: 0.0,
        }
    }
}

/// The complete set of operations the rendering side may invoke
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    OpenDirectory,
    GetFolderInfo { folder_path: Option<String> },
    FileExists { file_path: String },
    CreateDirectory { dir_path: String },
    WriteTextFile { path: String, content: String },
    ReadTextFile { file_path: String },
    DeleteFile { file_path: String },
    RenameFile { old_path: String, new_path: String },
    AppendToLog { file_path: String, entry: Value },
    ReadDirectory { dir_path: String },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
    #[error("{op} expects {expected} argument(s), got {got}")]
    ArgumentCount {
        op: &'static str,
        expected: &'static str,
        got: usize,
    },
    #[error("{op}: argument {index} must be a string")]
    NotAString { op: &'static str, index: usize },
}

impl Request {
    /// Decode a named call against the allow-list.
    pub fn decode(op: &str, args: Vec<Value>) -> Result<Self, ProtocolError> {
        let request = match op {
            "openDirectory" => {
                expect_args("openDirectory", &args, 0)?;
                Request::OpenDirectory
            }
            "getFolderInfo" => {
                if args.len() > 1 {
                    return Err(ProtocolError::ArgumentCount {
                        op: "getFolderInfo",
                        expected: "0 or 1",
                        got: args.len(),
                    });
                }
                let folder_path = match args.into_iter().next() {
                    None | Some(Value::Null) => None,
                    Some(Value::String(path)) => Some(path),
                    Some(_) => {
                        return Err(ProtocolError::NotAString {
                            op: "getFolderInfo",
                            index: 0,
                        })
                    }
                };
                Request::GetFolderInfo { folder_path }
            }
            "fileExists" => {
                let [file_path] = strings::<1>("fileExists", args)?;
                Request::FileExists { file_path }
            }
            "createDirectory" => {
                let [dir_path] = strings::<1>("createDirectory", args)?;
                Request::CreateDirectory { dir_path }
            }
            "writeTextFile" => {
                let [path, content] = strings::<2>("writeTextFile", args)?;
                Request::WriteTextFile { path, content }
            }
            "readTextFile" => {
                let [file_path] = strings::<1>("readTextFile", args)?;
                Request::ReadTextFile { file_path }
            }
            "deleteFile" => {
                let [file_path] = strings::<1>("deleteFile", args)?;
                Request::DeleteFile { file_path }
            }
            "renameFile" => {
                let [old_path, new_path] = strings::<2>("renameFile", args)?;
                Request::RenameFile { old_path, new_path }
            }
            "appendToLog" => {
                expect_args("appendToLog", &args, 2)?;
                let mut args = args.into_iter();
                let file_path = match args.next() {
                    Some(Value::String(path)) => path,
                    _ => {
                        return Err(ProtocolError::NotAString {
                            op: "appendToLog",
                            index: 0,
                        })
                    }
                };
                let entry = args.next().unwrap_or(Value::Null);
                Request::AppendToLog { file_path, entry }
            }
            "readDirectory" => {
                let [dir_path] = strings::<1>("readDirectory", args)?;
                Request::ReadDirectory { dir_path }
            }
            other => return Err(ProtocolError::UnknownOperation(other.to_string())),
        };
        Ok(request)
    }

    /// Operation name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Request::OpenDirectory => "openDirectory",
            Request::GetFolderInfo { .. } => "getFolderInfo",
            Request::FileExists { .. } => "fileExists",
            Request::CreateDirectory { .. } => "createDirectory",
            Request::WriteTextFile { .. } => "writeTextFile",
            Request::ReadTextFile { .. } => "readTextFile",
            Request::DeleteFile { .. } => "deleteFile",
            Request::RenameFile { .. } => "renameFile",
            Request::AppendToLog { .. } => "appendToLog",
            Request::ReadDirectory { .. } => "readDirectory",
        }
    }
}

fn expect_args(op: &'static str, args: &[Value], count: usize) -> Result<(), ProtocolError> {
    if args.len() != count {
        let expected = match count {
            0 => "0",
            1 => "1",
            _ => "2",
        };
        return Err(ProtocolError::ArgumentCount {
            op,
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn strings<const N: usize>(op: &'static str, args: Vec<Value>) -> Result<[String; N], ProtocolError> {
    expect_args(op, &args, N)?;
    let mut out: [String; N] = std::array::from_fn(|_| String::new());
    for (index, (slot, value)) in out.iter_mut().zip(args).enumerate() {
        match value {
            Value::String(s) => *slot = s,
            _ => return Err(ProtocolError::NotAString { op, index }),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_known_operations() {
        let req = Request::decode("renameFile", vec![json!("/a"), json!("/b")]).unwrap();
        assert_eq!(
            req,
            Request::RenameFile {
                old_path: "/a".to_string(),
                new_path: "/b".to_string()
            }
        );
        assert_eq!(req.name(), "renameFile");

        let req = Request::decode("appendToLog", vec![json!("/log.json"), json!({"action": "open"})])
            .unwrap();
        assert_eq!(
            req,
            Request::AppendToLog {
                file_path: "/log.json".to_string(),
                entry: json!({"action": "open"})
            }
        );
    }

    #[test]
    fn decode_rejects_unknown_operation() {
        let err = Request::decode("removeTree", vec![json!("/")]).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownOperation("removeTree".to_string()));
    }

    #[test]
    fn decode_rejects_wrong_arity_and_types() {
        assert!(matches!(
            Request::decode("writeTextFile", vec![json!("/a")]),
            Err(ProtocolError::ArgumentCount { got: 1, .. })
        ));
        assert!(matches!(
            Request::decode("openDirectory", vec![json!("/a")]),
            Err(ProtocolError::ArgumentCount { got: 1, .. })
        ));
        assert_eq!(
            Request::decode("fileExists", vec![json!(42)]).unwrap_err(),
            ProtocolError::NotAString {
                op: "fileExists",
                index: 0
            }
        );
    }

    #[test]
    fn folder_info_path_is_optional() {
        assert_eq!(
            Request::decode("getFolderInfo", vec![]).unwrap(),
            Request::GetFolderInfo { folder_path: None }
        );
        assert_eq!(
            Request::decode("getFolderInfo", vec![Value::Null]).unwrap(),
            Request::GetFolderInfo { folder_path: None }
        );
    }

    #[test]
    fn reply_shapes_serialize_flat() {
        let msg = ServerMessage::Result {
            id: 3,
            value: Reply::Outcome(OperationOutcome::ok()),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "result", "id": 3, "value": {"success": true}})
        );

        let msg = ServerMessage::Result {
            id: 4,
            value: Reply::Usage(FolderUsageReport::empty()),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "result",
                "id": 4,
                "value": {"usedSpace": "0 MB", "totalSpace": "Unknown", "percentage": 0.0}
            })
        );

        let msg = ServerMessage::Result {
            id: 5,
            value: Reply::Text(None),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "result", "id": 5, "value": null})
        );
    }

    #[test]
    fn client_lifecycle_messages_parse() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"window_opened","window_id":"0x3a00007"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::WindowOpened { title: None, .. }));
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"all_windows_closed"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::AllWindowsClosed));
    }
}
