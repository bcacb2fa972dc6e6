//! Bridge server
//!
//! Reads client messages line by line, dispatches each call as its own task
//! and writes replies through a single writer. Calls run to completion; there
//! is no cancellation, and replies may arrive out of order (match them by `id`).

use std::ops::ControlFlow;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, RwLock};

use crate::filesystem::config::BridgeConfig;
use crate::filesystem::error::BridgeError;
use crate::filesystem::{path_utils, usage, FileSystemService};
use crate::lifecycle::{AppLifecycle, LifecycleEvent, WindowHandle};
use crate::protocol::{
    ClientMessage, LifecycleAction, OperationOutcome, Reply, Request, ServerMessage,
};

/// Bridge shared state
pub struct BridgeState {
    pub file_system: Arc<FileSystemService>,
    pub lifecycle: AppLifecycle,
}

impl BridgeState {
    pub fn new(file_system: FileSystemService, lifecycle: AppLifecycle) -> Self {
        Self {
            file_system: Arc::new(file_system),
            lifecycle,
        }
    }
}

pub type SharedState = Arc<RwLock<BridgeState>>;

/// Prepare the storage root and serve the rendering process over stdio
pub async fn run(config: BridgeConfig) -> std::io::Result<()> {
    let storage_root = path_utils::prepare_storage_root(&config).await;
    let file_system = FileSystemService::new(config, storage_root);
    tracing::info!(
        "Bridge ready ({:?} mode, storage root {})",
        file_system.config().mode,
        file_system
            .storage_root()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "unresolved".to_string())
    );

    let state: SharedState = Arc::new(RwLock::new(BridgeState::new(
        file_system,
        AppLifecycle::default(),
    )));

    serve(tokio::io::stdin(), tokio::io::stdout(), state).await?;
    tracing::info!("Bridge shutting down");
    Ok(())
}

/// Serve one client until its input closes or the lifecycle asks to quit.
///
/// In-flight calls are finished and their replies flushed before returning.
pub async fn serve<R, W>(reader: R, writer: W, state: SharedState) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<ServerMessage>();
    let writer_task = tokio::spawn(write_messages(writer, rx));

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        // A bad line from the client must not end the session.
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                tracing::debug!("Ignoring non-UTF-8 client message: {}", e);
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        if let ControlFlow::Break(()) = process_line(line, &state, &tx).await {
            break;
        }
    }

    // The writer finishes once every spawned call has dropped its sender.
    drop(tx);
    match writer_task.await {
        Ok(result) => result,
        Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e)),
    }
}

async fn write_messages<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(msg) = rx.recv().await {
        let line = match serde_json::to_string(&msg) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to serialize reply: {}", e);
                continue;
            }
        };
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    writer.shutdown().await
}

async fn process_line(
    line: &str,
    state: &SharedState,
    tx: &mpsc::UnboundedSender<ServerMessage>,
) -> ControlFlow<()> {
    let raw: Value = match serde_json::from_str(line) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!("Ignoring unparsable client message: {}", e);
            return ControlFlow::Continue(());
        }
    };
    let id = raw.get("id").and_then(Value::as_u64);

    match serde_json::from_value::<ClientMessage>(raw) {
        Ok(msg) => process_client_msg(msg, state, tx).await,
        Err(e) => {
            match id {
                Some(id) => {
                    let _ = tx.send(ServerMessage::Rejected {
                        id: Some(id),
                        message: format!("malformed message: {}", e),
                    });
                }
                None => tracing::debug!("Ignoring malformed client message: {}", e),
            }
            ControlFlow::Continue(())
        }
    }
}

/// Process a message from the rendering process
async fn process_client_msg(
    msg: ClientMessage,
    state: &SharedState,
    tx: &mpsc::UnboundedSender<ServerMessage>,
) -> ControlFlow<()> {
    let event = match msg {
        ClientMessage::Call { id, op, args } => {
            let request = match Request::decode(&op, args) {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!("Rejected call {}: {}", id, e);
                    let _ = tx.send(ServerMessage::Rejected {
                        id: Some(id),
                        message: e.to_string(),
                    });
                    return ControlFlow::Continue(());
                }
            };

            let (fs, window) = {
                let state = state.read().await;
                (state.file_system.clone(), state.lifecycle.window().cloned())
            };
            let tx = tx.clone();
            tokio::spawn(async move {
                let value = dispatch(&fs, request, window).await;
                let _ = tx.send(ServerMessage::Result { id, value });
            });
            return ControlFlow::Continue(());
        }
        ClientMessage::WindowOpened { window_id, title } => {
            LifecycleEvent::WindowOpened(WindowHandle {
                id: window_id,
                title,
            })
        }
        ClientMessage::WindowClosed => LifecycleEvent::WindowClosed,
        ClientMessage::Activate => LifecycleEvent::Activate,
        ClientMessage::AllWindowsClosed => LifecycleEvent::AllWindowsClosed,
    };

    let action = state.write().await.lifecycle.handle(event);
    match action {
        LifecycleAction::None | LifecycleAction::Stay => ControlFlow::Continue(()),
        LifecycleAction::CreateWindow => {
            let _ = tx.send(ServerMessage::Lifecycle { action });
            ControlFlow::Continue(())
        }
        LifecycleAction::Quit => {
            let _ = tx.send(ServerMessage::Lifecycle { action });
            ControlFlow::Break(())
        }
    }
}

/// Run one allow-listed request and shape its result for the wire.
///
/// Failures never escape: each operation maps them to its own failure shape.
pub async fn dispatch(
    fs: &FileSystemService,
    request: Request,
    window: Option<WindowHandle>,
) -> Reply {
    let op = request.name();
    tracing::debug!("Dispatching {}", op);

    match request {
        Request::OpenDirectory => Reply::Text(
            fs.picker()
                .pick(window.as_ref())
                .await
                .map(|path| path.display().to_string()),
        ),
        Request::GetFolderInfo { folder_path } => {
            Reply::Usage(usage::folder_info(folder_path.as_deref()).await)
        }
        Request::FileExists { file_path } => Reply::Flag(fs.ops().exists(&file_path).await),
        Request::CreateDirectory { dir_path } => {
            Reply::Outcome(outcome(op, fs.ops().create_directory(&dir_path).await))
        }
        Request::WriteTextFile { path, content } => {
            Reply::Outcome(outcome(op, fs.ops().write_text_file(&path, &content).await))
        }
        Request::ReadTextFile { file_path } => match fs.ops().read_text_file(&file_path).await {
            Ok(content) => Reply::Text(Some(content)),
            Err(e) => {
                tracing::error!("Failed to read file: {}", e);
                Reply::Text(None)
            }
        },
        Request::DeleteFile { file_path } => {
            Reply::Outcome(outcome(op, fs.ops().delete_file(&file_path).await))
        }
        Request::RenameFile { old_path, new_path } => {
            Reply::Outcome(outcome(op, fs.ops().rename_file(&old_path, &new_path).await))
        }
        Request::AppendToLog { file_path, entry } => {
            Reply::Outcome(outcome(op, fs.audit_log().append(&file_path, entry).await))
        }
        Request::ReadDirectory { dir_path } => match fs.ops().list_directory(&dir_path).await {
            Ok(names) => Reply::Names(names),
            Err(e) => {
                tracing::error!("Failed to read directory: {}", e);
                Reply::Names(Vec::new())
            }
        },
    }
}

fn outcome(op: &str, result: Result<(), BridgeError>) -> OperationOutcome {
    match result {
        Ok(()) => OperationOutcome::ok(),
        Err(e) => {
            tracing::error!("{} failed: {}", op, e);
            OperationOutcome::failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn test_state(lifecycle: AppLifecycle) -> SharedState {
        let fs = FileSystemService::new(BridgeConfig::default(), None);
        Arc::new(RwLock::new(BridgeState::new(fs, lifecycle)))
    }

    async fn run_session(input: impl AsRef<[u8]>, state: SharedState) -> Vec<Value> {
        let (writer, mut reader) = tokio::io::duplex(1 << 20);
        serve(input.as_ref(), writer, state).await.unwrap();

        let mut output = String::new();
        reader.read_to_string(&mut output).await.unwrap();
        output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn reply_for(replies: &[Value], id: u64) -> &Value {
        replies
            .iter()
            .find(|r| r["id"] == id)
            .unwrap_or_else(|| panic!("no reply for id {}", id))
    }

    #[tokio::test]
    async fn serves_file_round_trip() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("note.txt");
        let file = file.to_string_lossy().to_string();

        // Calls run concurrently, so each session only depends on earlier sessions.
        let state = test_state(AppLifecycle::new(false));
        let write = json!({"type": "call", "id": 1, "op": "writeTextFile", "args": [file, "hello"]});
        let replies = run_session(format!("{}\n", write), state.clone()).await;
        assert_eq!(reply_for(&replies, 1)["value"], json!({"success": true}));

        let read = json!({"type": "call", "id": 2, "op": "readTextFile", "args": [file]});
        let exists = json!({"type": "call", "id": 3, "op": "fileExists", "args": [file]});
        let replies = run_session(format!("{}\n{}\n", read, exists), state).await;
        assert_eq!(reply_for(&replies, 2)["value"], "hello");
        assert_eq!(reply_for(&replies, 3)["value"], true);
    }

    #[tokio::test]
    async fn failures_use_each_operation_shape() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.txt");
        let missing = missing.to_string_lossy().to_string();

        let input = [
            json!({"type": "call", "id": 1, "op": "readTextFile", "args": [missing]}),
            json!({"type": "call", "id": 2, "op": "deleteFile", "args": [missing]}),
            json!({"type": "call", "id": 3, "op": "readDirectory", "args": [missing]}),
            json!({"type": "call", "id": 4, "op": "getFolderInfo", "args": [""]}),
        ]
        .iter()
        .map(|m| format!("{}\n", m))
        .collect::<String>();

        let replies = run_session(input, test_state(AppLifecycle::new(false))).await;
        assert_eq!(reply_for(&replies, 1)["value"], Value::Null);
        assert_eq!(reply_for(&replies, 2)["value"]["success"], false);
        assert!(reply_for(&replies, 2)["value"]["error"].is_string());
        assert_eq!(reply_for(&replies, 3)["value"], json!([]));
        assert_eq!(
            reply_for(&replies, 4)["value"],
            json!({"usedSpace": "0 MB", "totalSpace": "Unknown", "percentage": 0.0})
        );
    }

    #[tokio::test]
    async fn rejects_calls_outside_allow_list() {
        let input = concat!(
            r#"{"type":"call","id":9,"op":"removeTree","args":["/"]}"#,
            "\n",
            r#"{"type":"call","id":10,"op":"fileExists","args":[]}"#,
            "\n",
            "this is not json\n",
            r#"{"type":"teleport","id":11}"#,
            "\n",
        );
        let replies = run_session(input.to_string(), test_state(AppLifecycle::new(false))).await;

        assert_eq!(replies.len(), 3);
        let rejected = reply_for(&replies, 9);
        assert_eq!(rejected["type"], "rejected");
        assert_eq!(rejected["message"], "unknown operation: removeTree");
        assert_eq!(reply_for(&replies, 10)["type"], "rejected");
        assert_eq!(reply_for(&replies, 11)["type"], "rejected");
    }

    #[tokio::test]
    async fn invalid_utf8_line_does_not_end_session() {
        let mut input = Vec::new();
        input.extend_from_slice(br#"{"type":"call","id":1,"op":"fileExists","args":["/"]}"#);
        input.push(b'\n');
        input.extend_from_slice(b"\xff\xfe garbage\n");
        input.extend_from_slice(br#"{"type":"call","id":2,"op":"fileExists","args":["/"]}"#);
        input.extend_from_slice(b"\r\n");

        let replies = run_session(input, test_state(AppLifecycle::new(false))).await;

        assert_eq!(replies.len(), 2);
        assert_eq!(reply_for(&replies, 1)["value"], true);
        assert_eq!(reply_for(&replies, 2)["value"], true);
    }

    #[tokio::test]
    async fn lifecycle_events_drive_shutdown() {
        let input = concat!(
            r#"{"type":"activate"}"#,
            "\n",
            r#"{"type":"window_opened","window_id":"7"}"#,
            "\n",
            r#"{"type":"all_windows_closed"}"#,
            "\n",
            r#"{"type":"call","id":1,"op":"fileExists","args":["/"]}"#,
            "\n",
        );
        let state = test_state(AppLifecycle::new(false));
        let replies = run_session(input.to_string(), state.clone()).await;

        assert_eq!(
            replies,
            vec![
                json!({"type": "lifecycle", "action": "create_window"}),
                json!({"type": "lifecycle", "action": "quit"}),
            ]
        );
        assert!(state.read().await.lifecycle.window().is_none());
    }

    #[tokio::test]
    async fn dispatch_appends_to_log() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("audit.json");
        let fs = FileSystemService::new(BridgeConfig::default(), None);

        let reply = dispatch(
            &fs,
            Request::AppendToLog {
                file_path: log.to_string_lossy().to_string(),
                entry: json!({"action": "open", "patient": "p-7"}),
            },
            None,
        )
        .await;
        assert_eq!(reply, Reply::Outcome(OperationOutcome::ok()));

        let stored: Value = serde_json::from_str(&std::fs::read_to_string(&log).unwrap()).unwrap();
        assert_eq!(stored.as_array().unwrap().len(), 1);
        assert_eq!(stored[0]["patient"], "p-7");
    }
}
