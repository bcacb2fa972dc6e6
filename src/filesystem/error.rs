use std::path::PathBuf;

/// Failure inside the file service. Rendered to a message at the protocol boundary.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("{source}: {path}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("failed to serialize audit log: {0}")]
    Json(#[from] serde_json::Error),
    #[error("log entry must be a JSON object, got {0}")]
    InvalidEntry(&'static str),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl BridgeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BridgeError::Io {
            path: path.into(),
            source,
        }
    }
}
