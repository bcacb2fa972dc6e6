use tokio::fs;

use super::error::BridgeError;

/// Single-call file primitives.
///
/// Paths are used exactly as the caller supplied them; nothing is confined to
/// the storage root. Each method performs one filesystem call and no locking,
/// so concurrent writers to one path race at the filesystem layer.
#[derive(Debug, Clone, Default)]
pub struct FileOperations;

impl FileOperations {
    pub fn new() -> Self {
        Self
    }

    /// True iff the path is accessible. Errors count as absent.
    pub async fn exists(&self, path: &str) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    /// Create a directory and its parents; an existing directory is fine.
    pub async fn create_directory(&self, path: &str) -> Result<(), BridgeError> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| BridgeError::io(path, e))
    }

    /// Overwrite `path` with UTF-8 `content`. Not atomic.
    pub async fn write_text_file(&self, path: &str, content: &str) -> Result<(), BridgeError> {
        fs::write(path, content.as_bytes())
            .await
            .map_err(|e| BridgeError::io(path, e))
    }

    pub async fn read_text_file(&self, path: &str) -> Result<String, BridgeError> {
        fs::read_to_string(path)
            .await
            .map_err(|e| BridgeError::io(path, e))
    }

    pub async fn delete_file(&self, path: &str) -> Result<(), BridgeError> {
        fs::remove_file(path)
            .await
            .map_err(|e| BridgeError::io(path, e))
    }

    /// Rename or move. Whether an existing destination is replaced is up to the platform.
    pub async fn rename_file(&self, old_path: &str, new_path: &str) -> Result<(), BridgeError> {
        fs::rename(old_path, new_path)
            .await
            .map_err(|e| BridgeError::io(old_path, e))
    }

    /// Entry names of a directory, sorted bytewise.
    pub async fn list_directory(&self, path: &str) -> Result<Vec<String>, BridgeError> {
        let mut read_dir = fs::read_dir(path)
            .await
            .map_err(|e| BridgeError::io(path, e))?;

        let mut names = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| BridgeError::io(path, e))?
        {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();

        Ok(names)
    }
}
