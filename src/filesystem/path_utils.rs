use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::config::{BridgeConfig, ExecutionMode};
use super::platform;

/// Resolve the storage root for the configured execution mode.
///
/// The root is the writable `resources` directory that sits next to the base
/// directory: the executable's directory in development, the platform resource
/// directory in production.
pub fn resolve_storage_root(config: &BridgeConfig) -> std::io::Result<PathBuf> {
    if let Some(root) = &config.storage_root {
        return Ok(root.clone());
    }

    let exe = std::env::current_exe()?;
    let exe_dir = exe.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "executable has no parent directory",
        )
    })?;

    let base = match config.mode {
        ExecutionMode::Development => exe_dir.to_path_buf(),
        ExecutionMode::Production => config
            .resource_dir
            .clone()
            .unwrap_or_else(|| platform::resource_dir(exe_dir)),
    };

    Ok(storage_root_from_base(&base, &config.resources_dir_name))
}

/// `<base>/../<name>`
pub fn storage_root_from_base(base: &Path, name: &str) -> PathBuf {
    base.parent().unwrap_or(base).join(name)
}

/// Create the storage root (and parents) if missing. Failures are logged, not returned.
pub async fn ensure_storage_root(path: &Path) -> bool {
    match tokio::fs::create_dir_all(path).await {
        Ok(()) => {
            tracing::info!("Storage root ensured at: {}", path.display());
            true
        }
        Err(e) => {
            tracing::error!("Failed to prepare storage root {}: {}", path.display(), e);
            false
        }
    }
}

/// Resolve and prepare the storage root once at startup.
///
/// Returns the resolved path even when it could not be created; operations
/// against it will report their own errors.
pub async fn prepare_storage_root(config: &BridgeConfig) -> Option<PathBuf> {
    match resolve_storage_root(config) {
        Ok(root) => {
            ensure_storage_root(&root).await;
            Some(root)
        }
        Err(e) => {
            tracing::error!("Failed to resolve storage root: {}", e);
            None
        }
    }
}

/// `<dir>/<file name>.<suffix>`
pub fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut file_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| OsString::from("file"));
    file_name.push(".");
    file_name.push(suffix);
    path.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn storage_root_is_sibling_of_base() {
        let root = storage_root_from_base(Path::new("/opt/records/app"), "resources");
        assert_eq!(root, PathBuf::from("/opt/records/resources"));
    }

    #[test]
    fn explicit_storage_root_wins() {
        let config = BridgeConfig {
            storage_root: Some(PathBuf::from("/srv/records")),
            ..Default::default()
        };
        assert_eq!(
            resolve_storage_root(&config).unwrap(),
            PathBuf::from("/srv/records")
        );
    }

    #[test]
    fn production_uses_resource_dir_override() {
        let config = BridgeConfig {
            mode: ExecutionMode::Production,
            resource_dir: Some(PathBuf::from("/opt/records/app/res")),
            ..Default::default()
        };
        assert_eq!(
            resolve_storage_root(&config).unwrap(),
            PathBuf::from("/opt/records/app/resources")
        );
    }

    #[test]
    fn development_resolves_next_to_executable() {
        let config = BridgeConfig {
            mode: ExecutionMode::Development,
            ..Default::default()
        };
        let exe = std::env::current_exe().unwrap();
        let exe_dir = exe.parent().unwrap();
        assert_eq!(
            resolve_storage_root(&config).unwrap(),
            storage_root_from_base(exe_dir, "resources")
        );
    }

    #[tokio::test]
    async fn ensure_creates_nested_root_and_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("a").join("resources");
        assert!(ensure_storage_root(&root).await);
        assert!(root.is_dir());
        assert!(ensure_storage_root(&root).await);
    }

    #[tokio::test]
    async fn ensure_failure_is_not_fatal() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "file").unwrap();
        assert!(!ensure_storage_root(&blocker.join("resources")).await);
    }

    #[test]
    fn sibling_suffix_keeps_directory() {
        let path = sibling_with_suffix(Path::new("/logs/audit.json"), "corrupt-1");
        assert_eq!(path, PathBuf::from("/logs/audit.json.corrupt-1"));
    }
}
