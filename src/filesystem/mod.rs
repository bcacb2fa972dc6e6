//! File service for the records bridge

pub mod audit_log;
pub mod config;
pub mod error;
pub mod operations;
pub mod path_utils;
pub mod picker;
pub mod platform;
pub mod usage;


use std::path::{Path, PathBuf};
use std::sync::Arc;

use audit_log::AuditLog;
use config::BridgeConfig;
use operations::FileOperations;
use picker::DirectoryPicker;

pub struct FileSystemService {
    config: Arc<BridgeConfig>,
    storage_root: Option<PathBuf>,
    ops: FileOperations,
    audit_log: AuditLog,
    picker: DirectoryPicker,
}

impl FileSystemService {
    pub fn new(config: BridgeConfig, storage_root: Option<PathBuf>) -> Self {
        let picker = DirectoryPicker::new(config.picker_title.clone());
        Self {
            config: Arc::new(config),
            storage_root,
            ops: FileOperations::new(),
            audit_log: AuditLog::new(),
            picker,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        self.config.as_ref()
    }

    /// Root prepared at startup, if it could be resolved
    pub fn storage_root(&self) -> Option<&Path> {
        self.storage_root.as_deref()
    }

    pub fn ops(&self) -> &FileOperations {
        &self.ops
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit_log
    }

    pub fn picker(&self) -> &DirectoryPicker {
        &self.picker
    }
}
