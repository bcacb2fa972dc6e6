use std::path::PathBuf;

/// Environment variable selecting the execution mode (`development` or anything else)
pub const MODE_ENV: &str = "RECORDS_ENV";

/// Environment variable overriding the platform resource directory
pub const RESOURCES_ENV: &str = "RECORDS_RESOURCES_PATH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExecutionMode {
    /// Running from a build directory
    Development,
    /// Running from an installed package
    Production,
}

impl ExecutionMode {
    pub fn from_env() -> Self {
        Self::from_value(std::env::var(MODE_ENV).ok().as_deref())
    }

    fn from_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("development") => ExecutionMode::Development,
            _ => ExecutionMode::Production,
        }
    }
}

/// Configuration for the file service
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub mode: ExecutionMode,

    /// Explicit storage root; skips resolution when set
    pub storage_root: Option<PathBuf>,

    /// Platform resource directory override (production mode only)
    pub resource_dir: Option<PathBuf>,

    /// Name of the writable directory created next to the resource directory
    pub resources_dir_name: String,

    /// Title shown on the directory picker
    pub picker_title: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Production,
            storage_root: None,
            resource_dir: None,
            resources_dir_name: "resources".to_string(),
            picker_title: "Select folder".to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        Self {
            mode: ExecutionMode::from_env(),
            resource_dir: std::env::var_os(RESOURCES_ENV).map(PathBuf::from),
            ..Default::default()
        }
    }
}
