use std::path::{Path, PathBuf};

/// Read-only resource directory of an installed package, given the executable's directory
#[cfg(target_os = "macos")]
pub fn resource_dir(exe_dir: &Path) -> PathBuf {
    // <App>.app/Contents/MacOS/<exe> -> <App>.app/Contents/Resources
    match exe_dir.parent() {
        Some(contents) if exe_dir.ends_with("MacOS") => contents.join("Resources"),
        _ => exe_dir.to_path_buf(),
    }
}

#[cfg(not(target_os = "macos"))]
pub fn resource_dir(exe_dir: &Path) -> PathBuf {
    exe_dir.to_path_buf()
}

/// macOS apps keep running after their last window closes
pub fn stays_open_without_windows() -> bool {
    cfg!(target_os = "macos")
}
