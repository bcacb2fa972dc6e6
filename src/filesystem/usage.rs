//! Folder size and volume usage

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::protocol::FolderUsageReport;

use super::error::BridgeError;

const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeCapacity {
    pub total: u64,
    pub available: u64,
}

/// Usage report for `path` against the capacity of its volume.
///
/// An absent or empty path, or any failure while walking or querying the
/// volume, yields [`FolderUsageReport::empty`].
pub async fn folder_info(path: Option<&str>) -> FolderUsageReport {
    let path = match path {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => return FolderUsageReport::empty(),
    };

    let result = tokio::task::spawn_blocking(move || -> Result<(u64, VolumeCapacity), BridgeError> {
        let used = calculate_folder_size(&path)?;
        let capacity = volume_capacity(&path)?;
        Ok((used, capacity))
    })
    .await
    .map_err(BridgeError::from)
    .and_then(|inner| inner);

    match result {
        Ok((used, capacity)) => {
            tracing::debug!(
                "Folder uses {} bytes; volume has {} of {} bytes available",
                used,
                capacity.available,
                capacity.total
            );
            usage_report(used, capacity.total)
        }
        Err(e) => {
            tracing::error!("Failed to calculate folder info: {}", e);
            FolderUsageReport::empty()
        }
    }
}

pub fn usage_report(used: u64, total: u64) -> FolderUsageReport {
    FolderUsageReport {
        used_space: format_bytes(used),
        total_space: format_bytes(total),
        percentage: usage_percentage(used, total),
    }
}

/// Total size in bytes of every non-directory entry below `root`.
///
/// Symlinks are followed. An entry that links back to one of its own
/// ancestors is skipped, so cyclic trees terminate.
pub fn calculate_folder_size(root: &Path) -> Result<u64, BridgeError> {
    let mut total = 0u64;

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.loop_ancestor().is_some() => {
                tracing::warn!(
                    "Skipping symlink cycle at {}",
                    e.path().map(|p| p.display().to_string()).unwrap_or_default()
                );
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if entry.file_type().is_dir() {
            continue;
        }
        total = total.saturating_add(entry.metadata()?.len());
    }

    Ok(total)
}

pub fn volume_capacity(path: &Path) -> Result<VolumeCapacity, BridgeError> {
    let total = fs2::total_space(path).map_err(|e| BridgeError::io(path, e))?;
    let available = fs2::available_space(path).map_err(|e| BridgeError::io(path, e))?;
    Ok(VolumeCapacity { total, available })
}

/// `used / total` as a percentage in `[0, 100]`, rounded to 2 decimals. 0 when `total` is 0.
pub fn usage_percentage(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percentage = (used as f64 / total as f64 * 100.0).clamp(0.0, 100.0);
    round2(percentage)
}

/// Human-readable size on a base-1024 ladder, e.g. `1.5 KB`, `0 Bytes`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let mut rounded = round2(value);
    // 1023.999 KB must not print as 1024 KB
    if rounded >= 1024.0 && unit < UNITS.len() - 1 {
        unit += 1;
        rounded = round2(value / 1024.0);
    }

    format!("{} {}", rounded, UNITS[unit])
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
