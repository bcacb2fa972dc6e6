//! Append-only JSON audit logs
//!
//! A log is one pretty-printed JSON array. Appending reads the whole array,
//! pushes a timestamped entry and writes the array back. Appends to the same
//! path are serialized within this process; other processes are not excluded.
//!
//! An unreadable or malformed log is treated as empty. The malformed bytes are
//! copied to a `.corrupt-<time>` sibling before the log is rewritten.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::Mutex;

use super::error::BridgeError;
use super::path_utils::sibling_with_suffix;

pub const TIMESTAMP_FIELD: &str = "timestamp";

#[derive(Debug, Default)]
pub struct AuditLog {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        self.locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Append `entry` to the log at `path`, stamping it with the current time.
    pub async fn append(&self, path: &str, entry: Value) -> Result<(), BridgeError> {
        let entry = stamp_entry(entry, Utc::now())?;
        let path = PathBuf::from(path);

        let lock = self.lock_for(&path);
        let result = {
            let _guard = lock.lock().await;
            write_appended(&path, entry).await
        };

        // Only the map and this call hold the lock: nobody else is waiting on it.
        self.locks.remove_if(&path, |_, held| Arc::strong_count(held) <= 2);

        result
    }
}

async fn write_appended(path: &Path, entry: Value) -> Result<(), BridgeError> {
    let mut entries = load_entries(path).await;
    entries.push(entry);

    let data = serde_json::to_string_pretty(&entries)?;
    fs::write(path, data)
        .await
        .map_err(|e| BridgeError::io(path, e))?;

    tracing::debug!("Appended entry {} to {}", entries.len(), path.display());
    Ok(())
}

/// Build the stored form of an entry: `timestamp` first, then the caller's
/// fields. A caller-supplied `timestamp` is replaced.
///
/// Only objects and `null` (stored as timestamp-only) are accepted. Strings,
/// numbers, arrays and booleans fail with [`BridgeError::InvalidEntry`] instead
/// of being object-spread the way the desktop renderer would, where a string
/// turns into index keys (`"0"`, `"1"`, ...) and other scalars vanish.
pub fn stamp_entry(entry: Value, now: DateTime<Utc>) -> Result<Value, BridgeError> {
    let fields = match entry {
        Value::Object(fields) => fields,
        Value::Null => Map::new(),
        other => return Err(BridgeError::InvalidEntry(json_type_name(&other))),
    };

    let mut stamped = Map::with_capacity(fields.len() + 1);
    stamped.insert(
        TIMESTAMP_FIELD.to_string(),
        Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    for (key, value) in fields {
        if key != TIMESTAMP_FIELD {
            stamped.insert(key, value);
        }
    }

    Ok(Value::Object(stamped))
}

async fn load_entries(path: &Path) -> Vec<Value> {
    let raw = match fs::read(path).await {
        Ok(raw) => raw,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Could not read log {}, starting fresh: {}", path.display(), e);
            }
            return Vec::new();
        }
    };

    match serde_json::from_slice::<Value>(&raw) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) | Err(_) => {
            if !raw.iter().all(u8::is_ascii_whitespace) {
                preserve_corrupt_log(path, &raw).await;
            }
            Vec::new()
        }
    }
}

async fn preserve_corrupt_log(path: &Path, raw: &[u8]) {
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%3fZ");
    let backup = sibling_with_suffix(path, &format!("corrupt-{}", stamp));
    match fs::write(&backup, raw).await {
        Ok(()) => tracing::warn!(
            "Log {} is not a JSON array; previous content copied to {}",
            path.display(),
            backup.display()
        ),
        Err(e) => tracing::warn!(
            "Log {} is not a JSON array and could not be preserved: {}",
            path.display(),
            e
        ),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
