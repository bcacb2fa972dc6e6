//! Native directory picker
//!
//! Shells out to whatever dialog tool the desktop provides. The dialog is
//! attached to the application window when the tool supports it.

use std::path::PathBuf;

use crate::lifecycle::WindowHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogTool {
    Zenity,
    Kdialog,
    Osascript,
    PowerShell,
}

impl DialogTool {
    fn binary(self) -> &'static str {
        match self {
            DialogTool::Zenity => "zenity",
            DialogTool::Kdialog => "kdialog",
            DialogTool::Osascript => "osascript",
            DialogTool::PowerShell => "powershell",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryPicker {
    title: String,
}

impl DirectoryPicker {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Prompt for a directory. `None` when the user cancels or no dialog tool exists.
    pub async fn pick(&self, parent: Option<&WindowHandle>) -> Option<PathBuf> {
        let (tool, binary) = match detect_dialog_tool() {
            Some(found) => found,
            None => {
                tracing::warn!("No directory dialog tool found");
                return None;
            }
        };

        let output = tokio::process::Command::new(&binary)
            .args(dialog_args(tool, &self.title, parent))
            .stdin(std::process::Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) => parse_dialog_output(output.status.success(), &output.stdout),
            Err(e) => {
                tracing::error!("Failed to run {}: {}", binary.display(), e);
                None
            }
        }
    }
}

fn detect_dialog_tool() -> Option<(DialogTool, PathBuf)> {
    let candidates: &[DialogTool] = if cfg!(target_os = "macos") {
        &[DialogTool::Osascript]
    } else if cfg!(windows) {
        &[DialogTool::PowerShell]
    } else {
        &[DialogTool::Zenity, DialogTool::Kdialog]
    };

    candidates
        .iter()
        .find_map(|tool| which::which(tool.binary()).ok().map(|path| (*tool, path)))
}

pub fn dialog_args(tool: DialogTool, title: &str, parent: Option<&WindowHandle>) -> Vec<String> {
    match tool {
        DialogTool::Zenity => {
            let mut args = vec![
                "--file-selection".to_string(),
                "--directory".to_string(),
                format!("--title={}", title),
            ];
            if let Some(window) = parent {
                args.push(format!("--attach={}", window.id));
            }
            args
        }
        DialogTool::Kdialog => {
            let mut args = vec![
                "--getexistingdirectory".to_string(),
                ".".to_string(),
                "--title".to_string(),
                title.to_string(),
            ];
            if let Some(window) = parent {
                args.push("--attach".to_string());
                args.push(window.id.clone());
            }
            args
        }
        // osascript and FolderBrowserDialog cannot be parented to a foreign window
        DialogTool::Osascript => vec![
            "-e".to_string(),
            format!(
                "POSIX path of (choose folder with prompt \"{}\")",
                title.replace('\\', "\\\\").replace('"', "\\\"")
            ),
        ],
        DialogTool::PowerShell => vec![
            "-NoProfile".to_string(),
            "-Command".to_string(),
            format!(
                "Add-Type -AssemblyName System.Windows.Forms; \
                 $d = New-Object System.Windows.Forms.FolderBrowserDialog; \
                 $d.Description = '{}'; $d.ShowNewFolderButton = $true; \
                 if ($d.ShowDialog() -eq 'OK') {{ $d.SelectedPath }}",
                title.replace('\'', "''")
            ),
        ],
    }
}

/// Dialog tools print the chosen path and exit 0; cancel is a non-zero exit or no output.
pub fn parse_dialog_output(success: bool, stdout: &[u8]) -> Option<PathBuf> {
    if !success {
        return None;
    }
    let chosen = String::from_utf8_lossy(stdout);
    let chosen = chosen.trim_end_matches(['\r', '\n']);
    if chosen.is_empty() {
        None
    } else {
        Some(PathBuf::from(chosen))
    }
}
