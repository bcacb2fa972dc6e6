//! Application lifecycle
//!
//! Owns the (at most one) application window handle. The host reports window
//! events over the protocol and the bridge decides what should happen next.

use crate::filesystem::platform;
use crate::protocol::LifecycleAction;

/// Native handle of the application window, used to anchor dialogs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowHandle {
    /// Platform window id (X11 window id, HWND, NSWindow number) as sent by the host
    pub id: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    WindowOpened(WindowHandle),
    WindowClosed,
    Activate,
    AllWindowsClosed,
}

#[derive(Debug)]
pub struct AppLifecycle {
    window: Option<WindowHandle>,
    stay_without_windows: bool,
}

impl Default for AppLifecycle {
    fn default() -> Self {
        Self::new(platform::stays_open_without_windows())
    }
}

impl AppLifecycle {
    pub fn new(stay_without_windows: bool) -> Self {
        Self {
            window: None,
            stay_without_windows,
        }
    }

    pub fn window(&self) -> Option<&WindowHandle> {
        self.window.as_ref()
    }

    pub fn handle(&mut self, event: LifecycleEvent) -> LifecycleAction {
        match event {
            LifecycleEvent::WindowOpened(handle) => {
                tracing::debug!(
                    "Window opened: {} ({})",
                    handle.id,
                    handle.title.as_deref().unwrap_or("untitled")
                );
                self.window = Some(handle);
                LifecycleAction::None
            }
            LifecycleEvent::WindowClosed => {
                self.window = None;
                LifecycleAction::None
            }
            LifecycleEvent::Activate => {
                if self.window.is_none() {
                    LifecycleAction::CreateWindow
                } else {
                    LifecycleAction::None
                }
            }
            LifecycleEvent::AllWindowsClosed => {
                self.window = None;
                if self.stay_without_windows {
                    LifecycleAction::Stay
                } else {
                    LifecycleAction::Quit
                }
            }
        }
    }
}
