//! Chrome → core messages.
//!
//! The chrome posts JSON objects tagged with `cmd` (e.g.
//! `{"cmd":"set_hidden","hidden":true}`). [`parse_command`] turns them into a
//! typed [`ChromeCommand`]; [`dispatch_to_window`] applies the ones that act
//! on a single window and hands the rest back for the application to route.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::SurfaceFactory;
use crate::managers::window_context::WindowContext;
use crate::services::context_menu::ContextAction;
use crate::services::layout_engine::BoundsRequest;
use crate::types::errors::IpcError;
use crate::types::find::{FindOptions, StopFindAction};
use crate::types::tab::TabsSnapshot;
use crate::types::window::KeyInput;

fn default_true() -> bool {
    true
}

/// Whether `downloads_open` opens the file or reveals it in its folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    #[default]
    File,
    Folder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ChromeCommand {
    // Window-scoped
    TabsStateChanged(TabsSnapshot),
    SetContentBounds(BoundsRequest),
    SetHidden {
        #[serde(default)]
        hidden: bool,
    },
    SetTabMuted {
        #[serde(rename = "tabId")]
        tab_id: String,
        #[serde(default)]
        muted: bool,
    },
    /// Load a background tab ahead of the switch to it.
    PrewarmTab {
        #[serde(rename = "tabId")]
        tab_id: String,
    },
    Back,
    Forward,
    Reload,
    FocusActiveWebview,
    FindInPage {
        #[serde(default)]
        query: String,
        #[serde(default, rename = "findNext")]
        find_next: bool,
        #[serde(default = "default_true")]
        forward: bool,
    },
    StopFind {
        #[serde(default)]
        action: Option<String>,
    },
    TogglePip,
    ContextAction {
        #[serde(rename = "tabId")]
        tab_id: String,
        action: ContextAction,
    },

    // Application-scoped
    DownloadsOpen {
        #[serde(default)]
        id: String,
        #[serde(default)]
        mode: OpenMode,
        #[serde(default, rename = "savePath")]
        save_path: String,
        #[serde(default)]
        filename: String,
    },
    DownloadsControl {
        #[serde(default)]
        id: String,
        #[serde(default)]
        action: String,
    },
    GetSettings,
    SetSetting {
        key: String,
        value: Value,
    },
    ResetSettings,
    BookmarkAdd {
        url: String,
        title: String,
        #[serde(default)]
        folder_id: Option<String>,
    },
    BookmarkRemove {
        id: String,
    },
    BookmarkMove {
        id: String,
        #[serde(default)]
        folder_id: Option<String>,
    },
    BookmarkList {
        #[serde(default)]
        folder_id: Option<String>,
    },
    FolderCreate {
        name: String,
        #[serde(default)]
        parent_id: Option<String>,
    },
    FolderMove {
        id: String,
        #[serde(default)]
        parent_id: Option<String>,
    },
    FolderDelete {
        id: String,
    },

    // Host window controls
    WindowNew,
    WindowMinimize,
    WindowMaximizeToggle,
    WindowClose,
    WindowAlwaysOnTopToggle,
    WindowGetState,
    /// Key press seen by the chrome; Alt+1/2/3 resize the window.
    KeyInput(KeyInput),
}

/// Decodes one chrome message.
pub fn parse_command(message: &str) -> Result<ChromeCommand, IpcError> {
    let value: Value =
        serde_json::from_str(message).map_err(|e| IpcError::Malformed(e.to_string()))?;
    let cmd = value
        .get("cmd")
        .and_then(Value::as_str)
        .ok_or_else(|| IpcError::Malformed("missing cmd".to_string()))?
        .to_string();
    serde_json::from_value(value).map_err(|e| {
        if e.to_string().starts_with("unknown variant") {
            IpcError::UnknownCommand(cmd)
        } else {
            IpcError::Malformed(e.to_string())
        }
    })
}

/// `"activate"` activates the current match; anything else clears it.
pub fn stop_find_action(action: Option<&str>) -> StopFindAction {
    match action {
        Some("activate") => StopFindAction::ActivateSelection,
        _ => StopFindAction::ClearSelection,
    }
}

/// Applies a window-scoped command. Returns the command back when it must
/// be handled by the application or the host instead.
pub fn dispatch_to_window<F: SurfaceFactory>(
    ctx: &mut WindowContext<F>,
    command: ChromeCommand,
    now: Instant,
) -> Option<ChromeCommand> {
    match command {
        ChromeCommand::TabsStateChanged(snapshot) => ctx.apply_snapshot(snapshot, now),
        ChromeCommand::SetContentBounds(bounds) => ctx.set_content_bounds(bounds),
        ChromeCommand::SetHidden { hidden } => ctx.set_web_layer_hidden(hidden),
        ChromeCommand::SetTabMuted { tab_id, muted } => {
            if !tab_id.is_empty() {
                ctx.set_tab_muted(&tab_id, muted);
            }
        }
        ChromeCommand::PrewarmTab { tab_id } => {
            ctx.prewarm(&tab_id, now);
        }
        ChromeCommand::Back => ctx.go_back(),
        ChromeCommand::Forward => ctx.go_forward(),
        ChromeCommand::Reload => ctx.reload(),
        ChromeCommand::FocusActiveWebview => ctx.focus_active(),
        ChromeCommand::FindInPage {
            query,
            find_next,
            forward,
        } => ctx.find_in_page(&query, FindOptions { find_next, forward }),
        ChromeCommand::StopFind { action } => ctx.stop_find(stop_find_action(action.as_deref())),
        ChromeCommand::TogglePip => {
            ctx.toggle_picture_in_picture();
        }
        ChromeCommand::ContextAction { tab_id, action } => ctx.run_context_action(&tab_id, action),
        other => return Some(other),
    }
    None
}
