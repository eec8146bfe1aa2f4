//! Context menu model for page right-clicks.
//!
//! Builds the ordered item list; dispatching a chosen [`ContextAction`] is
//! done by the window context, which owns the surfaces.

use serde::{Deserialize, Serialize};

/// Characters of selected text shown in the search item label.
pub const SELECTION_PREVIEW_CHARS: usize = 36;

/// What the engine reports about the right-click target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMenuParams {
    #[serde(default)]
    pub link_url: String,
    #[serde(default)]
    pub selection_text: String,
    #[serde(default)]
    pub is_editable: bool,
    #[serde(default)]
    pub can_go_back: bool,
    #[serde(default)]
    pub can_go_forward: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ContextAction {
    OpenLinkInNewTab(String),
    OpenLinkInNewWindow(String),
    CopyLink(String),
    SearchSelection(String),
    Copy,
    Paste,
    Back,
    Forward,
    Reload,
    Inspect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MenuItem {
    Action {
        label: String,
        action: ContextAction,
        enabled: bool,
    },
    Separator,
}

impl MenuItem {
    fn action(label: impl Into<String>, action: ContextAction) -> Self {
        MenuItem::Action {
            label: label.into(),
            action,
            enabled: true,
        }
    }

    fn toggled(label: impl Into<String>, action: ContextAction, enabled: bool) -> Self {
        MenuItem::Action {
            label: label.into(),
            action,
            enabled,
        }
    }
}

/// `text` cut to [`SELECTION_PREVIEW_CHARS`] characters plus `...` when longer.
pub fn selection_preview(text: &str) -> String {
    if text.chars().count() > SELECTION_PREVIEW_CHARS {
        let head: String = text.chars().take(SELECTION_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Builds the menu: link actions, selection search, clipboard, then
/// navigation and inspect. Never ends with a separator.
pub fn build_context_menu(params: &ContextMenuParams) -> Vec<MenuItem> {
    let link = params.link_url.trim();
    let selection = params.selection_text.trim();
    let has_selection = !selection.is_empty();
    let mut items = Vec::new();

    if !link.is_empty() {
        items.push(MenuItem::action(
            "Open Link in New Tab",
            ContextAction::OpenLinkInNewTab(link.to_string()),
        ));
        items.push(MenuItem::action(
            "Open Link in New Window",
            ContextAction::OpenLinkInNewWindow(link.to_string()),
        ));
        items.push(MenuItem::action(
            "Copy Link Address",
            ContextAction::CopyLink(link.to_string()),
        ));
        items.push(MenuItem::Separator);
    }

    if has_selection {
        items.push(MenuItem::action(
            format!("Search selected text: \"{}\"", selection_preview(selection)),
            ContextAction::SearchSelection(selection.to_string()),
        ));
        items.push(MenuItem::Separator);
    }

    if has_selection || params.is_editable {
        items.push(MenuItem::toggled("Copy", ContextAction::Copy, has_selection));
        items.push(MenuItem::toggled("Paste", ContextAction::Paste, params.is_editable));
        items.push(MenuItem::Separator);
    }

    items.push(MenuItem::toggled("Back", ContextAction::Back, params.can_go_back));
    items.push(MenuItem::toggled(
        "Forward",
        ContextAction::Forward,
        params.can_go_forward,
    ));
    items.push(MenuItem::action("Reload", ContextAction::Reload));
    items.push(MenuItem::Separator);
    items.push(MenuItem::action("Inspect Element", ContextAction::Inspect));

    while matches!(items.last(), Some(MenuItem::Separator)) {
        items.pop();
    }
    items
}
