use serde::{Deserialize, Serialize};

/// A logical tab as delivered by the external state store.
///
/// The core only ever reads these; surface-observed facts flow back out
/// through [`WebState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSnapshot {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub favicon: String,
    #[serde(default)]
    pub is_muted: bool,
    #[serde(default)]
    pub is_discarded: bool,
}

impl TabSnapshot {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            title: String::new(),
            favicon: String::new(),
            is_muted: false,
            is_discarded: false,
        }
    }

    pub fn muted(mut self, muted: bool) -> Self {
        self.is_muted = muted;
        self
    }
}

/// Point-in-time copy of the full tab list plus the active tab id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabsSnapshot {
    #[serde(default)]
    pub tabs: Vec<TabSnapshot>,
    #[serde(default)]
    pub active_tab_id: Option<String>,
}

impl TabsSnapshot {
    pub fn new(tabs: Vec<TabSnapshot>, active_tab_id: Option<&str>) -> Self {
        Self {
            tabs,
            active_tab_id: active_tab_id.map(str::to_string),
        }
    }
}

/// Consolidated surface state re-emitted to the store after every engine event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebState {
    pub tab_id: String,
    pub url: String,
    pub title: String,
    pub favicon: String,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub is_muted: bool,
}

/// Title reported when the engine has none yet.
pub const DEFAULT_TAB_TITLE: &str = "New Tab";
