use serde::{Deserialize, Serialize};

/// Options for an in-page find request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindOptions {
    pub find_next: bool,
    pub forward: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            find_next: false,
            forward: true,
        }
    }
}

/// What to do with the current match when find is stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopFindAction {
    ClearSelection,
    ActivateSelection,
}

/// Match counts reported by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindMatches {
    pub matches: u32,
    pub active_match_ordinal: u32,
    pub final_update: bool,
}

/// Per-window find state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindState {
    pub query: String,
    #[serde(flatten)]
    pub result: FindMatches,
}

impl Default for FindState {
    fn default() -> Self {
        Self {
            query: String::new(),
            result: FindMatches {
                matches: 0,
                active_match_ordinal: 0,
                final_update: true,
            },
        }
    }
}

impl FindState {
    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }
}

/// Find result as re-emitted to the chrome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindReport {
    pub tab_id: Option<String>,
    pub query: String,
    #[serde(flatten)]
    pub result: FindMatches,
}
