use serde::{Deserialize, Serialize};

use super::find::FindMatches;

/// Identity of one live rendering surface.
///
/// Ids are never reused within a window, so an event or script result tagged
/// with a destroyed surface's id can always be told apart from the live one.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SurfaceId(pub u64);

/// Tag attached to every script injected into a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptRequest {
    pub surface: SurfaceId,
    pub id: u64,
}

/// Events fired by the embedded engine for one surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// Candidate favicon urls, best first.
    FaviconUpdated(Vec<String>),
    TitleUpdated(String),
    /// A new document was committed.
    Navigated(String),
    NavigatedInPage(String),
    LoadFinished,
    LoadFailed(String),
    FindResult(FindMatches),
    AudibleChanged(bool),
    MuteChanged(bool),
    /// Completion of an injected script, JSON result or failure message.
    ScriptResult {
        request: ScriptRequest,
        result: Result<serde_json::Value, String>,
    },
}
