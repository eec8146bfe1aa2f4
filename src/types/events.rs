use serde::{Deserialize, Serialize};

use super::download::DownloadUpdate;
use super::find::FindReport;
use super::tab::WebState;
use super::window::WindowStateReport;

/// Outcome of a picture-in-picture toggle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipResult {
    pub ok: bool,
    pub active: bool,
    pub message: String,
}

impl PipResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            active: false,
            message: message.into(),
        }
    }
}

/// Events the core emits towards the external state store / chrome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "camelCase")]
pub enum ShellEvent {
    WebState(WebState),
    #[serde(rename_all = "camelCase")]
    TabDiscarded { tab_id: String, discarded: bool },
    FindResult(FindReport),
    OpenUrlInNewTab { url: String, background: bool },
    OpenUrlInNewWindow { url: String },
    CopyToClipboard { text: String },
    PictureInPicture(PipResult),
    WindowState(WindowStateReport),
    DownloadUpdated(DownloadUpdate),
}
