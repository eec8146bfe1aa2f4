use serde::{Deserialize, Serialize};

/// Status of a tracked download, as shown in the downloads panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DownloadStatus {
    Progressing,
    Paused,
    Interrupted,
    Completed,
    Cancelled,
}

/// How the engine reported a finished download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DownloadDoneState {
    Completed,
    Cancelled,
    Interrupted,
}

/// Commands the chrome may issue against a running download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DownloadAction {
    Pause,
    Resume,
    Cancel,
}

/// Metadata known when the engine starts a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadStart {
    pub url: String,
    pub filename: String,
    pub save_path: String,
    pub total_bytes: u64,
}

/// Progress payload pushed to the chrome on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUpdate {
    pub id: String,
    pub filename: String,
    pub url: String,
    pub save_path: String,
    pub received_bytes: u64,
    pub total_bytes: u64,
    pub status: DownloadStatus,
    pub started_at: i64,
    pub updated_at: i64,
}
