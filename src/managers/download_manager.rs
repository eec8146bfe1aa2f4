//! Download Manager for Tabshell.
//!
//! Tracks downloads started by the engine, keyed by a generated id, and
//! produces the progress payloads pushed to the chrome. Control commands go
//! to the engine's handle for the download until it finishes; after that the
//! handle is released and only the metadata (for opening the file) remains.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;
use uuid::Uuid;

use crate::types::download::{
    DownloadAction, DownloadDoneState, DownloadStart, DownloadStatus, DownloadUpdate,
};
use crate::types::errors::DownloadError;
use crate::types::window::WindowId;

/// Engine-side control over one running download. Engines that cannot
/// perform an action return [`DownloadError::Refused`].
pub trait DownloadHandle {
    fn is_paused(&self) -> bool;
    fn pause(&mut self) -> Result<(), DownloadError>;
    fn resume(&mut self) -> Result<(), DownloadError>;
    fn cancel(&mut self) -> Result<(), DownloadError>;
}

/// Trait defining download tracking operations.
pub trait DownloadTrackerTrait<H: DownloadHandle> {
    fn start(&mut self, handle: H, start: DownloadStart, source: Option<WindowId>)
        -> DownloadUpdate;
    fn update(
        &mut self,
        id: &str,
        received_bytes: u64,
        total_bytes: u64,
        interrupted: bool,
    ) -> Result<DownloadUpdate, DownloadError>;
    fn finish(
        &mut self,
        id: &str,
        state: DownloadDoneState,
        received_bytes: u64,
        total_bytes: u64,
    ) -> Result<DownloadUpdate, DownloadError>;
    fn control(&mut self, id: &str, action: &str) -> Result<(), DownloadError>;
    fn resolve_open_target(
        &self,
        id: &str,
        save_path_hint: &str,
        filename_hint: &str,
        downloads_dir: &Path,
    ) -> Option<PathBuf>;
    fn get_download(&self, id: &str) -> Option<&DownloadUpdate>;
    fn source_window(&self, id: &str) -> Option<WindowId>;
}

struct DownloadRecord<H> {
    latest: DownloadUpdate,
    source: Option<WindowId>,
    handle: Option<H>,
}

/// In-memory download registry owned by the application.
pub struct DownloadTracker<H> {
    downloads: HashMap<String, DownloadRecord<H>>,
}

impl<H: DownloadHandle> DownloadTracker<H> {
    pub fn new() -> Self {
        Self {
            downloads: HashMap::new(),
        }
    }

    fn now_ms() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    fn record_mut(&mut self, id: &str) -> Result<&mut DownloadRecord<H>, DownloadError> {
        self.downloads
            .get_mut(id)
            .ok_or_else(|| DownloadError::NotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.downloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.downloads.is_empty()
    }

    /// Id of the unfinished download writing to `save_path`. Without a path
    /// the earliest unfinished download of `url` is picked.
    pub fn running_download(&self, save_path: Option<&str>, url: &str) -> Option<String> {
        let running = self.downloads.values().filter(|r| r.handle.is_some());
        match save_path {
            Some(path) => running
                .filter(|r| r.latest.save_path == path)
                .map(|r| r.latest.id.clone())
                .next(),
            None => running
                .filter(|r| r.latest.url == url)
                .min_by_key(|r| r.latest.started_at)
                .map(|r| r.latest.id.clone()),
        }
    }
}

/// `filename` inside `dir`, numbered `name (1).ext`, `name (2).ext` and so
/// on while `taken` reports the candidate in use.
pub fn unique_save_path(dir: &Path, filename: &str, taken: impl Fn(&Path) -> bool) -> PathBuf {
    let first = dir.join(filename);
    if !taken(&first) {
        return first;
    }
    let name = Path::new(filename);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    let extension = name.extension().map(|e| e.to_string_lossy().into_owned());
    (1u32..)
        .map(|n| match &extension {
            Some(ext) => dir.join(format!("{stem} ({n}).{ext}")),
            None => dir.join(format!("{stem} ({n})")),
        })
        .find(|candidate| !taken(candidate))
        .unwrap_or(first)
}

impl<H: DownloadHandle> Default for DownloadTracker<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: DownloadHandle> DownloadTrackerTrait<H> for DownloadTracker<H> {
    fn start(
        &mut self,
        handle: H,
        start: DownloadStart,
        source: Option<WindowId>,
    ) -> DownloadUpdate {
        let now = Self::now_ms();
        let update = DownloadUpdate {
            id: Uuid::new_v4().to_string(),
            filename: start.filename,
            url: start.url,
            save_path: start.save_path,
            received_bytes: 0,
            total_bytes: start.total_bytes,
            status: DownloadStatus::Progressing,
            started_at: now,
            updated_at: now,
        };
        debug!(id = %update.id, filename = %update.filename, "Download started");
        self.downloads.insert(
            update.id.clone(),
            DownloadRecord {
                latest: update.clone(),
                source,
                handle: Some(handle),
            },
        );
        update
    }

    /// Progress report. A paused handle wins over the engine's state.
    fn update(
        &mut self,
        id: &str,
        received_bytes: u64,
        total_bytes: u64,
        interrupted: bool,
    ) -> Result<DownloadUpdate, DownloadError> {
        let now = Self::now_ms();
        let record = self.record_mut(id)?;
        let Some(handle) = record.handle.as_ref() else {
            return Err(DownloadError::AlreadyFinished(id.to_string()));
        };
        let status = if handle.is_paused() {
            DownloadStatus::Paused
        } else if interrupted {
            DownloadStatus::Interrupted
        } else {
            DownloadStatus::Progressing
        };
        record.latest = DownloadUpdate {
            received_bytes,
            total_bytes,
            status,
            updated_at: now,
            ..record.latest.clone()
        };
        Ok(record.latest.clone())
    }

    /// Terminal report; the engine handle is released.
    fn finish(
        &mut self,
        id: &str,
        state: DownloadDoneState,
        received_bytes: u64,
        total_bytes: u64,
    ) -> Result<DownloadUpdate, DownloadError> {
        let now = Self::now_ms();
        let record = self.record_mut(id)?;
        if record.handle.take().is_none() {
            return Err(DownloadError::AlreadyFinished(id.to_string()));
        }
        let status = match state {
            DownloadDoneState::Completed => DownloadStatus::Completed,
            DownloadDoneState::Cancelled => DownloadStatus::Cancelled,
            DownloadDoneState::Interrupted => DownloadStatus::Interrupted,
        };
        record.latest = DownloadUpdate {
            received_bytes,
            total_bytes,
            status,
            updated_at: now,
            ..record.latest.clone()
        };
        debug!(id, ?status, "Download finished");
        Ok(record.latest.clone())
    }

    /// `action` is `pause`, `resume` or `cancel`. Pause and resume are
    /// no-ops when the download is already in that state; an engine refusal
    /// is returned as is.
    fn control(&mut self, id: &str, action: &str) -> Result<(), DownloadError> {
        let record = self.record_mut(id)?;
        let Some(handle) = record.handle.as_mut() else {
            return Err(DownloadError::AlreadyFinished(id.to_string()));
        };
        let action: DownloadAction = serde_json::from_value(serde_json::json!(action))
            .map_err(|_| DownloadError::UnsupportedAction(action.to_string()))?;
        match action {
            DownloadAction::Pause if !handle.is_paused() => handle.pause(),
            DownloadAction::Resume if handle.is_paused() => handle.resume(),
            DownloadAction::Pause | DownloadAction::Resume => Ok(()),
            DownloadAction::Cancel => handle.cancel(),
        }
    }

    /// Where to open a download: the tracked save path, then the caller's
    /// hint, then `downloads_dir/filename_hint`.
    fn resolve_open_target(
        &self,
        id: &str,
        save_path_hint: &str,
        filename_hint: &str,
        downloads_dir: &Path,
    ) -> Option<PathBuf> {
        let tracked = self
            .downloads
            .get(id)
            .map(|r| r.latest.save_path.as_str())
            .filter(|p| !p.is_empty());
        if let Some(path) = tracked {
            return Some(PathBuf::from(path));
        }
        if !save_path_hint.is_empty() {
            return Some(PathBuf::from(save_path_hint));
        }
        if !filename_hint.is_empty() {
            return Some(downloads_dir.join(filename_hint));
        }
        None
    }

    fn get_download(&self, id: &str) -> Option<&DownloadUpdate> {
        self.downloads.get(id).map(|r| &r.latest)
    }

    fn source_window(&self, id: &str) -> Option<WindowId> {
        self.downloads.get(id).and_then(|r| r.source)
    }
}
