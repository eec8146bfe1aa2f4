//! App Core for Tabshell.
//!
//! The process-wide orchestrator. It owns every window context, the
//! download tracker, settings, the placement store and the bookmark database;
//! nothing in the crate keeps global state. Hosts feed it chrome messages,
//! engine events and clock ticks, and drain the resulting events per window.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::database::connection::Database;
use crate::engine::SurfaceFactory;
use crate::ipc::{self, ChromeCommand, OpenMode};
use crate::managers::bookmark_manager::{BookmarkManager, BookmarkManagerTrait};
use crate::managers::download_manager::{DownloadHandle, DownloadTracker, DownloadTrackerTrait};
use crate::managers::window_context::WindowContext;
use crate::platform;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::services::window_presentation::{
    normalize_placement, preset_from_input, PlacementStore, SizePreset,
};
use crate::types::download::{DownloadDoneState, DownloadStart, DownloadUpdate};
use crate::types::errors::IpcError;
use crate::types::events::ShellEvent;
use crate::types::geometry::Size;
use crate::types::settings::ShellSettings;
use crate::types::surface::{SurfaceEvent, SurfaceId};
use crate::types::window::{DisplayInfo, KeyInput, WindowId, WindowPlacement};

/// Window controls only the host can perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRequest {
    NewWindow,
    Minimize,
    ToggleMaximize,
    Close,
    ToggleAlwaysOnTop,
    GetWindowState,
    ApplySizePreset(SizePreset),
    /// Open a finished download, or reveal it in its folder.
    OpenPath { path: PathBuf, reveal: bool },
}

/// What the caller should do after a chrome message was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    None,
    /// Value to resolve the chrome's request with.
    Value(Value),
    Host(HostRequest),
}

/// Paths the application persists to.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub settings: PathBuf,
    pub window_state: PathBuf,
    pub bookmarks_db: PathBuf,
    pub downloads_dir: PathBuf,
}

impl AppPaths {
    /// Platform default locations.
    pub fn platform() -> Self {
        Self {
            settings: platform::get_config_dir().join(crate::services::settings_engine::SETTINGS_FILE),
            window_state: platform::window_state_path(),
            bookmarks_db: platform::get_data_dir().join("bookmarks.db"),
            downloads_dir: platform::get_downloads_dir(),
        }
    }

    /// Everything under one directory; used by tests and the console mode.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            settings: dir.join("settings.json"),
            window_state: dir.join(platform::WINDOW_STATE_FILE),
            bookmarks_db: dir.join("bookmarks.db"),
            downloads_dir: dir.join("Downloads"),
        }
    }
}

pub struct App<F: SurfaceFactory, H: DownloadHandle> {
    pub db: Database,
    pub settings_engine: SettingsEngine,
    pub placement: PlacementStore,
    pub downloads: DownloadTracker<H>,
    downloads_dir: PathBuf,
    windows: HashMap<WindowId, WindowContext<F>>,
    next_window_id: u64,
}

impl<F: SurfaceFactory, H: DownloadHandle> App<F, H> {
    /// Loads settings (defaults on failure) and opens the bookmark database.
    pub fn new(paths: AppPaths) -> Result<Self, rusqlite::Error> {
        if let Some(parent) = paths.bookmarks_db.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Cannot create data directory: {}", e);
            }
        }
        let db = Database::open(&paths.bookmarks_db)?;
        let mut settings_engine = SettingsEngine::new(Some(paths.settings));
        settings_engine.load_or_default();

        Ok(Self {
            db,
            settings_engine,
            placement: PlacementStore::new(paths.window_state),
            downloads: DownloadTracker::new(),
            downloads_dir: paths.downloads_dir,
            windows: HashMap::new(),
            next_window_id: 1,
        })
    }

    pub fn downloads_dir(&self) -> &std::path::Path {
        &self.downloads_dir
    }

    pub fn settings(&self) -> &ShellSettings {
        self.settings_engine.get_settings()
    }

    // === Windows ===

    /// Persisted placement fitted onto `displays`.
    pub fn restore_placement(&self, displays: &[DisplayInfo]) -> WindowPlacement {
        let window = &self.settings().window;
        normalize_placement(
            &self.placement.read(),
            displays,
            Size::new(window.min_width, window.min_height),
        )
    }

    /// Creates the context for a new window whose content box is `size`.
    pub fn open_window(&mut self, factory: F, size: Size) -> WindowId {
        self.open_window_with(|_| factory, size)
    }

    /// Like [`open_window`](Self::open_window), for factories that need to
    /// know the id of the window they serve.
    pub fn open_window_with(&mut self, make_factory: impl FnOnce(WindowId) -> F, size: Size) -> WindowId {
        let id = WindowId(self.next_window_id);
        self.next_window_id += 1;
        let factory = make_factory(id);
        let ctx = WindowContext::new(id, factory, self.settings_engine.get_settings(), size);
        self.windows.insert(id, ctx);
        info!(window = id.0, "Window opened");
        id
    }

    /// Window closed: destroys its surfaces and timers and drops the context.
    pub fn close_window(&mut self, id: WindowId) {
        if let Some(mut ctx) = self.windows.remove(&id) {
            ctx.close();
        }
    }

    pub fn window(&self, id: WindowId) -> Option<&WindowContext<F>> {
        self.windows.get(&id)
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut WindowContext<F>> {
        self.windows.get_mut(&id)
    }

    pub fn window_ids(&self) -> Vec<WindowId> {
        let mut ids: Vec<WindowId> = self.windows.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Persists the placement of a window (resize, move, maximize, close).
    pub fn save_placement(&self, placement: &WindowPlacement) {
        self.placement.persist(placement);
    }

    // === Event loop hooks ===

    /// Earliest discard deadline across all windows.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.windows.values().filter_map(|w| w.next_deadline()).min()
    }

    pub fn tick(&mut self, now: Instant) {
        for ctx in self.windows.values_mut() {
            ctx.tick(now);
        }
    }

    /// Routes an engine event to the owning window. Events for closed
    /// windows are dropped.
    pub fn handle_surface_event(
        &mut self,
        window: WindowId,
        tab_id: &str,
        surface_id: SurfaceId,
        event: SurfaceEvent,
        now: Instant,
    ) {
        match self.windows.get_mut(&window) {
            Some(ctx) => ctx.handle_surface_event(tab_id, surface_id, event, now),
            None => debug!(window = window.0, tab_id, "Dropping event for closed window"),
        }
    }

    pub fn drain_events(&mut self, window: WindowId) -> Vec<ShellEvent> {
        self.windows
            .get_mut(&window)
            .map(WindowContext::drain_events)
            .unwrap_or_default()
    }

    // === Chrome messages ===

    /// Decodes and applies one chrome message from `window`.
    pub fn handle_message(
        &mut self,
        window: WindowId,
        message: &str,
        now: Instant,
    ) -> Result<Reply, IpcError> {
        let command = ipc::parse_command(message)?;
        let command = match self.windows.get_mut(&window) {
            Some(ctx) => match ipc::dispatch_to_window(ctx, command, now) {
                Some(rest) => rest,
                None => return Ok(Reply::None),
            },
            None => command,
        };
        Ok(self.handle_app_command(command))
    }

    fn handle_app_command(&mut self, command: ChromeCommand) -> Reply {
        match command {
            ChromeCommand::DownloadsOpen {
                id,
                mode,
                save_path,
                filename,
            } => match self.downloads.resolve_open_target(
                &id,
                &save_path,
                &filename,
                &self.downloads_dir,
            ) {
                Some(path) => Reply::Host(HostRequest::OpenPath {
                    path,
                    reveal: mode == OpenMode::Folder,
                }),
                None => Reply::Value(json!(false)),
            },
            ChromeCommand::DownloadsControl { id, action } => {
                match self.downloads.control(&id, &action) {
                    Ok(()) => Reply::Value(json!({ "ok": true })),
                    Err(e) => Reply::Value(json!({ "ok": false, "message": e.to_string() })),
                }
            }
            ChromeCommand::GetSettings => Reply::Value(
                serde_json::to_value(self.settings_engine.get_settings()).unwrap_or(Value::Null),
            ),
            ChromeCommand::SetSetting { key, value } => {
                settings_reply(self.settings_engine.set_value(&key, value))
            }
            ChromeCommand::ResetSettings => settings_reply(self.settings_engine.reset()),
            ChromeCommand::WindowNew => Reply::Host(HostRequest::NewWindow),
            ChromeCommand::WindowMinimize => Reply::Host(HostRequest::Minimize),
            ChromeCommand::WindowMaximizeToggle => Reply::Host(HostRequest::ToggleMaximize),
            ChromeCommand::WindowClose => Reply::Host(HostRequest::Close),
            ChromeCommand::WindowAlwaysOnTopToggle => Reply::Host(HostRequest::ToggleAlwaysOnTop),
            ChromeCommand::WindowGetState => Reply::Host(HostRequest::GetWindowState),
            ChromeCommand::KeyInput(input) => match key_request(&input) {
                Some(request) => Reply::Host(request),
                None => Reply::None,
            },
            bookmark_command => self.handle_bookmark_command(bookmark_command),
        }
    }

    fn handle_bookmark_command(&mut self, command: ChromeCommand) -> Reply {
        let mut mgr = BookmarkManager::new(self.db.connection());
        let result = match command {
            ChromeCommand::BookmarkAdd {
                url,
                title,
                folder_id,
            } => mgr
                .add_bookmark(&url, &title, folder_id.as_deref())
                .map(|id| json!({ "id": id })),
            ChromeCommand::BookmarkRemove { id } => mgr.remove_bookmark(&id).map(|_| json!(true)),
            ChromeCommand::BookmarkMove { id, folder_id } => mgr
                .move_bookmark(&id, folder_id.as_deref())
                .map(|_| json!(true)),
            ChromeCommand::BookmarkList { folder_id } => {
                let folder = folder_id.as_deref();
                mgr.list_bookmarks(folder).and_then(|bookmarks| {
                    let folders = mgr.list_folders(folder)?;
                    Ok(json!({ "bookmarks": bookmarks, "folders": folders }))
                })
            }
            ChromeCommand::FolderCreate { name, parent_id } => mgr
                .create_folder(&name, parent_id.as_deref())
                .map(|id| json!({ "id": id })),
            ChromeCommand::FolderMove { id, parent_id } => mgr
                .move_folder(&id, parent_id.as_deref())
                .map(|_| json!(true)),
            ChromeCommand::FolderDelete { id } => mgr.delete_folder(&id).map(|_| json!(true)),
            other => {
                debug!(?other, "Command has no handler outside a window");
                return Reply::None;
            }
        };
        match result {
            Ok(value) => Reply::Value(json!({ "ok": true, "result": value })),
            Err(e) => {
                warn!("{}", e);
                Reply::Value(json!({ "ok": false, "message": e.to_string() }))
            }
        }
    }

    // === Downloads ===

    /// Starts tracking a download and announces it.
    pub fn download_started(&mut self, handle: H, start: DownloadStart, source: Option<WindowId>) -> String {
        let update = self.downloads.start(handle, start, source);
        let id = update.id.clone();
        self.announce_download(source, update);
        id
    }

    /// Tracker id for an engine report that names the download by path or url.
    pub fn running_download(&self, save_path: Option<&str>, url: &str) -> Option<String> {
        self.downloads.running_download(save_path, url)
    }

    pub fn download_progress(&mut self, id: &str, received: u64, total: u64, interrupted: bool) {
        match self.downloads.update(id, received, total, interrupted) {
            Ok(update) => {
                let source = self.downloads.source_window(id);
                self.announce_download(source, update);
            }
            Err(e) => debug!("{}", e),
        }
    }

    pub fn download_done(&mut self, id: &str, state: DownloadDoneState, received: u64, total: u64) {
        match self.downloads.finish(id, state, received, total) {
            Ok(update) => {
                let source = self.downloads.source_window(id);
                self.announce_download(source, update);
            }
            Err(e) => debug!("{}", e),
        }
    }

    /// Sends to the originating window, or to every window when it is gone.
    fn announce_download(&mut self, source: Option<WindowId>, update: DownloadUpdate) {
        if let Some(ctx) = source.and_then(|id| self.windows.get_mut(&id)) {
            ctx.push_event(ShellEvent::DownloadUpdated(update));
            return;
        }
        for ctx in self.windows.values_mut() {
            ctx.push_event(ShellEvent::DownloadUpdated(update.clone()));
        }
    }
}

/// Window-level shortcut for a key press seen by the chrome or a page.
pub fn key_request(input: &KeyInput) -> Option<HostRequest> {
    preset_from_input(input).map(HostRequest::ApplySizePreset)
}

fn settings_reply(result: Result<(), crate::types::errors::SettingsError>) -> Reply {
    match result {
        Ok(()) => Reply::Value(json!({ "ok": true })),
        Err(e) => Reply::Value(json!({ "ok": false, "message": e.to_string() })),
    }
}
