//! In-process engine with no rendering.
//!
//! Surfaces record every command they receive and expose knobs for the
//! facts a real engine would report (audibility, failures). The host drives
//! load completion explicitly with [`HeadlessSurface::complete_load`].

use crate::managers::download_manager::DownloadHandle;
use crate::types::errors::{DownloadError, SurfaceError};
use crate::types::find::{FindOptions, StopFindAction};
use crate::types::geometry::Rect;
use crate::types::surface::{ScriptRequest, SurfaceEvent, SurfaceId};

use super::{SurfaceFactory, WebSurface};

#[derive(Debug, Clone, PartialEq)]
pub enum FindCall {
    Find { query: String, options: FindOptions },
    Stop(StopFindAction),
}

#[derive(Debug, Default)]
pub struct HeadlessSurface {
    pub id: SurfaceId,
    pub tab_id: String,
    /// Every url passed to `load_url`, in order.
    pub loads: Vec<String>,
    /// Every injected script, in order.
    pub scripts: Vec<(ScriptRequest, String)>,
    pub find_calls: Vec<FindCall>,
    /// Clipboard commands, `"copy"` or `"paste"`.
    pub edits: Vec<&'static str>,
    pub inspected: bool,
    pub bounds: Rect,
    pub reloads: usize,
    pub focused: bool,
    pub destroyed: bool,
    pub audible: bool,
    pub fail_loads: bool,
    pub fail_scripts: bool,
    url: String,
    title: String,
    muted: bool,
    back: Vec<String>,
    forward: Vec<String>,
}

impl HeadlessSurface {
    pub fn new(tab_id: &str, id: SurfaceId) -> Self {
        Self {
            id,
            tab_id: tab_id.to_string(),
            ..Default::default()
        }
    }

    /// Commits the most recent load and returns the events a real engine
    /// would fire for it.
    pub fn complete_load(&mut self) -> Vec<SurfaceEvent> {
        let Some(target) = self.loads.last().cloned() else {
            return Vec::new();
        };
        if !self.url.is_empty() && self.url != target {
            self.back.push(std::mem::take(&mut self.url));
            self.forward.clear();
        }
        self.url = target.clone();
        vec![SurfaceEvent::Navigated(target), SurfaceEvent::LoadFinished]
    }

    pub fn set_title(&mut self, title: &str) -> SurfaceEvent {
        self.title = title.to_string();
        SurfaceEvent::TitleUpdated(self.title.clone())
    }

    /// The most recent script request, if any.
    pub fn last_script(&self) -> Option<ScriptRequest> {
        self.scripts.last().map(|(request, _)| *request)
    }
}

impl WebSurface for HeadlessSurface {
    fn load_url(&mut self, url: &str) -> Result<(), SurfaceError> {
        if self.fail_loads {
            return Err(SurfaceError::LoadFailed {
                url: url.to_string(),
                reason: "headless load refused".to_string(),
            });
        }
        self.loads.push(url.to_string());
        Ok(())
    }

    fn url(&self) -> String {
        self.url.clone()
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn can_go_back(&self) -> bool {
        !self.back.is_empty()
    }

    fn can_go_forward(&self) -> bool {
        !self.forward.is_empty()
    }

    fn go_back(&mut self) {
        if let Some(previous) = self.back.pop() {
            self.forward.push(std::mem::replace(&mut self.url, previous));
        }
    }

    fn go_forward(&mut self) {
        if let Some(next) = self.forward.pop() {
            self.back.push(std::mem::replace(&mut self.url, next));
        }
    }

    fn reload(&mut self) {
        self.reloads += 1;
    }

    fn focus(&mut self) {
        self.focused = true;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn is_currently_audible(&self) -> bool {
        self.audible
    }

    fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    fn evaluate_script(
        &mut self,
        request: ScriptRequest,
        script: &str,
    ) -> Result<(), SurfaceError> {
        if self.fail_scripts {
            return Err(SurfaceError::ScriptFailed("headless script refused".to_string()));
        }
        self.scripts.push((request, script.to_string()));
        Ok(())
    }

    fn find_in_page(&mut self, query: &str, options: FindOptions) {
        self.find_calls.push(FindCall::Find {
            query: query.to_string(),
            options,
        });
    }

    fn stop_find_in_page(&mut self, action: StopFindAction) {
        self.find_calls.push(FindCall::Stop(action));
    }

    fn copy(&mut self) {
        self.edits.push("copy");
    }

    fn paste(&mut self) {
        self.edits.push("paste");
    }

    fn inspect(&mut self) {
        self.inspected = true;
    }

    fn destroy(&mut self) {
        self.destroyed = true;
    }
}

/// Factory for [`HeadlessSurface`]s.
#[derive(Debug, Default)]
pub struct HeadlessFactory {
    /// Number of surfaces handed out so far.
    pub created: usize,
    /// Simulates an engine that refuses to create surfaces.
    pub refuse: bool,
}

impl HeadlessFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SurfaceFactory for HeadlessFactory {
    type Surface = HeadlessSurface;

    fn create(&mut self, tab_id: &str, id: SurfaceId) -> Option<HeadlessSurface> {
        if self.refuse {
            return None;
        }
        self.created += 1;
        Some(HeadlessSurface::new(tab_id, id))
    }
}

/// Download handle that only records control calls.
#[derive(Debug, Default)]
pub struct HeadlessDownload {
    pub paused: bool,
    pub cancelled: bool,
}

impl DownloadHandle for HeadlessDownload {
    fn is_paused(&self) -> bool {
        self.paused
    }

    fn pause(&mut self) -> Result<(), DownloadError> {
        self.paused = true;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), DownloadError> {
        self.paused = false;
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), DownloadError> {
        self.cancelled = true;
        Ok(())
    }
}
