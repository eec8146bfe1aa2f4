//! Surface Registry.
//!
//! Owns the mapping tab id → live rendering surface for one window and is the
//! only place surfaces are created or destroyed. At most one surface exists
//! per tab id: `create_surface` returns the existing entry instead of making a
//! second one, and removal destroys the surface before the entry goes away.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::engine::{SurfaceFactory, WebSurface};
use crate::types::find::FindMatches;
use crate::types::geometry::Rect;
use crate::types::surface::{ScriptRequest, SurfaceEvent, SurfaceId};
use crate::types::tab::{WebState, DEFAULT_TAB_TITLE};

/// One live surface and the facts the registry tracks about it.
pub struct SurfaceEntry<S> {
    pub tab_id: String,
    pub surface_id: SurfaceId,
    pub surface: S,
    /// Last favicon reported by the engine; reset on every committed navigation.
    pub favicon: String,
    /// Target of a load that has been issued but not finished or failed yet.
    pub pending_url: Option<String>,
}

/// What an engine event means for the window that owns the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// The event belongs to a surface that no longer exists.
    Stale,
    /// Surface-observed state changed; the consolidated web state should be re-emitted.
    StateChanged,
    /// Find results from the surface.
    Find(FindMatches),
    /// Completion of an injected script.
    Script {
        request: ScriptRequest,
        result: Result<serde_json::Value, String>,
    },
}

pub struct SurfaceRegistry<F: SurfaceFactory> {
    factory: F,
    entries: HashMap<String, SurfaceEntry<F::Surface>>,
    next_surface_id: u64,
    next_request_id: u64,
    window_open: bool,
}

impl<F: SurfaceFactory> SurfaceRegistry<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            entries: HashMap::new(),
            next_surface_id: 1,
            next_request_id: 1,
            window_open: true,
        }
    }

    /// Returns the surface for `tab_id`, creating it if there is none.
    ///
    /// New surfaces start at a zero rectangle until layout is applied.
    /// Returns `None` when the window is closed or the engine refused.
    pub fn create_surface(&mut self, tab_id: &str) -> Option<&mut SurfaceEntry<F::Surface>> {
        if !self.entries.contains_key(tab_id) {
            if !self.window_open {
                debug!(tab_id, "Skipping surface creation, window is closed");
                return None;
            }
            let surface_id = SurfaceId(self.next_surface_id);
            self.next_surface_id += 1;
            let Some(mut surface) = self.factory.create(tab_id, surface_id) else {
                warn!(tab_id, "Engine refused to create a surface");
                return None;
            };
            surface.set_bounds(Rect::ZERO);
            debug!(tab_id, surface = surface_id.0, "Surface created");
            self.entries.insert(
                tab_id.to_string(),
                SurfaceEntry {
                    tab_id: tab_id.to_string(),
                    surface_id,
                    surface,
                    favicon: String::new(),
                    pending_url: None,
                },
            );
        }
        self.entries.get_mut(tab_id)
    }

    /// Destroys and forgets the surface for `tab_id`. No-op when there is none.
    pub fn remove_surface(&mut self, tab_id: &str) -> bool {
        match self.entries.remove(tab_id) {
            Some(mut entry) => {
                entry.surface.destroy();
                debug!(tab_id, surface = entry.surface_id.0, "Surface destroyed");
                true
            }
            None => false,
        }
    }

    /// Loads `target` (already normalized) unless the surface is showing it or
    /// a load to the same target is still pending. Returns whether a load was issued.
    pub fn sync_load(&mut self, tab_id: &str, target: &str) -> bool {
        let Some(entry) = self.entries.get_mut(tab_id) else {
            return false;
        };
        if entry.surface.url() == target || entry.pending_url.as_deref() == Some(target) {
            return false;
        }

        entry.pending_url = Some(target.to_string());
        match entry.surface.load_url(target) {
            Ok(()) => {
                debug!(tab_id, url = target, "Load issued");
                true
            }
            Err(e) => {
                entry.pending_url = None;
                warn!(tab_id, "{}", e);
                false
            }
        }
    }

    /// Applies an engine event to the entry it belongs to.
    pub fn handle_event(
        &mut self,
        tab_id: &str,
        surface_id: SurfaceId,
        event: SurfaceEvent,
    ) -> EventOutcome {
        let Some(entry) = self.entries.get_mut(tab_id) else {
            debug!(tab_id, surface = surface_id.0, "Dropping event for removed surface");
            return EventOutcome::Stale;
        };
        if entry.surface_id != surface_id {
            debug!(tab_id, surface = surface_id.0, "Dropping event for replaced surface");
            return EventOutcome::Stale;
        }

        match event {
            SurfaceEvent::FaviconUpdated(urls) => {
                entry.favicon = urls.into_iter().next().unwrap_or_default();
            }
            SurfaceEvent::Navigated(_) => {
                entry.favicon.clear();
            }
            SurfaceEvent::LoadFinished => {
                entry.pending_url = None;
            }
            SurfaceEvent::LoadFailed(reason) => {
                debug!(tab_id, reason = %reason, "Load failed");
                entry.pending_url = None;
            }
            SurfaceEvent::FindResult(matches) => return EventOutcome::Find(matches),
            SurfaceEvent::ScriptResult { request, result } => {
                return EventOutcome::Script { request, result };
            }
            SurfaceEvent::TitleUpdated(_)
            | SurfaceEvent::NavigatedInPage(_)
            | SurfaceEvent::AudibleChanged(_)
            | SurfaceEvent::MuteChanged(_) => {}
        }
        EventOutcome::StateChanged
    }

    /// Consolidated state of the surface for `tab_id`.
    ///
    /// `fallback_url` (the normalized snapshot url) stands in until the engine
    /// commits a navigation.
    pub fn web_state(&self, tab_id: &str, fallback_url: &str) -> Option<WebState> {
        let entry = self.entries.get(tab_id)?;
        let surface = &entry.surface;
        let url = match surface.url() {
            url if url.is_empty() => fallback_url.to_string(),
            url => url,
        };
        let title = match surface.title() {
            title if title.is_empty() => DEFAULT_TAB_TITLE.to_string(),
            title => title,
        };
        Some(WebState {
            tab_id: tab_id.to_string(),
            url,
            title,
            favicon: entry.favicon.clone(),
            can_go_back: surface.can_go_back(),
            can_go_forward: surface.can_go_forward(),
            is_muted: surface.is_muted(),
        })
    }

    /// Allocates a script tag for the surface `surface`.
    pub fn next_request(&mut self, surface: SurfaceId) -> ScriptRequest {
        let id = self.next_request_id;
        self.next_request_id += 1;
        ScriptRequest { surface, id }
    }

    /// Destroys every surface and refuses further creation.
    pub fn close_window(&mut self) {
        self.window_open = false;
        for tab_id in self.tab_ids() {
            self.remove_surface(&tab_id);
        }
    }

    pub fn is_window_open(&self) -> bool {
        self.window_open
    }

    pub fn get(&self, tab_id: &str) -> Option<&SurfaceEntry<F::Surface>> {
        self.entries.get(tab_id)
    }

    pub fn get_mut(&mut self, tab_id: &str) -> Option<&mut SurfaceEntry<F::Surface>> {
        self.entries.get_mut(tab_id)
    }

    pub fn contains(&self, tab_id: &str) -> bool {
        self.entries.contains_key(tab_id)
    }

    pub fn tab_ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut SurfaceEntry<F::Surface>> {
        self.entries.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }
}
