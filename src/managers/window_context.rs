//! Window Context.
//!
//! Everything one browser window owns: its surface registry, discard timers,
//! layout cache, find state and the outbox of events for the chrome. The
//! context is the State Synchronizer (snapshots from the tab store are
//! reconciled in [`WindowContext::apply_snapshot`]) and the target of every
//! chrome command and engine event for the window.
//!
//! Nothing here blocks. Loads and injected scripts complete later as
//! [`SurfaceEvent`]s, and each continuation re-validates the surface id and
//! the pending request before touching state.

use std::collections::HashSet;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::engine::{SurfaceFactory, WebSurface, MEDIA_CHECK_SCRIPT, PICTURE_IN_PICTURE_SCRIPT};
use crate::managers::surface_registry::{EventOutcome, SurfaceRegistry};
use crate::services::context_menu::{build_context_menu, ContextAction, ContextMenuParams, MenuItem};
use crate::services::discard_scheduler::{DiscardPolicy, DiscardScheduler, MediaCheckOutcome};
use crate::services::layout_engine::{BoundsRequest, LayoutEngine};
use crate::services::url_normalizer::UrlNormalizer;
use crate::types::events::{PipResult, ShellEvent};
use crate::types::find::{FindMatches, FindOptions, FindReport, FindState, StopFindAction};
use crate::types::geometry::{Rect, Size};
use crate::types::settings::ShellSettings;
use crate::types::surface::{ScriptRequest, SurfaceEvent, SurfaceId};
use crate::types::tab::{TabSnapshot, TabsSnapshot};
use crate::types::window::{WindowId, WindowStateReport};

pub const NO_ACTIVE_TAB_MESSAGE: &str = "No active tab";
pub const PIP_FAILED_MESSAGE: &str = "Cannot control pop up player on this page";

pub struct WindowContext<F: SurfaceFactory> {
    id: WindowId,
    registry: SurfaceRegistry<F>,
    scheduler: DiscardScheduler,
    layout: LayoutEngine,
    normalizer: UrlNormalizer,
    tabs: Vec<TabSnapshot>,
    active_tab_id: Option<String>,
    find: FindState,
    pending_pip: Option<ScriptRequest>,
    outbox: Vec<ShellEvent>,
}

impl<F: SurfaceFactory> WindowContext<F> {
    pub fn new(id: WindowId, factory: F, settings: &ShellSettings, window_size: Size) -> Self {
        Self {
            id,
            registry: SurfaceRegistry::new(factory),
            scheduler: DiscardScheduler::new(DiscardPolicy::from(&settings.discard)),
            layout: LayoutEngine::new(settings.layout.padding, window_size),
            normalizer: UrlNormalizer::new(settings.search.base_url.clone()),
            tabs: Vec::new(),
            active_tab_id: None,
            find: FindState::default(),
            pending_pip: None,
            outbox: Vec::new(),
        }
    }

    // === State synchronization ===

    /// Reconciles a tab store snapshot against the live surfaces.
    ///
    /// Safe to call repeatedly: an unchanged snapshot creates and destroys
    /// nothing and arms no extra timers.
    pub fn apply_snapshot(&mut self, snapshot: TabsSnapshot, now: Instant) {
        let ids: HashSet<&str> = snapshot.tabs.iter().map(|t| t.id.as_str()).collect();
        for tab_id in self.registry.tab_ids() {
            if !ids.contains(tab_id.as_str()) {
                self.remove_surface(&tab_id);
            }
        }

        let active = snapshot
            .active_tab_id
            .filter(|id| ids.contains(id.as_str()))
            .or_else(|| snapshot.tabs.first().map(|t| t.id.clone()));
        self.tabs = snapshot.tabs;
        self.active_tab_id = active;

        for tab in &self.tabs {
            if let Some(entry) = self.registry.get_mut(&tab.id) {
                entry.surface.set_muted(tab.is_muted);
            }
        }

        self.sync_active_tab();
        self.apply_layout();
        self.refresh_discard_timers(now);
        self.emit_active_web_state();
    }

    /// Binds the active tab to a surface and points it at the tab's url.
    fn sync_active_tab(&mut self) {
        let Some(tab) = self.active_tab().cloned() else {
            return;
        };
        let Some(entry) = self.registry.create_surface(&tab.id) else {
            return;
        };
        if entry.surface.is_muted() != tab.is_muted {
            entry.surface.set_muted(tab.is_muted);
        }

        self.outbox.push(ShellEvent::TabDiscarded {
            tab_id: tab.id.clone(),
            discarded: false,
        });
        self.scheduler.clear(&tab.id);

        let target = self.normalizer.normalize(&tab.url);
        self.registry.sync_load(&tab.id, &target);

        if self.find.is_active() {
            if let Some(entry) = self.registry.get_mut(&tab.id) {
                entry
                    .surface
                    .find_in_page(&self.find.query, FindOptions::default());
            }
        }
    }

    /// Creates a hidden surface for a background tab and starts its load so
    /// a later switch shows a ready page. The tab gets a discard timer like
    /// any other hidden surface. Returns false for the active tab and for
    /// tabs missing from the last snapshot.
    pub fn prewarm(&mut self, tab_id: &str, now: Instant) -> bool {
        if self.active_tab_id.as_deref() == Some(tab_id) {
            return false;
        }
        let Some(tab) = self.tabs.iter().find(|t| t.id == tab_id).cloned() else {
            return false;
        };
        let Some(entry) = self.registry.create_surface(&tab.id) else {
            return false;
        };
        if entry.surface.is_muted() != tab.is_muted {
            entry.surface.set_muted(tab.is_muted);
        }
        let target = self.normalizer.normalize(&tab.url);
        self.registry.sync_load(&tab.id, &target);
        self.apply_layout();
        self.refresh_discard_timers(now);
        true
    }

    fn refresh_discard_timers(&mut self, now: Instant) {
        let live: HashSet<String> = self.registry.tab_ids().into_iter().collect();
        self.scheduler
            .refresh(&live, self.active_tab_id.as_deref(), now);
    }

    fn apply_layout(&mut self) {
        self.layout
            .apply(&mut self.registry, self.active_tab_id.as_deref());
    }

    /// Destroys the surface for `tab_id` and cancels its discard state.
    fn remove_surface(&mut self, tab_id: &str) {
        self.scheduler.clear(tab_id);
        let surface_id = self.registry.get(tab_id).map(|e| e.surface_id);
        if self.pending_pip.map(|r| r.surface) == surface_id {
            self.pending_pip = None;
        }
        self.registry.remove_surface(tab_id);
    }

    // === Web state ===

    fn emit_tab_web_state(&mut self, tab_id: &str) {
        let Some(tab) = self.tabs.iter().find(|t| t.id == tab_id) else {
            return;
        };
        let fallback = self.normalizer.normalize(&tab.url);
        if let Some(state) = self.registry.web_state(tab_id, &fallback) {
            self.outbox.push(ShellEvent::WebState(state));
        }
    }

    fn emit_active_web_state(&mut self) {
        if let Some(active) = self.active_tab_id.clone() {
            self.emit_tab_web_state(&active);
        }
    }

    // === Engine events ===

    /// Applies an engine event fired by surface `surface_id` of `tab_id`.
    pub fn handle_surface_event(
        &mut self,
        tab_id: &str,
        surface_id: SurfaceId,
        event: SurfaceEvent,
        now: Instant,
    ) {
        match self.registry.handle_event(tab_id, surface_id, event) {
            EventOutcome::Stale => {}
            EventOutcome::StateChanged => self.emit_tab_web_state(tab_id),
            EventOutcome::Find(matches) => self.record_find_result(tab_id, matches),
            EventOutcome::Script { request, result } => {
                self.handle_script_result(tab_id, request, result, now)
            }
        }
    }

    fn handle_script_result(
        &mut self,
        tab_id: &str,
        request: ScriptRequest,
        result: Result<Value, String>,
        now: Instant,
    ) {
        if self.pending_pip == Some(request) {
            self.pending_pip = None;
            let outcome = parse_pip_result(result);
            self.outbox.push(ShellEvent::PictureInPicture(outcome));
            return;
        }

        if self.scheduler.tab_for_request(request) != Some(tab_id) {
            debug!(tab_id, request = request.id, "Ignoring result of abandoned script");
            return;
        }

        let keep = match result {
            Ok(value) => value.get("keep").and_then(Value::as_bool).unwrap_or(false),
            Err(e) => {
                debug!(tab_id, "Media check failed, assuming no media: {}", e);
                false
            }
        };
        if self.scheduler.complete_media_check(tab_id, request, keep, now)
            == MediaCheckOutcome::Discard
        {
            self.discard_tab(tab_id);
        }
    }

    fn discard_tab(&mut self, tab_id: &str) {
        if self.active_tab_id.as_deref() == Some(tab_id) {
            return;
        }
        self.remove_surface(tab_id);
        info!(window = self.id.0, tab_id, "Tab discarded");
        self.outbox.push(ShellEvent::TabDiscarded {
            tab_id: tab_id.to_string(),
            discarded: true,
        });
    }

    // === Discard timers ===

    /// Earliest instant at which [`tick`](Self::tick) has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Fires every discard timer whose deadline has passed. Media checks left
    /// unanswered past their deadline count as "no media".
    pub fn tick(&mut self, now: Instant) {
        for tab_id in self.scheduler.take_expired_checks(now) {
            if self.registry.contains(&tab_id) {
                self.discard_tab(&tab_id);
            }
        }
        for tab_id in self.scheduler.take_due(now) {
            self.start_media_check(&tab_id, now);
        }
    }

    fn start_media_check(&mut self, tab_id: &str, now: Instant) {
        if self.active_tab_id.as_deref() == Some(tab_id) || !self.registry.contains(tab_id) {
            self.scheduler.clear(tab_id);
            return;
        }
        let Some(surface_id) = self.registry.get(tab_id).map(|e| e.surface_id) else {
            return;
        };
        let request = self.registry.next_request(surface_id);
        let Some(entry) = self.registry.get_mut(tab_id) else {
            return;
        };

        if entry.surface.is_currently_audible() {
            self.scheduler.rearm_for_media(tab_id, now);
            return;
        }

        match entry.surface.evaluate_script(request, MEDIA_CHECK_SCRIPT) {
            Ok(()) => {
                self.scheduler.await_media(tab_id, request);
            }
            Err(e) => {
                debug!(tab_id, "Media check failed, assuming no media: {}", e);
                self.discard_tab(tab_id);
            }
        }
    }

    // === Chrome commands ===

    /// Explicit content bounds measured by the chrome. Identical repeats are ignored.
    pub fn set_content_bounds(&mut self, request: BoundsRequest) {
        if self.layout.set_explicit_bounds(request) {
            self.apply_layout();
        }
    }

    /// Hides every surface while the chrome shows a transient overlay.
    pub fn set_web_layer_hidden(&mut self, hidden: bool) {
        self.layout.set_hidden(hidden);
        self.apply_layout();
    }

    /// Window content size changed (resize, maximize, unmaximize).
    pub fn resize(&mut self, size: Size) {
        self.layout.set_window_size(size);
        self.apply_layout();
    }

    pub fn set_tab_muted(&mut self, tab_id: &str, muted: bool) {
        let Some(entry) = self.registry.get_mut(tab_id) else {
            return;
        };
        entry.surface.set_muted(muted);
        self.emit_tab_web_state(tab_id);
    }

    fn active_surface(&mut self) -> Option<&mut F::Surface> {
        let active = self.active_tab_id.as_deref()?;
        self.registry.get_mut(active).map(|e| &mut e.surface)
    }

    pub fn go_back(&mut self) {
        if let Some(surface) = self.active_surface() {
            if surface.can_go_back() {
                surface.go_back();
            }
        }
    }

    pub fn go_forward(&mut self) {
        if let Some(surface) = self.active_surface() {
            if surface.can_go_forward() {
                surface.go_forward();
            }
        }
    }

    pub fn reload(&mut self) {
        if let Some(surface) = self.active_surface() {
            surface.reload();
        }
    }

    pub fn focus_active(&mut self) {
        if let Some(surface) = self.active_surface() {
            surface.focus();
        }
    }

    // === Find in page ===

    pub fn find_in_page(&mut self, query: &str, options: FindOptions) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        let Some(active) = self.active_tab_id.clone() else {
            return;
        };
        let Some(entry) = self.registry.get_mut(&active) else {
            return;
        };
        self.find.query = query.to_string();
        entry.surface.find_in_page(query, options);
    }

    pub fn stop_find(&mut self, action: StopFindAction) {
        let Some(surface) = self.active_surface() else {
            return;
        };
        surface.stop_find_in_page(action);
        self.find = FindState::default();
        self.outbox.push(ShellEvent::FindResult(FindReport {
            tab_id: self.active_tab_id.clone(),
            query: String::new(),
            result: self.find.result,
        }));
    }

    fn record_find_result(&mut self, tab_id: &str, matches: FindMatches) {
        if self.active_tab_id.as_deref() != Some(tab_id) {
            return;
        }
        self.find.result = matches;
        self.outbox.push(ShellEvent::FindResult(FindReport {
            tab_id: Some(tab_id.to_string()),
            query: self.find.query.clone(),
            result: matches,
        }));
    }

    // === Picture-in-picture ===

    /// Toggles the pop-up player on the active surface.
    ///
    /// Returns the outcome when it is known immediately; otherwise it arrives
    /// later as [`ShellEvent::PictureInPicture`]. Every outcome is also emitted.
    pub fn toggle_picture_in_picture(&mut self) -> Option<PipResult> {
        let surface_id = self
            .active_tab_id
            .as_deref()
            .and_then(|id| self.registry.get(id))
            .map(|e| e.surface_id);
        let Some(surface_id) = surface_id else {
            return Some(self.finish_pip(PipResult::failed(NO_ACTIVE_TAB_MESSAGE)));
        };

        let request = self.registry.next_request(surface_id);
        let injected = self
            .active_surface()
            .map(|surface| surface.evaluate_script(request, PICTURE_IN_PICTURE_SCRIPT));
        match injected {
            Some(Ok(())) => {
                self.pending_pip = Some(request);
                None
            }
            Some(Err(e)) => {
                warn!(window = self.id.0, "{}", e);
                Some(self.finish_pip(PipResult::failed(PIP_FAILED_MESSAGE)))
            }
            None => Some(self.finish_pip(PipResult::failed(NO_ACTIVE_TAB_MESSAGE))),
        }
    }

    fn finish_pip(&mut self, result: PipResult) -> PipResult {
        self.outbox.push(ShellEvent::PictureInPicture(result.clone()));
        result
    }

    // === Context menu ===

    /// Menu for a right-click in `tab_id`, with navigation flags filled in
    /// from the surface.
    pub fn context_menu(&self, tab_id: &str, params: ContextMenuParams) -> Vec<MenuItem> {
        let params = match self.registry.get(tab_id) {
            Some(entry) => ContextMenuParams {
                can_go_back: entry.surface.can_go_back(),
                can_go_forward: entry.surface.can_go_forward(),
                ..params
            },
            None => params,
        };
        build_context_menu(&params)
    }

    /// Runs a context menu choice made in `tab_id`.
    pub fn run_context_action(&mut self, tab_id: &str, action: ContextAction) {
        match action {
            ContextAction::OpenLinkInNewTab(url) => {
                self.outbox.push(ShellEvent::OpenUrlInNewTab {
                    url: self.normalizer.normalize(&url),
                    background: true,
                });
            }
            ContextAction::OpenLinkInNewWindow(url) => {
                self.outbox.push(ShellEvent::OpenUrlInNewWindow {
                    url: self.normalizer.normalize(&url),
                });
            }
            ContextAction::CopyLink(url) => {
                self.outbox.push(ShellEvent::CopyToClipboard { text: url });
            }
            ContextAction::SearchSelection(text) => {
                self.outbox.push(ShellEvent::OpenUrlInNewTab {
                    url: self.normalizer.search_url(&text),
                    background: false,
                });
            }
            action => {
                let Some(entry) = self.registry.get_mut(tab_id) else {
                    return;
                };
                let surface = &mut entry.surface;
                match action {
                    ContextAction::Copy => surface.copy(),
                    ContextAction::Paste => surface.paste(),
                    ContextAction::Back if surface.can_go_back() => surface.go_back(),
                    ContextAction::Forward if surface.can_go_forward() => surface.go_forward(),
                    ContextAction::Reload => surface.reload(),
                    ContextAction::Inspect => surface.inspect(),
                    _ => {}
                }
            }
        }
    }

    // === Window lifecycle ===

    /// Reports maximized / always-on-top flags to the chrome.
    pub fn report_window_state(&mut self, state: WindowStateReport) {
        self.outbox.push(ShellEvent::WindowState(state));
    }

    /// Window closed: every timer is cleared and every surface destroyed.
    pub fn close(&mut self) {
        self.scheduler.clear_all();
        self.pending_pip = None;
        self.registry.close_window();
        info!(window = self.id.0, "Window context closed");
    }

    /// Queues an event produced outside the context (e.g. downloads).
    pub fn push_event(&mut self, event: ShellEvent) {
        self.outbox.push(event);
    }

    /// Takes every event queued since the last drain.
    pub fn drain_events(&mut self) -> Vec<ShellEvent> {
        std::mem::take(&mut self.outbox)
    }

    // === Accessors ===

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn active_tab_id(&self) -> Option<&str> {
        self.active_tab_id.as_deref()
    }

    fn active_tab(&self) -> Option<&TabSnapshot> {
        let active = self.active_tab_id.as_deref()?;
        self.tabs.iter().find(|t| t.id == active)
    }

    pub fn tabs(&self) -> &[TabSnapshot] {
        &self.tabs
    }

    pub fn surface_count(&self) -> usize {
        self.registry.len()
    }

    pub fn has_surface(&self, tab_id: &str) -> bool {
        self.registry.contains(tab_id)
    }

    pub fn surface(&self, tab_id: &str) -> Option<&F::Surface> {
        self.registry.get(tab_id).map(|e| &e.surface)
    }

    pub fn surface_mut(&mut self, tab_id: &str) -> Option<&mut F::Surface> {
        self.registry.get_mut(tab_id).map(|e| &mut e.surface)
    }

    pub fn surface_id(&self, tab_id: &str) -> Option<SurfaceId> {
        self.registry.get(tab_id).map(|e| e.surface_id)
    }

    pub fn has_discard_timer(&self, tab_id: &str) -> bool {
        self.scheduler.has_timer(tab_id)
    }

    pub fn discard_timer_count(&self) -> usize {
        self.scheduler.timer_count()
    }

    pub fn scheduler(&self) -> &DiscardScheduler {
        &self.scheduler
    }

    pub fn content_bounds(&self) -> Rect {
        self.layout.current_bounds()
    }

    pub fn find_state(&self) -> &FindState {
        &self.find
    }

    pub fn factory(&self) -> &F {
        self.registry.factory()
    }

    pub fn normalizer(&self) -> &UrlNormalizer {
        &self.normalizer
    }
}

/// Reads `{ok, active, message}`; anything else is a generic failure.
fn parse_pip_result(result: Result<Value, String>) -> PipResult {
    match result {
        Ok(Value::Object(map)) => PipResult {
            ok: map.get("ok").and_then(Value::as_bool).unwrap_or(false),
            active: map.get("active").and_then(Value::as_bool).unwrap_or(false),
            message: map
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        },
        _ => PipResult::failed(PIP_FAILED_MESSAGE),
    }
}
