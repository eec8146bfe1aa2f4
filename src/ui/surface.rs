//! `wry`-backed rendering surfaces.
//!
//! Each surface is a child webview of its window. A small agent script is
//! injected into every page; it reports audible media, favicons, in-page
//! navigation, find matches, right-clicks and script results back over IPC.
//! Those messages become [`SurfaceEvent`]s tagged with the surface id and are
//! posted to the event loop, so a late message from a destroyed surface is
//! recognized as stale by the registry.

use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use serde_json::Value;
use tao::event_loop::EventLoopProxy;
use tao::window::Window;
use tracing::{debug, warn};
use wry::dpi::{LogicalPosition, LogicalSize};
use wry::{PageLoadEvent, WebView, WebViewBuilder};

use super::webview_app::UserEvent;
use crate::engine::{SurfaceFactory, WebSurface};
use crate::managers::download_manager::{unique_save_path, DownloadHandle};
use crate::services::context_menu::ContextMenuParams;
use crate::types::errors::{DownloadError, SurfaceError};
use crate::types::find::{FindMatches, FindOptions, StopFindAction};
use crate::types::geometry::Rect;
use crate::types::surface::{ScriptRequest, SurfaceEvent, SurfaceId};
use crate::types::window::{KeyInput, WindowId};

const PAGE_AGENT_JS: &str = r#"(() => {
  if (window.__tabshellAgent) return;
  window.__tabshellAgent = true;
  const post = (message) => window.ipc.postMessage(JSON.stringify(message));
  const media = () => Array.from(document.querySelectorAll("video, audio"));
  let audible = false;
  const checkAudible = () => {
    if (window.__tabshellMuted) media().forEach((m) => { m.muted = true; });
    const now = media().some((m) => !m.paused && !m.ended && !m.muted && m.volume > 0);
    if (now !== audible) {
      audible = now;
      post({ kind: "audible", value: now });
    }
  };
  ["play", "pause", "ended", "volumechange", "emptied"].forEach((type) =>
    document.addEventListener(type, checkAudible, true));
  window.addEventListener("DOMContentLoaded", () => {
    const icons = Array.from(document.querySelectorAll("link[rel~='icon']")).map((l) => l.href);
    post({ kind: "favicon", urls: icons.length ? icons : [location.origin + "/favicon.ico"] });
  });
  const inPage = () => post({ kind: "inPage", url: location.href });
  window.addEventListener("hashchange", inPage);
  window.addEventListener("popstate", inPage);
  document.addEventListener("contextmenu", (event) => {
    const link = event.target.closest ? event.target.closest("a[href]") : null;
    const editable = event.target.isContentEditable ||
      ["INPUT", "TEXTAREA"].includes(event.target.tagName);
    post({
      kind: "contextMenu",
      linkUrl: link ? link.href : "",
      selectionText: String(window.getSelection() || ""),
      isEditable: Boolean(editable),
    });
    event.preventDefault();
  }, true);
  document.addEventListener("keydown", (event) => {
    if (!event.altKey || event.ctrlKey || event.metaKey) return;
    if (!/^Digit[1-3]$/.test(event.code) && !["1", "2", "3"].includes(event.key)) return;
    post({ kind: "keyInput", input: {
      kind: "keyDown", key: event.key, code: event.code,
      alt: event.altKey, control: event.ctrlKey, meta: event.metaKey, shift: event.shiftKey,
    } });
    event.preventDefault();
  }, true);
})();"#;

/// Wraps `script` so its (possibly async) result is posted back tagged with `id`.
fn wrap_script(id: u64, script: &str) -> String {
    format!(
        r#"(async () => {{
  let message;
  try {{
    message = {{ kind: "scriptResult", id: {id}, ok: true, value: await ({script}) }};
  }} catch (error) {{
    message = {{ kind: "scriptResult", id: {id}, ok: false, error: String(error) }};
  }}
  window.ipc.postMessage(JSON.stringify(message));
}})();"#
    )
}

fn find_script(query: &str, options: FindOptions) -> String {
    let query = serde_json::to_string(query).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"(() => {{
  const query = {query};
  if (!{find_next}) window.getSelection().removeAllRanges();
  const found = window.find(query, false, {backwards}, true);
  const text = (document.body && document.body.innerText || "").toLowerCase();
  const needle = query.toLowerCase();
  let matches = 0;
  for (let i = text.indexOf(needle); needle && i >= 0; i = text.indexOf(needle, i + needle.length)) matches++;
  window.ipc.postMessage(JSON.stringify({{ kind: "find", matches, activeMatchOrdinal: found ? 1 : 0 }}));
}})();"#,
        find_next = options.find_next,
        backwards = !options.forward,
    )
}

const ACTIVATE_SELECTION_JS: &str = r#"(() => {
  const node = window.getSelection().anchorNode;
  const link = node && node.parentElement ? node.parentElement.closest("a[href]") : null;
  window.getSelection().removeAllRanges();
  if (link) link.click();
})();"#;

fn mute_script(muted: bool) -> String {
    format!(
        "window.__tabshellMuted = {muted}; \
         document.querySelectorAll('video, audio').forEach((m) => {{ m.muted = {muted}; }});"
    )
}

fn to_wry_rect(bounds: Rect) -> wry::Rect {
    wry::Rect {
        position: LogicalPosition::new(bounds.x, bounds.y).into(),
        size: LogicalSize::new(bounds.width.max(0) as u32, bounds.height.max(0) as u32).into(),
    }
}

// === Page messages ===

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum PageMessage {
    ScriptResult {
        id: u64,
        ok: bool,
        #[serde(default)]
        value: Value,
        #[serde(default)]
        error: String,
    },
    Audible {
        value: bool,
    },
    Favicon {
        urls: Vec<String>,
    },
    InPage {
        url: String,
    },
    #[serde(rename_all = "camelCase")]
    Find {
        matches: u32,
        active_match_ordinal: u32,
    },
    #[serde(rename_all = "camelCase")]
    ContextMenu {
        link_url: String,
        selection_text: String,
        is_editable: bool,
    },
    KeyInput {
        input: KeyInput,
    },
}

/// Engine-observed facts read back synchronously by the core.
#[derive(Debug, Default)]
struct PageState {
    title: String,
    audible: bool,
    /// Index into the session history; `None` before the first commit.
    index: Option<usize>,
    max_index: usize,
    traversing: bool,
}

impl PageState {
    fn committed(&mut self) {
        if self.traversing {
            self.traversing = false;
            return;
        }
        let next = self.index.map_or(0, |i| i + 1);
        self.index = Some(next);
        self.max_index = next;
    }
}

/// Routes page output for one surface onto the event loop.
#[derive(Clone)]
struct SurfaceLink {
    proxy: EventLoopProxy<UserEvent>,
    window: WindowId,
    tab_id: String,
    surface_id: SurfaceId,
}

impl SurfaceLink {
    fn send(&self, event: SurfaceEvent) {
        let _ = self.proxy.send_event(UserEvent::Surface {
            window: self.window,
            tab_id: self.tab_id.clone(),
            surface_id: self.surface_id,
            event,
        });
    }

    fn handle_page_message(&self, state: &Mutex<PageState>, body: &str) {
        let message: PageMessage = match serde_json::from_str(body) {
            Ok(message) => message,
            Err(e) => {
                debug!(tab_id = %self.tab_id, "Ignoring page message: {}", e);
                return;
            }
        };
        match message {
            PageMessage::ScriptResult {
                id,
                ok,
                value,
                error,
            } => self.send(SurfaceEvent::ScriptResult {
                request: ScriptRequest {
                    surface: self.surface_id,
                    id,
                },
                result: if ok { Ok(value) } else { Err(error) },
            }),
            PageMessage::Audible { value } => {
                if let Ok(mut state) = state.lock() {
                    state.audible = value;
                }
                self.send(SurfaceEvent::AudibleChanged(value));
            }
            PageMessage::Favicon { urls } => self.send(SurfaceEvent::FaviconUpdated(urls)),
            PageMessage::InPage { url } => self.send(SurfaceEvent::NavigatedInPage(url)),
            PageMessage::Find {
                matches,
                active_match_ordinal,
            } => self.send(SurfaceEvent::FindResult(FindMatches {
                matches,
                active_match_ordinal,
                final_update: true,
            })),
            PageMessage::ContextMenu {
                link_url,
                selection_text,
                is_editable,
            } => {
                let _ = self.proxy.send_event(UserEvent::ContextMenu {
                    window: self.window,
                    tab_id: self.tab_id.clone(),
                    params: ContextMenuParams {
                        link_url,
                        selection_text,
                        is_editable,
                        ..ContextMenuParams::default()
                    },
                });
            }
            PageMessage::KeyInput { input } => {
                let _ = self.proxy.send_event(UserEvent::KeyInput {
                    window: self.window,
                    input,
                });
            }
        }
    }
}

// === Surface ===

pub struct GuiSurface {
    webview: WebView,
    state: Arc<Mutex<PageState>>,
    muted: bool,
}

impl GuiSurface {
    fn run(&self, script: &str) {
        if let Err(e) = self.webview.evaluate_script(script) {
            debug!("Script injection failed: {}", e);
        }
    }

    fn with_state<T>(&self, read: impl FnOnce(&PageState) -> T) -> Option<T> {
        self.state.lock().ok().map(|state| read(&state))
    }
}

impl WebSurface for GuiSurface {
    fn load_url(&mut self, url: &str) -> Result<(), SurfaceError> {
        self.webview
            .load_url(url)
            .map_err(|e| SurfaceError::LoadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    fn url(&self) -> String {
        self.webview.url().unwrap_or_default()
    }

    fn title(&self) -> String {
        self.with_state(|s| s.title.clone()).unwrap_or_default()
    }

    fn can_go_back(&self) -> bool {
        self.with_state(|s| s.index.is_some_and(|i| i > 0))
            .unwrap_or(false)
    }

    fn can_go_forward(&self) -> bool {
        self.with_state(|s| s.index.is_some_and(|i| i < s.max_index))
            .unwrap_or(false)
    }

    fn go_back(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(i) = state.index.filter(|i| *i > 0) {
                state.index = Some(i - 1);
                state.traversing = true;
            }
        }
        self.run("history.back();");
    }

    fn go_forward(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(i) = state.index.filter(|i| *i < state.max_index) {
                state.index = Some(i + 1);
                state.traversing = true;
            }
        }
        self.run("history.forward();");
    }

    fn reload(&mut self) {
        if let Err(e) = self.webview.reload() {
            warn!("Reload failed: {}", e);
        }
    }

    fn focus(&mut self) {
        if let Err(e) = self.webview.focus() {
            debug!("Focus failed: {}", e);
        }
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.run(&mute_script(muted));
    }

    fn is_currently_audible(&self) -> bool {
        !self.muted && self.with_state(|s| s.audible).unwrap_or(false)
    }

    fn set_bounds(&mut self, bounds: Rect) {
        if let Err(e) = self.webview.set_bounds(to_wry_rect(bounds)) {
            debug!("Cannot set surface bounds: {}", e);
        }
    }

    fn evaluate_script(
        &mut self,
        request: ScriptRequest,
        script: &str,
    ) -> Result<(), SurfaceError> {
        self.webview
            .evaluate_script(&wrap_script(request.id, script))
            .map_err(|e| SurfaceError::ScriptFailed(e.to_string()))
    }

    fn find_in_page(&mut self, query: &str, options: FindOptions) {
        self.run(&find_script(query, options));
    }

    fn stop_find_in_page(&mut self, action: StopFindAction) {
        match action {
            StopFindAction::ClearSelection => self.run("window.getSelection().removeAllRanges();"),
            StopFindAction::ActivateSelection => self.run(ACTIVATE_SELECTION_JS),
        }
    }

    fn copy(&mut self) {
        self.run("document.execCommand('copy');");
    }

    fn paste(&mut self) {
        self.run("document.execCommand('paste');");
    }

    fn inspect(&mut self) {
        #[cfg(debug_assertions)]
        self.webview.open_devtools();
    }

    fn destroy(&mut self) {
        if let Err(e) = self.webview.set_visible(false) {
            debug!("Cannot hide surface: {}", e);
        }
    }
}

// === Factory ===

/// Builds child webviews for one window.
pub struct GuiFactory {
    window: Rc<Window>,
    window_id: WindowId,
    proxy: EventLoopProxy<UserEvent>,
    downloads_dir: PathBuf,
    /// Save paths of unfinished downloads, shared by every window.
    reserved: Arc<Mutex<HashSet<PathBuf>>>,
}

impl GuiFactory {
    pub fn new(
        window: Rc<Window>,
        window_id: WindowId,
        proxy: EventLoopProxy<UserEvent>,
        downloads_dir: PathBuf,
        reserved: Arc<Mutex<HashSet<PathBuf>>>,
    ) -> Self {
        Self {
            window,
            window_id,
            proxy,
            downloads_dir,
            reserved,
        }
    }
}

impl SurfaceFactory for GuiFactory {
    type Surface = GuiSurface;

    fn create(&mut self, tab_id: &str, id: SurfaceId) -> Option<GuiSurface> {
        let state = Arc::new(Mutex::new(PageState::default()));
        let link = SurfaceLink {
            proxy: self.proxy.clone(),
            window: self.window_id,
            tab_id: tab_id.to_string(),
            surface_id: id,
        };

        let ipc_link = link.clone();
        let ipc_state = state.clone();
        let load_link = link.clone();
        let load_state = state.clone();
        let title_link = link.clone();
        let title_state = state.clone();
        let popup_link = link.clone();
        let download_link = link.clone();
        let done_link = link;
        let downloads_dir = self.downloads_dir.clone();
        let start_reserved = self.reserved.clone();
        let done_reserved = self.reserved.clone();

        let built = WebViewBuilder::new()
            .with_bounds(to_wry_rect(Rect::ZERO))
            .with_initialization_script(PAGE_AGENT_JS)
            .with_ipc_handler(move |request: wry::http::Request<String>| {
                ipc_link.handle_page_message(&ipc_state, request.body());
            })
            .with_on_page_load_handler(move |event, url| match event {
                PageLoadEvent::Started => {
                    if let Ok(mut state) = load_state.lock() {
                        state.committed();
                    }
                    load_link.send(SurfaceEvent::Navigated(url));
                }
                PageLoadEvent::Finished => load_link.send(SurfaceEvent::LoadFinished),
            })
            .with_document_title_changed_handler(move |title| {
                if let Ok(mut state) = title_state.lock() {
                    state.title = title.clone();
                }
                title_link.send(SurfaceEvent::TitleUpdated(title));
            })
            .with_new_window_req_handler(move |url, _features| {
                let _ = popup_link.proxy.send_event(UserEvent::OpenInNewTab {
                    window: popup_link.window,
                    url,
                });
                wry::NewWindowResponse::Deny
            })
            .with_download_started_handler(move |url, path| {
                let filename = download_filename(&url);
                *path = match start_reserved.lock() {
                    Ok(mut reserved) => {
                        let free = unique_save_path(&downloads_dir, &filename, |p| {
                            reserved.contains(p) || p.exists()
                        });
                        reserved.insert(free.clone());
                        free
                    }
                    Err(_) => downloads_dir.join(&filename),
                };
                let _ = download_link.proxy.send_event(UserEvent::DownloadStarted {
                    window: download_link.window,
                    url,
                    filename,
                    save_path: path.clone(),
                });
                true
            })
            .with_download_completed_handler(move |url, path, success| {
                if let (Some(path), Ok(mut reserved)) = (path.as_ref(), done_reserved.lock()) {
                    reserved.remove(path);
                }
                let _ = done_link.proxy.send_event(UserEvent::DownloadCompleted {
                    url,
                    save_path: path,
                    success,
                });
            })
            .with_devtools(cfg!(debug_assertions))
            .build_as_child(&*self.window);

        match built {
            Ok(webview) => Some(GuiSurface {
                webview,
                state,
                muted: false,
            }),
            Err(e) => {
                warn!(tab_id, "Engine refused to create a surface: {}", e);
                None
            }
        }
    }
}

/// Last path segment of `url`, or `download` when there is none.
fn download_filename(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .and_then(|name| urlencoding::decode(&name).ok().map(|n| n.into_owned()))
        .unwrap_or_else(|| "download".to_string())
}

// === Downloads ===

/// wry exposes no download control; every action is refused.
#[derive(Debug, Default)]
pub struct GuiDownload;

impl DownloadHandle for GuiDownload {
    fn is_paused(&self) -> bool {
        false
    }

    fn pause(&mut self) -> Result<(), DownloadError> {
        Err(DownloadError::Refused("pause".to_string()))
    }

    fn resume(&mut self) -> Result<(), DownloadError> {
        Err(DownloadError::Refused("resume".to_string()))
    }

    fn cancel(&mut self) -> Result<(), DownloadError> {
        Err(DownloadError::Refused("cancel".to_string()))
    }
}
