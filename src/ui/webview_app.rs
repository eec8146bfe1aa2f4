//! Window host using `wry` + `tao`.
//!
//! Architecture:
//! - One tao window per browser window, each with its own [`WindowContext`]
//!   inside the shared [`App`].
//! - The chrome page is served via the `tabshell://` custom protocol into a
//!   child webview covering the window; surfaces are child webviews on top.
//! - IPC from pages and the chrome, page loads, titles and downloads are
//!   posted to the event loop as [`UserEvent`]s, so every core call happens on
//!   the loop thread in delivery order.
//! - Discard deadlines drive `ControlFlow::WaitUntil`.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tao::dpi::{LogicalPosition, LogicalSize, PhysicalPosition};
use tao::event::{ElementState, Event, StartCause, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy, EventLoopWindowTarget};
use tao::keyboard::{Key, ModifiersState};
use tao::window::{Window, WindowBuilder};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use wry::{WebView, WebViewBuilder};

use super::chrome::{CHROME_HTML, CHROME_SCHEME, CHROME_URL};
use super::surface::{GuiDownload, GuiFactory};
use crate::app::{key_request, App, AppPaths, HostRequest, Reply};
use crate::services::context_menu::ContextMenuParams;
use crate::services::window_presentation::{apply_size_preset, window_shape, SizePreset};
use crate::types::download::{DownloadDoneState, DownloadStart};
use crate::types::geometry::{Rect, Size};
use crate::types::surface::{SurfaceEvent, SurfaceId};
use crate::types::window::{
    DisplayInfo, KeyEventKind, KeyInput, WindowId, WindowPlacement, WindowStateReport,
};

#[derive(Debug)]
pub enum UserEvent {
    Chrome {
        window: WindowId,
        body: String,
    },
    Surface {
        window: WindowId,
        tab_id: String,
        surface_id: SurfaceId,
        event: SurfaceEvent,
    },
    ContextMenu {
        window: WindowId,
        tab_id: String,
        params: ContextMenuParams,
    },
    OpenInNewTab {
        window: WindowId,
        url: String,
    },
    /// Key press caught inside a page before the page handles it.
    KeyInput {
        window: WindowId,
        input: KeyInput,
    },
    DownloadStarted {
        window: WindowId,
        url: String,
        filename: String,
        save_path: PathBuf,
    },
    DownloadCompleted {
        url: String,
        save_path: Option<PathBuf>,
        success: bool,
    },
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Cannot create window: {0}")]
    Window(#[from] tao::error::OsError),
    #[error("Cannot create webview: {0}")]
    WebView(#[from] wry::Error),
    #[error("Cannot open bookmark database: {0}")]
    Database(#[from] rusqlite::Error),
}

type ShellApp = App<GuiFactory, GuiDownload>;

struct HostWindow {
    window: Rc<Window>,
    chrome: WebView,
    always_on_top: bool,
}

struct Host {
    app: ShellApp,
    proxy: EventLoopProxy<UserEvent>,
    windows: HashMap<WindowId, HostWindow>,
    tao_ids: HashMap<tao::window::WindowId, WindowId>,
    /// Save paths handed out to unfinished downloads.
    reserved_downloads: Arc<Mutex<HashSet<PathBuf>>>,
    modifiers: ModifiersState,
}

// === Geometry helpers ===

fn logical_size(window: &Window) -> Size {
    let size: LogicalSize<f64> = window.inner_size().to_logical(window.scale_factor());
    Size::new(size.width.round() as i32, size.height.round() as i32)
}

fn full_rect(size: Size) -> wry::Rect {
    wry::Rect {
        position: wry::dpi::LogicalPosition::new(0, 0).into(),
        size: wry::dpi::LogicalSize::new(size.width.max(0) as u32, size.height.max(0) as u32)
            .into(),
    }
}

fn displays(target: &EventLoopWindowTarget<UserEvent>) -> Vec<DisplayInfo> {
    let primary = target.primary_monitor();
    target
        .available_monitors()
        .map(|monitor| {
            let scale = monitor.scale_factor();
            let position: LogicalPosition<f64> = monitor.position().to_logical(scale);
            let size: LogicalSize<f64> = monitor.size().to_logical(scale);
            let is_primary = primary
                .as_ref()
                .is_some_and(|p| p.name() == monitor.name() && p.position() == monitor.position());
            DisplayInfo::new(
                Rect::new(
                    position.x.round() as i32,
                    position.y.round() as i32,
                    size.width.round() as i32,
                    size.height.round() as i32,
                ),
                is_primary,
            )
        })
        .collect()
}

fn outer_bounds(window: &Window) -> Rect {
    let scale = window.scale_factor();
    let position: LogicalPosition<f64> = window
        .outer_position()
        .unwrap_or(PhysicalPosition::new(0, 0))
        .to_logical(scale);
    let size = logical_size(window);
    Rect::new(
        position.x.round() as i32,
        position.y.round() as i32,
        size.width,
        size.height,
    )
}

/// Opens `path` with the desktop's default handler, or reveals it.
fn open_path(path: &Path, reveal: bool) {
    #[cfg(target_os = "macos")]
    let result = if reveal {
        std::process::Command::new("open").arg("-R").arg(path).spawn()
    } else {
        std::process::Command::new("open").arg(path).spawn()
    };
    #[cfg(target_os = "windows")]
    let result = if reveal {
        std::process::Command::new("explorer")
            .arg(format!("/select,{}", path.display()))
            .spawn()
    } else {
        std::process::Command::new("explorer").arg(path).spawn()
    };
    #[cfg(target_os = "linux")]
    let result = {
        let target = if reveal {
            path.parent().unwrap_or(path)
        } else {
            path
        };
        std::process::Command::new("xdg-open").arg(target).spawn()
    };
    if let Err(e) = result {
        warn!(path = %path.display(), "Cannot open download: {}", e);
    }
}

// === Host ===

impl Host {
    fn open_window(&mut self, target: &EventLoopWindowTarget<UserEvent>) -> Result<WindowId, HostError> {
        let placement = self.app.restore_placement(&displays(target));
        let settings = self.app.settings().window.clone();
        let mut builder = WindowBuilder::new()
            .with_title("Tabshell")
            .with_inner_size(LogicalSize::new(
                placement.width as f64,
                placement.height as f64,
            ))
            .with_min_inner_size(LogicalSize::new(
                settings.min_width as f64,
                settings.min_height as f64,
            ))
            .with_maximized(placement.is_maximized);
        if let (Some(x), Some(y)) = (placement.x, placement.y) {
            builder = builder.with_position(LogicalPosition::new(x as f64, y as f64));
        }
        let window = Rc::new(builder.build(target)?);
        let size = logical_size(&window);

        let proxy = self.proxy.clone();
        let downloads_dir = self.app.downloads_dir().to_path_buf();
        let reserved = self.reserved_downloads.clone();
        let surface_parent = window.clone();
        let id = self.app.open_window_with(
            |id| GuiFactory::new(surface_parent, id, proxy, downloads_dir, reserved),
            size,
        );

        let proxy = self.proxy.clone();
        let chrome = WebViewBuilder::new()
            .with_custom_protocol(CHROME_SCHEME.into(), move |_id, _request| {
                wry::http::Response::builder()
                    .header("Content-Type", "text/html; charset=utf-8")
                    .body(Cow::Borrowed(CHROME_HTML.as_bytes()))
                    .unwrap_or_default()
            })
            .with_url(CHROME_URL)
            .with_bounds(full_rect(size))
            .with_ipc_handler(move |request: wry::http::Request<String>| {
                let _ = proxy.send_event(UserEvent::Chrome {
                    window: id,
                    body: request.body().clone(),
                });
            })
            .with_devtools(cfg!(debug_assertions))
            .build_as_child(&*window)?;

        self.tao_ids.insert(window.id(), id);
        self.windows.insert(
            id,
            HostWindow {
                window,
                chrome,
                always_on_top: false,
            },
        );
        self.apply_shape(id);
        info!(window = id.0, "Window shown");
        Ok(id)
    }

    fn close_window(&mut self, id: WindowId) {
        self.save_placement(id);
        self.app.close_window(id);
        if let Some(host) = self.windows.remove(&id) {
            self.tao_ids.remove(&host.window.id());
        }
    }

    fn save_placement(&self, id: WindowId) {
        let Some(host) = self.windows.get(&id) else {
            return;
        };
        let window = &host.window;
        let mut placement = self.app.placement.read();
        placement.is_maximized = window.is_maximized();
        if !placement.is_maximized {
            let bounds = outer_bounds(window);
            placement = WindowPlacement {
                width: bounds.width,
                height: bounds.height,
                x: Some(bounds.x),
                y: Some(bounds.y),
                is_maximized: false,
            };
        }
        self.app.save_placement(&placement);
    }

    fn apply_shape(&self, id: WindowId) {
        let Some(host) = self.windows.get(&id) else {
            return;
        };
        let window = &host.window;
        let radius = self.app.settings().window.corner_radius;
        let shape = window_shape(
            logical_size(window),
            radius,
            window.is_maximized() || window.fullscreen().is_some(),
            cfg!(target_os = "windows"),
        );
        // tao has no region API; the decorated window keeps its native outline.
        debug!(window = id.0, ?shape, "Window shape");
    }

    fn report_state(&mut self, id: WindowId) {
        let Some(host) = self.windows.get(&id) else {
            return;
        };
        let report = WindowStateReport {
            is_maximized: host.window.is_maximized(),
            is_always_on_top: host.always_on_top,
        };
        if let Some(ctx) = self.app.window_mut(id) {
            ctx.report_window_state(report);
        }
    }

    fn handle_window_event(&mut self, id: WindowId, event: WindowEvent, target: &EventLoopWindowTarget<UserEvent>) {
        match event {
            WindowEvent::CloseRequested => self.close_window(id),
            WindowEvent::Resized(_) => {
                let Some(host) = self.windows.get(&id) else {
                    return;
                };
                let size = logical_size(&host.window);
                if let Err(e) = host.chrome.set_bounds(full_rect(size)) {
                    debug!("Cannot resize chrome: {}", e);
                }
                if let Some(ctx) = self.app.window_mut(id) {
                    ctx.resize(size);
                }
                self.apply_shape(id);
                self.report_state(id);
                self.save_placement(id);
            }
            WindowEvent::Moved(_) => self.save_placement(id),
            WindowEvent::ModifiersChanged(modifiers) => self.modifiers = modifiers,
            WindowEvent::KeyboardInput { event, .. } => {
                let input = KeyInput {
                    kind: match event.state {
                        ElementState::Pressed => KeyEventKind::KeyDown,
                        _ => KeyEventKind::KeyUp,
                    },
                    key: match &event.logical_key {
                        Key::Character(c) => c.to_string(),
                        other => format!("{:?}", other),
                    },
                    code: format!("{:?}", event.physical_key),
                    alt: self.modifiers.alt_key(),
                    control: self.modifiers.control_key(),
                    meta: self.modifiers.super_key(),
                    shift: self.modifiers.shift_key(),
                };
                if let Some(request) = key_request(&input) {
                    self.handle_host_request(id, request, target);
                }
            }
            _ => {}
        }
    }

    fn apply_preset(&mut self, id: WindowId, preset: SizePreset, target: &EventLoopWindowTarget<UserEvent>) {
        let Some(host) = self.windows.get(&id) else {
            return;
        };
        let window = &host.window;
        if window.fullscreen().is_some() {
            return;
        }
        if window.is_maximized() {
            window.set_maximized(false);
        }
        let settings = &self.app.settings().window;
        let bounds = apply_size_preset(
            outer_bounds(window),
            preset,
            &displays(target),
            Size::new(settings.min_width, settings.min_height),
        );
        window.set_inner_size(LogicalSize::new(bounds.width as f64, bounds.height as f64));
        window.set_outer_position(LogicalPosition::new(bounds.x as f64, bounds.y as f64));
    }

    fn handle_user_event(&mut self, event: UserEvent, target: &EventLoopWindowTarget<UserEvent>) {
        let now = Instant::now();
        match event {
            UserEvent::Chrome { window, body } => self.handle_chrome_message(window, &body, now, target),
            UserEvent::Surface {
                window,
                tab_id,
                surface_id,
                event,
            } => self
                .app
                .handle_surface_event(window, &tab_id, surface_id, event, now),
            UserEvent::ContextMenu {
                window,
                tab_id,
                params,
            } => {
                let Some(ctx) = self.app.window(window) else {
                    return;
                };
                let items = ctx.context_menu(&tab_id, params);
                let payload = serde_json::to_string(&items).unwrap_or_else(|_| "[]".to_string());
                let tab = serde_json::to_string(&tab_id).unwrap_or_default();
                self.eval_chrome(
                    window,
                    &format!("window.__tabshell&&window.__tabshell.showContextMenu({tab},{payload})"),
                );
            }
            UserEvent::KeyInput { window, input } => {
                if let Some(request) = key_request(&input) {
                    self.handle_host_request(window, request, target);
                }
            }
            UserEvent::OpenInNewTab { window, url } => {
                if let Some(ctx) = self.app.window_mut(window) {
                    let url = ctx.normalizer().normalize(&url);
                    ctx.push_event(crate::types::events::ShellEvent::OpenUrlInNewTab {
                        url,
                        background: false,
                    });
                }
            }
            UserEvent::DownloadStarted {
                window,
                url,
                filename,
                save_path,
            } => {
                let start = DownloadStart {
                    url,
                    filename,
                    save_path: save_path.to_string_lossy().into_owned(),
                    total_bytes: 0,
                };
                self.app
                    .download_started(GuiDownload::default(), start, Some(window));
            }
            UserEvent::DownloadCompleted {
                url,
                save_path,
                success,
            } => {
                let path = save_path.as_ref().map(|p| p.to_string_lossy().into_owned());
                let Some(id) = self.app.running_download(path.as_deref(), &url) else {
                    return;
                };
                let state = if success {
                    DownloadDoneState::Completed
                } else {
                    DownloadDoneState::Interrupted
                };
                let size = save_path
                    .and_then(|p| std::fs::metadata(p).ok())
                    .map(|m| m.len())
                    .unwrap_or(0);
                self.app.download_done(&id, state, size, size);
            }
        }
    }

    fn handle_chrome_message(
        &mut self,
        id: WindowId,
        body: &str,
        now: Instant,
        target: &EventLoopWindowTarget<UserEvent>,
    ) {
        let request_id = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("requestId").cloned());
        let reply = match self.app.handle_message(id, body, now) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(window = id.0, "{}", e);
                return;
            }
        };
        match reply {
            Reply::None => {}
            Reply::Value(value) => {
                let request_id = request_id.unwrap_or(serde_json::Value::Null);
                self.eval_chrome(
                    id,
                    &format!("window.__tabshell&&window.__tabshell.reply({request_id},{value})"),
                );
            }
            Reply::Host(request) => self.handle_host_request(id, request, target),
        }
    }

    fn handle_host_request(&mut self, id: WindowId, request: HostRequest, target: &EventLoopWindowTarget<UserEvent>) {
        match request {
            HostRequest::NewWindow => {
                if let Err(e) = self.open_window(target) {
                    error!("{}", e);
                }
            }
            HostRequest::Close => self.close_window(id),
            HostRequest::Minimize => {
                if let Some(host) = self.windows.get(&id) {
                    host.window.set_minimized(true);
                }
            }
            HostRequest::ToggleMaximize => {
                if let Some(host) = self.windows.get(&id) {
                    host.window.set_maximized(!host.window.is_maximized());
                }
                self.report_state(id);
            }
            HostRequest::ToggleAlwaysOnTop => {
                if let Some(host) = self.windows.get_mut(&id) {
                    host.always_on_top = !host.always_on_top;
                    host.window.set_always_on_top(host.always_on_top);
                }
                self.report_state(id);
            }
            HostRequest::GetWindowState => self.report_state(id),
            HostRequest::ApplySizePreset(preset) => self.apply_preset(id, preset, target),
            HostRequest::OpenPath { path, reveal } => open_path(&path, reveal),
        }
    }

    fn eval_chrome(&self, id: WindowId, script: &str) {
        if let Some(host) = self.windows.get(&id) {
            if let Err(e) = host.chrome.evaluate_script(script) {
                debug!(window = id.0, "Cannot reach chrome: {}", e);
            }
        }
    }

    /// Delivers every queued core event to its window's chrome.
    fn flush_events(&mut self) {
        for id in self.app.window_ids() {
            for event in self.app.drain_events(id) {
                match serde_json::to_string(&event) {
                    Ok(json) => self.eval_chrome(
                        id,
                        &format!("window.__tabshell&&window.__tabshell.dispatch({json})"),
                    ),
                    Err(e) => warn!("Cannot encode event: {}", e),
                }
            }
        }
    }
}

// === Main entry point ===

pub fn run() -> Result<(), HostError> {
    let app = ShellApp::new(AppPaths::platform())?;
    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();
    let mut host = Host {
        app,
        proxy: event_loop.create_proxy(),
        windows: HashMap::new(),
        tao_ids: HashMap::new(),
        reserved_downloads: Arc::new(Mutex::new(HashSet::new())),
        modifiers: ModifiersState::default(),
    };
    host.open_window(&event_loop)?;

    event_loop.run(move |event, target, control_flow| {
        match event {
            Event::NewEvents(StartCause::ResumeTimeReached { .. }) => host.app.tick(Instant::now()),
            Event::WindowEvent {
                window_id, event, ..
            } => {
                if let Some(id) = host.tao_ids.get(&window_id).copied() {
                    host.handle_window_event(id, event, target);
                }
            }
            Event::UserEvent(event) => host.handle_user_event(event, target),
            _ => {}
        }
        host.flush_events();

        *control_flow = if host.windows.is_empty() {
            ControlFlow::Exit
        } else {
            match host.app.next_deadline() {
                Some(deadline) => ControlFlow::WaitUntil(deadline),
                None => ControlFlow::Wait,
            }
        };
    })
}
