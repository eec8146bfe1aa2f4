//! Tabshell: tab and surface lifecycle core of a multi-tab desktop browser shell.
//!
//! Entry point: with the `gui` feature, opens a browser window backed by
//! `wry` webviews. Without it, runs a console walk-through of the lifecycle
//! core on the in-process headless engine.

use tracing_subscriber::EnvFilter;

use tabshell::services::settings_engine::SettingsEngine;

/// `RUST_LOG` wins over the configured `logging.filter`.
fn init_logging() {
    let settings = SettingsEngine::new(None).load_or_default();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(feature = "gui")]
fn main() {
    init_logging();
    tracing::info!("Tabshell v{} starting", env!("CARGO_PKG_VERSION"));
    if let Err(e) = tabshell::ui::webview_app::run() {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "gui"))]
fn main() {
    init_logging();
    println!();
    println!("Tabshell v{} console walk-through", env!("CARGO_PKG_VERSION"));
    println!();

    let dir = std::env::temp_dir().join(format!("tabshell-demo-{}", std::process::id()));
    demo::run(&dir);
    if let Err(e) = std::fs::remove_dir_all(&dir) {
        tracing::debug!("Cannot remove demo directory: {}", e);
    }

    println!();
    println!("Done. Build with `--features gui` for a real window.");
}

#[cfg(not(feature = "gui"))]
mod demo {
    use std::path::Path;
    use std::time::{Duration, Instant};

    use serde_json::json;

    use tabshell::app::{App, AppPaths, Reply};
    use tabshell::engine::headless::{HeadlessDownload, HeadlessFactory, HeadlessSurface};
    use tabshell::services::url_normalizer::normalize;
    use tabshell::services::window_presentation::{apply_size_preset, SizePreset};
    use tabshell::types::download::{DownloadDoneState, DownloadStart};
    use tabshell::types::geometry::{Rect, Size};
    use tabshell::types::surface::SurfaceEvent;
    use tabshell::types::window::{DisplayInfo, WindowId};

    type DemoApp = App<HeadlessFactory, HeadlessDownload>;

    fn section(name: &str) {
        println!("───────────────────────────────────────────────");
        println!("  {}", name);
        println!("───────────────────────────────────────────────");
    }

    fn send(app: &mut DemoApp, window: WindowId, message: serde_json::Value, now: Instant) -> Option<Reply> {
        match app.handle_message(window, &message.to_string(), now) {
            Ok(reply) => Some(reply),
            Err(e) => {
                println!("  ! {}", e);
                None
            }
        }
    }

    fn print_events(app: &mut DemoApp, window: WindowId) {
        for event in app.drain_events(window) {
            println!("  → {}", serde_json::to_string(&event).unwrap_or_default());
        }
    }

    fn finish_load(app: &mut DemoApp, window: WindowId, tab_id: &str, now: Instant) {
        let Some(ctx) = app.window_mut(window) else {
            return;
        };
        let Some(surface_id) = ctx.surface_id(tab_id) else {
            return;
        };
        let events = ctx
            .surface_mut(tab_id)
            .map(HeadlessSurface::complete_load)
            .unwrap_or_default();
        for event in events {
            app.handle_surface_event(window, tab_id, surface_id, event, now);
        }
    }

    pub fn run(dir: &Path) {
        let mut app: DemoApp = match App::new(AppPaths::in_dir(dir)) {
            Ok(app) => app,
            Err(e) => {
                println!("Cannot start: {}", e);
                return;
            }
        };
        let start = Instant::now();

        section("URL normalizer");
        for input in ["", "example.com", "localhost:3000", "rust ownership", "ABOUT:BLANK"] {
            println!("  {:<18} → {}", format!("{:?}", input), normalize(input));
        }

        section("Tabs and surfaces");
        let window = app.open_window(HeadlessFactory::new(), Size::new(1280, 800));
        let snapshot = json!({
            "cmd": "tabs_state_changed",
            "tabs": [
                { "id": "a", "url": "example.com" },
                { "id": "b", "url": "rust-lang.org" }
            ],
            "activeTabId": "a"
        });
        send(&mut app, window, snapshot, start);
        finish_load(&mut app, window, "a", start);
        print_events(&mut app, window);

        let switch = json!({
            "cmd": "tabs_state_changed",
            "tabs": [
                { "id": "a", "url": "example.com" },
                { "id": "b", "url": "rust-lang.org" }
            ],
            "activeTabId": "b"
        });
        send(&mut app, window, switch, start);
        finish_load(&mut app, window, "b", start);
        print_events(&mut app, window);
        if let Some(ctx) = app.window(window) {
            println!(
                "  surfaces: {}, discard timers: {}, content: {:?}",
                ctx.surface_count(),
                ctx.discard_timer_count(),
                ctx.content_bounds()
            );
        }

        section("Background discard");
        let later = start + Duration::from_secs(16 * 60);
        app.tick(later);
        let pending = app
            .window(window)
            .and_then(|ctx| ctx.surface("a"))
            .and_then(HeadlessSurface::last_script);
        if let (Some(request), Some(surface_id)) = (
            pending,
            app.window(window).and_then(|ctx| ctx.surface_id("a")),
        ) {
            println!("  media check injected into tab a");
            app.handle_surface_event(
                window,
                "a",
                surface_id,
                SurfaceEvent::ScriptResult {
                    request,
                    result: Ok(json!({ "keep": false })),
                },
                later,
            );
        }
        print_events(&mut app, window);

        section("Find and picture-in-picture");
        send(&mut app, window, json!({ "cmd": "find_in_page", "query": "rust" }), later);
        send(&mut app, window, json!({ "cmd": "toggle_pip" }), later);
        print_events(&mut app, window);

        section("Bookmarks");
        send(&mut app, window, json!({ "cmd": "folder_create", "name": "Docs" }), later);
        let listed = send(&mut app, window, json!({ "cmd": "bookmark_list" }), later);
        if let Some(Reply::Value(value)) = listed {
            println!("  {}", value);
        }

        section("Downloads");
        let id = app.download_started(
            HeadlessDownload::default(),
            DownloadStart {
                url: "https://example.com/file.zip".to_string(),
                filename: "file.zip".to_string(),
                save_path: String::new(),
                total_bytes: 2048,
            },
            Some(window),
        );
        app.download_progress(&id, 1024, 2048, false);
        app.download_done(&id, DownloadDoneState::Completed, 2048, 2048);
        print_events(&mut app, window);

        section("Window presentation");
        let display = DisplayInfo::new(Rect::new(0, 0, 1920, 1080), true);
        let resized = apply_size_preset(
            Rect::new(100, 100, 1440, 920),
            SizePreset::Small,
            &[display],
            Size::new(320, 240),
        );
        println!("  small preset → {:?}", resized);

        app.close_window(window);
        println!("  window closed, {} open", app.window_count());
    }
}
