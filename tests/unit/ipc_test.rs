use std::time::Instant;

use rstest::rstest;
use serde_json::{json, Value};
use tempfile::TempDir;

use tabshell::app::{key_request, App, AppPaths, HostRequest, Reply};
use tabshell::engine::headless::{HeadlessDownload, HeadlessFactory};
use tabshell::ipc::{parse_command, ChromeCommand, OpenMode};
use tabshell::services::context_menu::ContextAction;
use tabshell::services::window_presentation::SizePreset;
use tabshell::types::download::{DownloadDoneState, DownloadStart, DownloadStatus};
use tabshell::managers::download_manager::DownloadHandle;
use tabshell::types::errors::{DownloadError, IpcError};
use tabshell::types::events::ShellEvent;
use tabshell::types::geometry::Size;
use tabshell::types::window::{KeyEventKind, KeyInput, WindowId};

type TestApp = App<HeadlessFactory, HeadlessDownload>;

fn app(dir: &TempDir) -> TestApp {
    App::new(AppPaths::in_dir(dir.path())).unwrap()
}

fn send(app: &mut TestApp, window: WindowId, message: Value) -> Reply {
    app.handle_message(window, &message.to_string(), Instant::now()).unwrap()
}

fn value(reply: Reply) -> Value {
    match reply {
        Reply::Value(v) => v,
        other => panic!("expected a value reply, got {other:?}"),
    }
}

fn download(name: &str) -> DownloadStart {
    DownloadStart {
        url: format!("https://example.com/{name}"),
        filename: name.to_string(),
        save_path: String::new(),
        total_bytes: 10,
    }
}

fn download_events(events: Vec<ShellEvent>) -> Vec<DownloadStatus> {
    events
        .into_iter()
        .filter_map(|e| match e {
            ShellEvent::DownloadUpdated(update) => Some(update.status),
            _ => None,
        })
        .collect()
}

// === Decoding ===

#[test]
fn test_parse_snapshot() {
    let cmd = parse_command(
        r#"{"cmd":"tabs_state_changed","tabs":[{"id":"a","url":"x.com","isMuted":true}],"activeTabId":"a"}"#,
    )
    .unwrap();
    match cmd {
        ChromeCommand::TabsStateChanged(snapshot) => {
            assert_eq!(snapshot.tabs.len(), 1);
            assert!(snapshot.tabs[0].is_muted);
            assert_eq!(snapshot.active_tab_id.as_deref(), Some("a"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_parse_context_action_and_downloads_open() {
    let cmd = parse_command(r#"{"cmd":"context_action","tabId":"a","action":{"kind":"reload"}}"#).unwrap();
    assert_eq!(
        cmd,
        ChromeCommand::ContextAction {
            tab_id: "a".to_string(),
            action: ContextAction::Reload,
        }
    );

    let cmd = parse_command(r#"{"cmd":"downloads_open","id":"d","mode":"folder"}"#).unwrap();
    assert!(matches!(cmd, ChromeCommand::DownloadsOpen { mode: OpenMode::Folder, .. }));
}

#[rstest]
#[case("not json")]
#[case(r#"{"tabId":"a"}"#)]
#[case(r#"{"cmd":42}"#)]
#[case(r#"{"cmd":"set_setting","value":1}"#)]
fn test_parse_malformed(#[case] message: &str) {
    assert!(matches!(parse_command(message), Err(IpcError::Malformed(_))));
}

#[test]
fn test_parse_unknown_command() {
    let err = parse_command(r#"{"cmd":"launch_rockets"}"#).unwrap_err();
    assert!(matches!(err, IpcError::UnknownCommand(ref c) if c == "launch_rockets"));
}

// === Routing ===

#[test]
fn test_window_commands_apply_to_context() {
    let dir = TempDir::new().unwrap();
    let mut app = app(&dir);
    let window = app.open_window(HeadlessFactory::new(), Size::new(1280, 800));

    let reply = send(
        &mut app,
        window,
        json!({ "cmd": "tabs_state_changed", "tabs": [{ "id": "a", "url": "example.com" }], "activeTabId": "a" }),
    );
    assert_eq!(reply, Reply::None);
    let ctx = app.window(window).unwrap();
    assert_eq!(ctx.surface_count(), 1);
    assert_eq!(ctx.active_tab_id(), Some("a"));
}

#[rstest]
#[case("window_new", HostRequest::NewWindow)]
#[case("window_minimize", HostRequest::Minimize)]
#[case("window_maximize_toggle", HostRequest::ToggleMaximize)]
#[case("window_close", HostRequest::Close)]
#[case("window_always_on_top_toggle", HostRequest::ToggleAlwaysOnTop)]
#[case("window_get_state", HostRequest::GetWindowState)]
fn test_window_controls_go_to_host(#[case] cmd: &str, #[case] expected: HostRequest) {
    let dir = TempDir::new().unwrap();
    let mut app = app(&dir);
    let window = app.open_window(HeadlessFactory::new(), Size::new(1280, 800));
    assert_eq!(send(&mut app, window, json!({ "cmd": cmd })), Reply::Host(expected));
}

#[test]
fn test_prewarm_tab_command_reaches_window() {
    let dir = TempDir::new().unwrap();
    let mut app = app(&dir);
    let window = app.open_window(HeadlessFactory::new(), Size::new(1280, 800));
    send(
        &mut app,
        window,
        json!({
            "cmd": "tabs_state_changed",
            "tabs": [{ "id": "a", "url": "example.com" }, { "id": "b", "url": "rust-lang.org" }],
            "activeTabId": "a"
        }),
    );

    let reply = send(&mut app, window, json!({ "cmd": "prewarm_tab", "tabId": "b" }));
    assert_eq!(reply, Reply::None);
    let ctx = app.window(window).unwrap();
    assert!(ctx.has_surface("b"));
    assert!(ctx.has_discard_timer("b"));
}

#[rstest]
#[case(json!({ "cmd": "key_input", "kind": "keyDown", "key": "2", "code": "Digit2", "alt": true }),
       Reply::Host(HostRequest::ApplySizePreset(SizePreset::Medium)))]
#[case(json!({ "cmd": "key_input", "kind": "keyDown", "key": "1", "code": "Digit1", "alt": true, "control": true }),
       Reply::None)]
#[case(json!({ "cmd": "key_input", "kind": "keyUp", "key": "3", "code": "Digit3", "alt": true }),
       Reply::None)]
#[case(json!({ "cmd": "key_input", "kind": "keyDown", "key": "3", "code": "Digit3" }),
       Reply::None)]
fn test_chrome_key_input_selects_size_preset(#[case] message: Value, #[case] expected: Reply) {
    let dir = TempDir::new().unwrap();
    let mut app = app(&dir);
    let window = app.open_window(HeadlessFactory::new(), Size::new(1280, 800));
    assert_eq!(send(&mut app, window, message), expected);
}

#[test]
fn test_page_key_input_maps_like_chrome() {
    let input = KeyInput {
        kind: KeyEventKind::KeyDown,
        key: "1".to_string(),
        code: "Digit1".to_string(),
        alt: true,
        control: false,
        meta: false,
        shift: false,
    };
    assert_eq!(key_request(&input), Some(HostRequest::ApplySizePreset(SizePreset::Large)));
    assert_eq!(key_request(&KeyInput { alt: false, ..input }), None);
}

#[test]
fn test_settings_commands() {
    let dir = TempDir::new().unwrap();
    let mut app = app(&dir);
    let window = WindowId(99);

    let settings = value(send(&mut app, window, json!({ "cmd": "get_settings" })));
    assert_eq!(settings["discard"]["idle_timeout_secs"], json!(900));

    let ok = value(send(
        &mut app,
        window,
        json!({ "cmd": "set_setting", "key": "discard.idle_timeout_secs", "value": 60 }),
    ));
    assert_eq!(ok, json!({ "ok": true }));
    assert_eq!(app.settings().discard.idle_timeout_secs, 60);

    let bad = value(send(&mut app, window, json!({ "cmd": "set_setting", "key": "nope", "value": 1 })));
    assert_eq!(bad["ok"], json!(false));

    send(&mut app, window, json!({ "cmd": "reset_settings" }));
    assert_eq!(app.settings().discard.idle_timeout_secs, 900);
}

#[test]
fn test_bookmark_commands() {
    let dir = TempDir::new().unwrap();
    let mut app = app(&dir);
    let window = WindowId(1);

    let folder = value(send(&mut app, window, json!({ "cmd": "folder_create", "name": "Docs" })));
    assert_eq!(folder["ok"], json!(true));
    let folder_id = folder["result"]["id"].as_str().unwrap().to_string();

    let added = value(send(
        &mut app,
        window,
        json!({ "cmd": "bookmark_add", "url": "https://a.example/", "title": "A", "folder_id": folder_id }),
    ));
    assert_eq!(added["ok"], json!(true));

    let listed = value(send(&mut app, window, json!({ "cmd": "bookmark_list", "folder_id": folder_id })));
    assert_eq!(listed["result"]["bookmarks"].as_array().map(Vec::len), Some(1));

    let cyclic = value(send(
        &mut app,
        window,
        json!({ "cmd": "folder_move", "id": folder_id, "parent_id": folder_id }),
    ));
    assert_eq!(cyclic["ok"], json!(false));
    assert!(cyclic["message"].as_str().unwrap().contains("own descendant"));
}

#[test]
fn test_downloads_control_and_open() {
    let dir = TempDir::new().unwrap();
    let mut app = app(&dir);
    let window = WindowId(1);
    let id = app.download_started(HeadlessDownload::default(), download("a.zip"), None);

    let paused = value(send(&mut app, window, json!({ "cmd": "downloads_control", "id": id, "action": "pause" })));
    assert_eq!(paused, json!({ "ok": true }));
    let missing = value(send(&mut app, window, json!({ "cmd": "downloads_control", "id": "x", "action": "pause" })));
    assert_eq!(missing["ok"], json!(false));

    let open = send(
        &mut app,
        window,
        json!({ "cmd": "downloads_open", "id": "x", "filename": "a.zip", "mode": "folder" }),
    );
    assert_eq!(
        open,
        Reply::Host(HostRequest::OpenPath {
            path: dir.path().join("Downloads").join("a.zip"),
            reveal: true,
        })
    );
    let nothing = send(&mut app, window, json!({ "cmd": "downloads_open", "id": "x" }));
    assert_eq!(nothing, Reply::Value(json!(false)));
}

/// Handle for an engine that cannot cancel downloads.
struct UncancellableDownload;

impl DownloadHandle for UncancellableDownload {
    fn is_paused(&self) -> bool {
        false
    }

    fn pause(&mut self) -> Result<(), DownloadError> {
        Ok(())
    }

    fn resume(&mut self) -> Result<(), DownloadError> {
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), DownloadError> {
        Err(DownloadError::Refused("cancel".to_string()))
    }
}

#[test]
fn test_refused_download_control_reports_message() {
    let dir = TempDir::new().unwrap();
    let mut app: App<HeadlessFactory, UncancellableDownload> = App::new(AppPaths::in_dir(dir.path())).unwrap();
    let id = app.download_started(UncancellableDownload, download("a.zip"), None);

    let message = json!({ "cmd": "downloads_control", "id": id, "action": "cancel" }).to_string();
    let reply = app.handle_message(WindowId(1), &message, Instant::now()).unwrap();
    assert_eq!(
        reply,
        Reply::Value(json!({ "ok": false, "message": "Cannot cancel this download" }))
    );
}

#[test]
fn test_download_updates_follow_source_window() {
    let dir = TempDir::new().unwrap();
    let mut app = app(&dir);
    let first = app.open_window(HeadlessFactory::new(), Size::new(800, 600));
    let second = app.open_window(HeadlessFactory::new(), Size::new(800, 600));

    let id = app.download_started(HeadlessDownload::default(), download("a.zip"), Some(second));
    app.download_progress(&id, 5, 10, false);
    assert!(download_events(app.drain_events(first)).is_empty());
    assert_eq!(
        download_events(app.drain_events(second)),
        vec![DownloadStatus::Progressing, DownloadStatus::Progressing]
    );

    app.close_window(second);
    app.download_done(&id, DownloadDoneState::Completed, 10, 10);
    assert_eq!(download_events(app.drain_events(first)), vec![DownloadStatus::Completed]);
}

#[test]
fn test_download_without_source_is_broadcast() {
    let dir = TempDir::new().unwrap();
    let mut app = app(&dir);
    let first = app.open_window(HeadlessFactory::new(), Size::new(800, 600));
    let second = app.open_window(HeadlessFactory::new(), Size::new(800, 600));

    app.download_started(HeadlessDownload::default(), download("a.zip"), None);
    assert_eq!(download_events(app.drain_events(first)).len(), 1);
    assert_eq!(download_events(app.drain_events(second)).len(), 1);
}
