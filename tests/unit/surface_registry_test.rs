use tabshell::engine::headless::HeadlessFactory;
use tabshell::managers::surface_registry::{EventOutcome, SurfaceRegistry};
use tabshell::types::find::FindMatches;
use tabshell::types::surface::{ScriptRequest, SurfaceEvent, SurfaceId};
use tabshell::types::tab::DEFAULT_TAB_TITLE;

fn registry() -> SurfaceRegistry<HeadlessFactory> {
    SurfaceRegistry::new(HeadlessFactory::new())
}

#[test]
fn test_create_surface_is_idempotent() {
    let mut reg = registry();
    let first = reg.create_surface("a").unwrap().surface_id;
    let second = reg.create_surface("a").unwrap().surface_id;
    assert_eq!(first, second);
    assert_eq!(reg.len(), 1);
    assert_eq!(reg.factory().created, 1);
}

#[test]
fn test_refused_creation_leaves_no_entry() {
    let mut reg = SurfaceRegistry::new(HeadlessFactory {
        refuse: true,
        ..HeadlessFactory::default()
    });
    assert!(reg.create_surface("a").is_none());
    assert!(reg.is_empty());
}

#[test]
fn test_remove_surface_destroys_once() {
    let mut reg = registry();
    reg.create_surface("a").unwrap();
    assert!(reg.remove_surface("a"));
    assert!(!reg.remove_surface("a"));
    assert!(!reg.contains("a"));
}

#[test]
fn test_sync_load_skips_pending_and_current_target() {
    let mut reg = registry();
    reg.create_surface("a").unwrap();
    assert!(reg.sync_load("a", "https://example.com/"));
    assert!(!reg.sync_load("a", "https://example.com/"));

    let entry = reg.get_mut("a").unwrap();
    let id = entry.surface_id;
    entry.surface.complete_load();
    reg.handle_event("a", id, SurfaceEvent::LoadFinished);
    assert!(reg.get("a").unwrap().pending_url.is_none());
    assert!(!reg.sync_load("a", "https://example.com/"));
    assert!(reg.sync_load("a", "https://rust-lang.org/"));
    assert_eq!(
        reg.get("a").unwrap().surface.loads,
        vec!["https://example.com/", "https://rust-lang.org/"]
    );
}

#[test]
fn test_sync_load_without_surface_is_noop() {
    let mut reg = registry();
    assert!(!reg.sync_load("missing", "https://example.com/"));
}

#[test]
fn test_events_for_replaced_surface_are_stale() {
    let mut reg = registry();
    let old = reg.create_surface("a").unwrap().surface_id;
    reg.remove_surface("a");
    reg.create_surface("a").unwrap();

    let outcome = reg.handle_event("a", old, SurfaceEvent::TitleUpdated("late".into()));
    assert_eq!(outcome, EventOutcome::Stale);
    let outcome = reg.handle_event("gone", SurfaceId(99), SurfaceEvent::LoadFinished);
    assert_eq!(outcome, EventOutcome::Stale);
}

#[test]
fn test_event_outcomes() {
    let mut reg = registry();
    let id = reg.create_surface("a").unwrap().surface_id;
    let matches = FindMatches {
        matches: 3,
        active_match_ordinal: 1,
        final_update: true,
    };
    assert_eq!(
        reg.handle_event("a", id, SurfaceEvent::FindResult(matches)),
        EventOutcome::Find(matches)
    );

    let request = ScriptRequest { surface: id, id: 7 };
    assert_eq!(
        reg.handle_event(
            "a",
            id,
            SurfaceEvent::ScriptResult {
                request,
                result: Err("boom".into())
            }
        ),
        EventOutcome::Script {
            request,
            result: Err("boom".into())
        }
    );
    assert_eq!(
        reg.handle_event("a", id, SurfaceEvent::AudibleChanged(true)),
        EventOutcome::StateChanged
    );
}

#[test]
fn test_navigation_resets_favicon() {
    let mut reg = registry();
    let id = reg.create_surface("a").unwrap().surface_id;
    reg.handle_event("a", id, SurfaceEvent::FaviconUpdated(vec!["https://a.test/f.ico".into()]));
    reg.handle_event("a", id, SurfaceEvent::Navigated("https://b.test/".into()));
    assert_eq!(reg.get("a").unwrap().favicon, "");
}

#[test]
fn test_web_state_uses_fallbacks_before_commit() {
    let mut reg = registry();
    reg.create_surface("a").unwrap();
    let state = reg.web_state("a", "https://example.com/").unwrap();
    assert_eq!(state.url, "https://example.com/");
    assert_eq!(state.title, DEFAULT_TAB_TITLE);
    assert!(!state.can_go_back);
    assert!(reg.web_state("missing", "x").is_none());
}

#[test]
fn test_web_state_reflects_engine() {
    let mut reg = registry();
    reg.create_surface("a").unwrap();
    reg.sync_load("a", "https://one.test/");
    let entry = reg.get_mut("a").unwrap();
    entry.surface.complete_load();
    entry.surface.set_title("One");
    reg.sync_load("a", "https://two.test/");
    reg.get_mut("a").unwrap().surface.complete_load();

    let state = reg.web_state("a", "ignored").unwrap();
    assert_eq!(state.url, "https://two.test/");
    assert_eq!(state.title, "One");
    assert!(state.can_go_back);
    assert!(!state.can_go_forward);
}

#[test]
fn test_request_ids_are_unique() {
    let mut reg = registry();
    let id = reg.create_surface("a").unwrap().surface_id;
    let first = reg.next_request(id);
    let second = reg.next_request(id);
    assert_ne!(first, second);
    assert_eq!(first.surface, id);
}

#[test]
fn test_close_window_destroys_and_blocks_creation() {
    let mut reg = registry();
    reg.create_surface("a").unwrap();
    reg.create_surface("b").unwrap();
    reg.close_window();
    assert!(reg.is_empty());
    assert!(!reg.is_window_open());
    assert!(reg.create_surface("c").is_none());
}
