//! Background discard: idle timers, the media check and its late answers.

use std::time::{Duration, Instant};

use serde_json::json;

use tabshell::engine::headless::HeadlessFactory;
use tabshell::engine::MEDIA_CHECK_SCRIPT;
use tabshell::managers::window_context::WindowContext;
use tabshell::services::discard_scheduler::{DiscardPhase, DEFAULT_IDLE_DELAY};
use tabshell::types::events::ShellEvent;
use tabshell::types::geometry::Size;
use tabshell::types::settings::ShellSettings;
use tabshell::types::surface::{ScriptRequest, SurfaceEvent};
use tabshell::types::tab::{TabSnapshot, TabsSnapshot};
use tabshell::types::window::WindowId;

const RECHECK: Duration = Duration::from_secs(30);

fn tabs(active: &str) -> TabsSnapshot {
    TabsSnapshot::new(
        vec![
            TabSnapshot::new("a", "example.com"),
            TabSnapshot::new("b", "rust-lang.org"),
        ],
        Some(active),
    )
}

/// Window where `a` is in the background with an armed timer.
fn background_a(settings: &ShellSettings, now: Instant) -> WindowContext<HeadlessFactory> {
    let mut ctx = WindowContext::new(WindowId(1), HeadlessFactory::new(), settings, Size::new(1440, 920));
    ctx.apply_snapshot(tabs("a"), now);
    ctx.apply_snapshot(tabs("b"), now);
    ctx.drain_events();
    ctx
}

fn answer(ctx: &mut WindowContext<HeadlessFactory>, request: ScriptRequest, keep: bool, now: Instant) {
    ctx.handle_surface_event(
        "a",
        request.surface,
        SurfaceEvent::ScriptResult {
            request,
            result: Ok(json!({ "keep": keep })),
        },
        now,
    );
}

fn discarded(events: &[ShellEvent], tab: &str) -> bool {
    events.contains(&ShellEvent::TabDiscarded {
        tab_id: tab.to_string(),
        discarded: true,
    })
}

#[test]
fn test_nothing_fires_before_deadline() {
    let now = Instant::now();
    let mut ctx = background_a(&ShellSettings::default(), now);
    assert_eq!(ctx.next_deadline(), Some(now + DEFAULT_IDLE_DELAY));

    ctx.tick(now + DEFAULT_IDLE_DELAY - Duration::from_secs(1));
    assert!(ctx.surface("a").unwrap().scripts.is_empty());
    assert!(matches!(
        ctx.scheduler().phase("a"),
        Some(DiscardPhase::Armed { recheck: false, .. })
    ));
}

#[test]
fn test_idle_tab_without_media_is_discarded() {
    let now = Instant::now();
    let mut ctx = background_a(&ShellSettings::default(), now);
    let later = now + DEFAULT_IDLE_DELAY;
    ctx.tick(later);

    let (request, script) = ctx.surface("a").unwrap().scripts[0].clone();
    assert_eq!(script, MEDIA_CHECK_SCRIPT);
    assert_eq!(ctx.next_deadline(), Some(later + RECHECK));

    answer(&mut ctx, request, false, later);
    assert!(!ctx.has_surface("a"));
    assert!(!ctx.has_discard_timer("a"));
    assert!(discarded(&ctx.drain_events(), "a"));
    assert!(ctx.has_surface("b"));
}

#[test]
fn test_playing_media_postpones_discard() {
    let now = Instant::now();
    let mut ctx = background_a(&ShellSettings::default(), now);
    let later = now + DEFAULT_IDLE_DELAY;
    ctx.tick(later);
    let request = ctx.surface("a").unwrap().last_script().unwrap();

    answer(&mut ctx, request, true, later);
    assert!(ctx.has_surface("a"));
    assert_eq!(ctx.next_deadline(), Some(later + RECHECK));
    assert!(matches!(
        ctx.scheduler().phase("a"),
        Some(DiscardPhase::Armed { recheck: true, .. })
    ));

    ctx.tick(later + RECHECK);
    let second = ctx.surface("a").unwrap().last_script().unwrap();
    assert_ne!(request, second);
    answer(&mut ctx, second, false, later + RECHECK);
    assert!(!ctx.has_surface("a"));
}

#[test]
fn test_audible_tab_is_rearmed_without_script() {
    let now = Instant::now();
    let mut ctx = background_a(&ShellSettings::default(), now);
    ctx.surface_mut("a").unwrap().audible = true;
    let later = now + DEFAULT_IDLE_DELAY;
    ctx.tick(later);

    assert!(ctx.surface("a").unwrap().scripts.is_empty());
    assert_eq!(ctx.next_deadline(), Some(later + RECHECK));
}

#[test]
fn test_failed_media_check_injection_discards() {
    let now = Instant::now();
    let mut ctx = background_a(&ShellSettings::default(), now);
    ctx.surface_mut("a").unwrap().fail_scripts = true;
    ctx.tick(now + DEFAULT_IDLE_DELAY);

    assert!(!ctx.has_surface("a"));
    assert!(discarded(&ctx.drain_events(), "a"));
}

#[test]
fn test_media_check_error_counts_as_no_media() {
    let now = Instant::now();
    let mut ctx = background_a(&ShellSettings::default(), now);
    let later = now + DEFAULT_IDLE_DELAY;
    ctx.tick(later);
    let request = ctx.surface("a").unwrap().last_script().unwrap();
    ctx.handle_surface_event(
        "a",
        request.surface,
        SurfaceEvent::ScriptResult {
            request,
            result: Err("navigated away".into()),
        },
        later,
    );
    assert!(!ctx.has_surface("a"));
}

#[test]
fn test_unanswered_media_check_discards_after_recheck_delay() {
    let now = Instant::now();
    let mut ctx = background_a(&ShellSettings::default(), now);
    let later = now + DEFAULT_IDLE_DELAY;
    ctx.tick(later);
    let request = ctx.surface("a").unwrap().last_script().unwrap();

    // The page navigates while the media check runs, so no answer ever comes back.
    let next = SurfaceEvent::Navigated("https://example.com/next".into());
    ctx.handle_surface_event("a", request.surface, next, later);
    ctx.handle_surface_event("a", request.surface, SurfaceEvent::LoadFinished, later);
    ctx.apply_snapshot(tabs("b"), later);
    ctx.drain_events();
    assert_eq!(ctx.next_deadline(), Some(later + RECHECK));

    ctx.tick(later + RECHECK - Duration::from_secs(1));
    assert!(ctx.has_surface("a"));

    ctx.tick(later + RECHECK);
    assert!(!ctx.has_surface("a"));
    assert!(!ctx.has_discard_timer("a"));
    assert!(discarded(&ctx.drain_events(), "a"));
    assert!(ctx.has_surface("b"));

    answer(&mut ctx, request, true, later + RECHECK);
    assert!(ctx.drain_events().is_empty());
}

#[test]
fn test_activation_abandons_pending_media_check() {
    let now = Instant::now();
    let mut ctx = background_a(&ShellSettings::default(), now);
    let later = now + DEFAULT_IDLE_DELAY;
    ctx.tick(later);
    let request = ctx.surface("a").unwrap().last_script().unwrap();

    ctx.apply_snapshot(tabs("a"), later);
    assert!(!ctx.has_discard_timer("a"));
    ctx.drain_events();

    answer(&mut ctx, request, false, later);
    assert!(ctx.has_surface("a"));
    assert!(!discarded(&ctx.drain_events(), "a"));
}

#[test]
fn test_closed_tab_media_answer_is_dropped() {
    let now = Instant::now();
    let mut ctx = background_a(&ShellSettings::default(), now);
    let later = now + DEFAULT_IDLE_DELAY;
    ctx.tick(later);
    let request = ctx.surface("a").unwrap().last_script().unwrap();

    ctx.apply_snapshot(
        TabsSnapshot::new(vec![TabSnapshot::new("b", "rust-lang.org")], Some("b")),
        later,
    );
    ctx.drain_events();
    answer(&mut ctx, request, false, later);
    assert!(ctx.drain_events().is_empty());
    assert_eq!(ctx.discard_timer_count(), 0);
}

#[test]
fn test_discarded_tab_is_rebuilt_on_activation() {
    let now = Instant::now();
    let mut ctx = background_a(&ShellSettings::default(), now);
    let later = now + DEFAULT_IDLE_DELAY;
    ctx.tick(later);
    let request = ctx.surface("a").unwrap().last_script().unwrap();
    answer(&mut ctx, request, false, later);
    ctx.drain_events();

    ctx.apply_snapshot(tabs("a"), later);
    let surface = ctx.surface("a").unwrap();
    assert_ne!(surface.id, request.surface);
    assert_eq!(surface.loads, vec!["https://example.com/"]);
    assert!(ctx.drain_events().contains(&ShellEvent::TabDiscarded {
        tab_id: "a".to_string(),
        discarded: false,
    }));
    assert!(ctx.has_discard_timer("b"));
}

#[test]
fn test_configured_idle_timeout() {
    let mut settings = ShellSettings::default();
    settings.discard.idle_timeout_secs = 60;
    settings.discard.media_recheck_secs = 5;
    let now = Instant::now();
    let mut ctx = background_a(&settings, now);
    assert_eq!(ctx.next_deadline(), Some(now + Duration::from_secs(60)));

    ctx.surface_mut("a").unwrap().audible = true;
    ctx.tick(now + Duration::from_secs(60));
    assert_eq!(ctx.next_deadline(), Some(now + Duration::from_secs(65)));
}

#[test]
fn test_active_tab_is_never_discarded() {
    let now = Instant::now();
    let mut ctx = background_a(&ShellSettings::default(), now);
    ctx.tick(now + DEFAULT_IDLE_DELAY * 4);
    assert!(ctx.has_surface("b"));
    assert!(ctx.surface("b").unwrap().scripts.is_empty());
}
