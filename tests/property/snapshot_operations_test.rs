//! Property-based tests for applying tab snapshots to a window context.
//!
//! Arbitrary sequences of snapshots (tabs appearing, vanishing, switching)
//! must keep the surface set, the layout and the discard timers consistent
//! with the latest snapshot.

use std::time::Instant;

use proptest::prelude::*;

use tabshell::engine::headless::HeadlessFactory;
use tabshell::managers::window_context::WindowContext;
use tabshell::types::geometry::{Rect, Size};
use tabshell::types::settings::ShellSettings;
use tabshell::types::tab::{TabSnapshot, TabsSnapshot};
use tabshell::types::window::WindowId;

const IDS: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

/// Strategy for one snapshot: a subset of `IDS` plus an active id that may
/// or may not be present.
fn arb_snapshot() -> impl Strategy<Value = TabsSnapshot> {
    (
        proptest::collection::vec(any::<bool>(), IDS.len()),
        proptest::option::of(0..IDS.len()),
        proptest::collection::vec(prop_oneof![Just("example.com"), Just("rust-lang.org"), Just("")], IDS.len()),
    )
        .prop_map(|(present, active, urls)| {
            let tabs = IDS
                .iter()
                .zip(present)
                .zip(urls)
                .filter(|((_, keep), _)| *keep)
                .map(|((id, _), url)| TabSnapshot::new(*id, url))
                .collect();
            TabsSnapshot::new(tabs, active.map(|i| IDS[i]))
        })
}

fn context() -> WindowContext<HeadlessFactory> {
    WindowContext::new(
        WindowId(1),
        HeadlessFactory::new(),
        &ShellSettings::default(),
        Size::new(1440, 920),
    )
}

fn check_invariants(ctx: &WindowContext<HeadlessFactory>, snapshot: &TabsSnapshot) {
    let active = ctx.active_tab_id().map(str::to_string);
    if snapshot.tabs.is_empty() {
        assert_eq!(active, None);
    } else {
        assert!(active.is_some());
    }

    for id in IDS {
        let in_snapshot = snapshot.tabs.iter().any(|t| t.id == id);
        if !in_snapshot {
            assert!(!ctx.has_surface(id), "surface kept for removed tab {id}");
            assert!(!ctx.has_discard_timer(id), "timer kept for removed tab {id}");
            continue;
        }
        let is_active = active.as_deref() == Some(id);
        if is_active {
            assert!(ctx.has_surface(id), "active tab {id} has no surface");
            assert!(!ctx.has_discard_timer(id), "active tab {id} has a timer");
        } else {
            assert_eq!(ctx.has_discard_timer(id), ctx.has_surface(id));
        }
        if let Some(surface) = ctx.surface(id) {
            let expected = if is_active { ctx.content_bounds() } else { Rect::ZERO };
            assert_eq!(surface.bounds, expected, "wrong bounds for {id}");
        }
    }
    assert!(ctx.surface_count() <= snapshot.tabs.len());
}

// **Property: snapshot consistency**
//
// *For any* sequence of snapshots, only tabs in the latest snapshot keep a
// surface, only the active tab is visible, and exactly the non-active
// surfaced tabs carry discard timers.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn snapshot_sequence_keeps_invariants(
        snapshots in proptest::collection::vec(arb_snapshot(), 1..12),
    ) {
        let mut ctx = context();
        let now = Instant::now();
        for snapshot in snapshots {
            ctx.apply_snapshot(snapshot.clone(), now);
            check_invariants(&ctx, &snapshot);
        }
    }

    // **Property: repeated snapshot is a no-op for the engine**
    //
    // Re-applying the same snapshot never issues another load.
    #[test]
    fn repeated_snapshot_does_not_reload(snapshot in arb_snapshot()) {
        let mut ctx = context();
        let now = Instant::now();
        ctx.apply_snapshot(snapshot.clone(), now);
        let loads_before: Vec<usize> = IDS
            .iter()
            .map(|id| ctx.surface(id).map_or(0, |s| s.loads.len()))
            .collect();
        let surfaces_before = ctx.surface_count();

        ctx.apply_snapshot(snapshot.clone(), now);

        let loads_after: Vec<usize> = IDS
            .iter()
            .map(|id| ctx.surface(id).map_or(0, |s| s.loads.len()))
            .collect();
        prop_assert_eq!(loads_before, loads_after);
        prop_assert_eq!(surfaces_before, ctx.surface_count());
        check_invariants(&ctx, &snapshot);
    }
}
