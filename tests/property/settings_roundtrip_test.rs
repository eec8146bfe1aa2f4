//! Property-based tests for settings persistence.
//!
//! Any settings value written through the engine must load back unchanged,
//! whether it was saved whole or set key by key.

use proptest::prelude::*;
use serde_json::json;
use tempfile::TempDir;

use tabshell::services::settings_engine::{SettingsEngine, SettingsEngineTrait, SETTINGS_FILE};
use tabshell::types::geometry::Insets;
use tabshell::types::settings::{
    DiscardSettings, LayoutSettings, LoggingSettings, SearchSettings, ShellSettings, WindowSettings,
};

fn arb_settings() -> impl Strategy<Value = ShellSettings> {
    (
        (1u64..100_000, 1u64..3_600),
        (0i32..200, 0i32..200, 0i32..200, 0i32..200),
        "https://[a-z]{3,12}\\.(com|org|net)",
        (0i32..32, 0i32..32, 100i32..2000, 100i32..2000),
        "[a-z_]{1,12}=(trace|debug|info|warn|error)",
    )
        .prop_map(|(discard, padding, base_url, window, filter)| ShellSettings {
            discard: DiscardSettings {
                idle_timeout_secs: discard.0,
                media_recheck_secs: discard.1,
            },
            layout: LayoutSettings {
                padding: Insets {
                    top: padding.0,
                    left: padding.1,
                    right: padding.2,
                    bottom: padding.3,
                },
            },
            search: SearchSettings { base_url },
            window: WindowSettings {
                corner_radius: window.0,
                surface_corner_radius: window.1,
                min_width: window.2,
                min_height: window.3,
            },
            logging: LoggingSettings { filter },
        })
}

fn engine_in(dir: &TempDir) -> SettingsEngine {
    SettingsEngine::new(Some(dir.path().join(SETTINGS_FILE)))
}

// **Property: settings save/load roundtrip**
//
// *For any* settings, setting every section through `set_value` and
// reloading from disk yields the same settings.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn settings_roundtrip_through_disk(settings in arb_settings()) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut engine = engine_in(&dir);
        engine.load().expect("load should succeed without a file");

        let tree = serde_json::to_value(&settings).expect("settings serialize");
        for section in ["discard", "layout", "search", "window", "logging"] {
            engine
                .set_value(section, tree[section].clone())
                .expect("set_value should accept a whole section");
        }
        prop_assert_eq!(engine.get_settings(), &settings);

        let mut reloaded = engine_in(&dir);
        prop_assert_eq!(reloaded.load().expect("reload should succeed"), settings);
    }

    #[test]
    fn idle_timeout_roundtrip(timeout in 1u64..1_000_000) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut engine = engine_in(&dir);
        engine.load().expect("load should succeed without a file");
        engine
            .set_value("discard.idle_timeout_secs", json!(timeout))
            .expect("set_value should succeed");

        let mut reloaded = engine_in(&dir);
        let loaded = reloaded.load().expect("reload should succeed");
        prop_assert_eq!(loaded.discard.idle_timeout_secs, timeout);
        prop_assert_eq!(loaded.discard.media_recheck_secs, DiscardSettings::default().media_recheck_secs);
    }
}
