// Tabshell services
// Stateless or self-contained logic: url normalization, layout, discard timing,
// context menus, window presentation, settings.

pub mod context_menu;
pub mod discard_scheduler;
pub mod layout_engine;
pub mod settings_engine;
pub mod url_normalizer;
pub mod window_presentation;
