// Tabshell state managers
// Managers own stateful collections: surfaces per window, window contexts, bookmarks, downloads.

pub mod bookmark_manager;
pub mod download_manager;
pub mod surface_registry;
pub mod window_context;
