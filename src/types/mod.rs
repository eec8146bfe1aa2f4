// Tabshell shared type definitions
// Each submodule defines types used across the application.

pub mod bookmark;
pub mod download;
pub mod errors;
pub mod events;
pub mod find;
pub mod geometry;
pub mod settings;
pub mod surface;
pub mod tab;
pub mod window;
