//! Tabshell UI host.
//!
//! Uses `tao` for windows and `wry` for the embedded engine:
//! - Windows: WebView2
//! - Linux: WebKitGTK
//! - macOS: WKWebView
//!
//! Each window hosts one chrome webview (tab strip and address bar, which
//! also owns the tab store) plus one child webview per live tab surface.
//! Chrome and surfaces talk to the core through wry IPC.

mod chrome;
pub mod surface;
pub mod webview_app;
