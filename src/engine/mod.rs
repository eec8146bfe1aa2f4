//! Rendering-engine capability.
//!
//! The lifecycle core never names a concrete engine type. Everything it needs
//! from a live rendering surface is expressed by [`WebSurface`], and new
//! surfaces are obtained through a [`SurfaceFactory`] owned by the window's
//! registry. The `gui` build backs these with `wry` webviews; the [`headless`]
//! engine backs them in-process for the console mode and the tests.
//!
//! Engine → core facts arrive as [`SurfaceEvent`](crate::types::surface::SurfaceEvent)s
//! delivered by the host together with the originating surface id.

pub mod headless;

use crate::types::errors::SurfaceError;
use crate::types::find::{FindOptions, StopFindAction};
use crate::types::geometry::Rect;
use crate::types::surface::{ScriptRequest, SurfaceId};

/// Script injected by the discard media check.
///
/// Resolves to `{ keep: bool }`; `keep` is true while a picture-in-picture
/// element exists or a `<video>` is playing with data beyond metadata.
pub const MEDIA_CHECK_SCRIPT: &str = r#"(() => {
  const videos = Array.from(document.querySelectorAll("video"));
  const hasPiP =
    Boolean(document.pictureInPictureElement) ||
    videos.some((v) => v.webkitPresentationMode === "picture-in-picture");
  const hasPlayingVideo = videos.some((v) => !v.paused && !v.ended && v.readyState > 1);
  return { keep: hasPiP || hasPlayingVideo };
})()"#;

/// Toggles picture-in-picture on the most prominent video of the page.
///
/// Resolves to `{ ok, active, message }`.
pub const PICTURE_IN_PICTURE_SCRIPT: &str = r#"(async () => {
  if (!document.pictureInPictureEnabled) {
    return { ok: false, active: false, message: "Picture-in-Picture is not supported on this page" };
  }
  if (document.pictureInPictureElement) {
    try {
      await document.exitPictureInPicture();
      return { ok: true, active: false, message: "Pop up player closed" };
    } catch (error) {
      return { ok: false, active: true, message: error?.message || "Cannot close pop up player" };
    }
  }
  const score = (v) => {
    const r = v.getBoundingClientRect();
    const area = r.width > 0 && r.height > 0 ? r.width * r.height : 0;
    return area + (v.readyState > 0 ? 1000000 : 0) + (!v.paused && !v.ended ? 500000 : 0);
  };
  const video = Array.from(document.querySelectorAll("video")).sort((a, b) => score(b) - score(a))[0];
  if (!video) {
    return { ok: false, active: false, message: "No video found on this page" };
  }
  try {
    if (video.disablePictureInPicture) {
      video.disablePictureInPicture = false;
      video.removeAttribute("disablePictureInPicture");
    }
    if (video.readyState === 0) {
      video.load();
    }
    await video.requestPictureInPicture();
    return { ok: true, active: true, message: "Pop up player started" };
  } catch (error) {
    if (typeof video.webkitSetPresentationMode === "function") {
      try {
        video.webkitSetPresentationMode("picture-in-picture");
        return { ok: true, active: true, message: "Pop up player started" };
      } catch (_) {}
    }
    return { ok: false, active: false, message: error?.message || "Cannot start pop up player" };
  }
})()"#;

/// One live rendering-engine instance bound to a tab.
pub trait WebSurface {
    /// Starts a navigation. Completion is reported later as
    /// `LoadFinished` / `LoadFailed`.
    fn load_url(&mut self, url: &str) -> Result<(), SurfaceError>;

    /// Committed url; empty before the first navigation commits.
    fn url(&self) -> String;
    fn title(&self) -> String;

    fn can_go_back(&self) -> bool;
    fn can_go_forward(&self) -> bool;
    fn go_back(&mut self);
    fn go_forward(&mut self);
    fn reload(&mut self);
    fn focus(&mut self);

    fn is_muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);
    /// Whether the surface is producing sound right now.
    fn is_currently_audible(&self) -> bool;

    fn set_bounds(&mut self, bounds: Rect);

    /// Injects `script`. The result arrives as a `ScriptResult` event tagged
    /// with `request`; an `Err` here means no result will ever arrive.
    fn evaluate_script(&mut self, request: ScriptRequest, script: &str)
        -> Result<(), SurfaceError>;

    fn find_in_page(&mut self, query: &str, options: FindOptions);
    fn stop_find_in_page(&mut self, action: StopFindAction);

    /// Copies the page selection to the clipboard.
    fn copy(&mut self);
    /// Pastes the clipboard into the focused editable element.
    fn paste(&mut self);

    /// Opens the engine's developer tools, if it has any.
    fn inspect(&mut self) {}

    /// Tears the surface down. Called exactly once, right before drop.
    fn destroy(&mut self);
}

/// Creates surfaces for one window.
pub trait SurfaceFactory {
    type Surface: WebSurface;

    /// Returns `None` when the owning window is gone or the engine refused.
    fn create(&mut self, tab_id: &str, id: SurfaceId) -> Option<Self::Surface>;
}
