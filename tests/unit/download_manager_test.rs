use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rstest::rstest;

use tabshell::engine::headless::HeadlessDownload;
use tabshell::managers::download_manager::{
    unique_save_path, DownloadHandle, DownloadTracker, DownloadTrackerTrait,
};
use tabshell::types::download::{DownloadDoneState, DownloadStart, DownloadStatus};
use tabshell::types::errors::DownloadError;
use tabshell::types::window::WindowId;

/// Handle whose calls stay visible after the tracker takes ownership.
#[derive(Clone, Default)]
struct SharedHandle {
    calls: Rc<RefCell<Vec<&'static str>>>,
    paused: Rc<RefCell<bool>>,
}

impl DownloadHandle for SharedHandle {
    fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    fn pause(&mut self) -> Result<(), DownloadError> {
        self.calls.borrow_mut().push("pause");
        *self.paused.borrow_mut() = true;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), DownloadError> {
        self.calls.borrow_mut().push("resume");
        *self.paused.borrow_mut() = false;
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), DownloadError> {
        self.calls.borrow_mut().push("cancel");
        Ok(())
    }
}

/// Engine without download control.
struct FixedHandle;

impl DownloadHandle for FixedHandle {
    fn is_paused(&self) -> bool {
        false
    }

    fn pause(&mut self) -> Result<(), DownloadError> {
        Err(DownloadError::Refused("pause".to_string()))
    }

    fn resume(&mut self) -> Result<(), DownloadError> {
        Err(DownloadError::Refused("resume".to_string()))
    }

    fn cancel(&mut self) -> Result<(), DownloadError> {
        Err(DownloadError::Refused("cancel".to_string()))
    }
}

fn start(save_path: &str) -> DownloadStart {
    DownloadStart {
        url: "https://example.com/file.zip".to_string(),
        filename: "file.zip".to_string(),
        save_path: save_path.to_string(),
        total_bytes: 100,
    }
}

#[test]
fn test_start_reports_progressing() {
    let mut tracker = DownloadTracker::new();
    let update = tracker.start(HeadlessDownload::default(), start(""), Some(WindowId(3)));
    assert_eq!(update.status, DownloadStatus::Progressing);
    assert_eq!(update.received_bytes, 0);
    assert_eq!(update.total_bytes, 100);
    assert_eq!(tracker.len(), 1);
    assert_eq!(tracker.source_window(&update.id), Some(WindowId(3)));
    assert_eq!(tracker.get_download(&update.id), Some(&update));
}

#[test]
fn test_update_status() {
    let mut tracker = DownloadTracker::new();
    let id = tracker.start(HeadlessDownload::default(), start(""), None).id;

    let progressing = tracker.update(&id, 40, 100, false).unwrap();
    assert_eq!(progressing.status, DownloadStatus::Progressing);
    assert_eq!(progressing.received_bytes, 40);

    let interrupted = tracker.update(&id, 50, 100, true).unwrap();
    assert_eq!(interrupted.status, DownloadStatus::Interrupted);

    tracker.control(&id, "pause").unwrap();
    let paused = tracker.update(&id, 60, 100, true).unwrap();
    assert_eq!(paused.status, DownloadStatus::Paused);
}

#[rstest]
#[case(DownloadDoneState::Completed, DownloadStatus::Completed)]
#[case(DownloadDoneState::Cancelled, DownloadStatus::Cancelled)]
#[case(DownloadDoneState::Interrupted, DownloadStatus::Interrupted)]
fn test_finish_maps_state(#[case] state: DownloadDoneState, #[case] expected: DownloadStatus) {
    let mut tracker = DownloadTracker::new();
    let id = tracker.start(HeadlessDownload::default(), start(""), None).id;
    let done = tracker.finish(&id, state, 100, 100).unwrap();
    assert_eq!(done.status, expected);
    assert_eq!(done.filename, "file.zip");
}

#[test]
fn test_finished_download_rejects_further_reports() {
    let mut tracker = DownloadTracker::new();
    let id = tracker.start(HeadlessDownload::default(), start(""), None).id;
    tracker.finish(&id, DownloadDoneState::Completed, 100, 100).unwrap();

    assert!(matches!(tracker.update(&id, 1, 1, false), Err(DownloadError::AlreadyFinished(_))));
    assert!(matches!(
        tracker.finish(&id, DownloadDoneState::Completed, 1, 1),
        Err(DownloadError::AlreadyFinished(_))
    ));
    assert!(matches!(tracker.control(&id, "cancel"), Err(DownloadError::AlreadyFinished(_))));
    assert_eq!(tracker.get_download(&id).map(|d| d.status), Some(DownloadStatus::Completed));
}

#[test]
fn test_unknown_download() {
    let mut tracker: DownloadTracker<HeadlessDownload> = DownloadTracker::new();
    assert!(matches!(tracker.update("x", 1, 1, false), Err(DownloadError::NotFound(_))));
    assert!(matches!(tracker.control("x", "pause"), Err(DownloadError::NotFound(_))));
    assert_eq!(tracker.source_window("x"), None);
}

#[test]
fn test_control_forwards_to_handle() {
    let handle = SharedHandle::default();
    let calls = handle.calls.clone();
    let mut tracker = DownloadTracker::new();
    let id = tracker.start(handle, start(""), None).id;

    tracker.control(&id, "pause").unwrap();
    tracker.control(&id, "pause").unwrap();
    tracker.control(&id, "resume").unwrap();
    tracker.control(&id, "resume").unwrap();
    tracker.control(&id, "cancel").unwrap();

    assert_eq!(*calls.borrow(), vec!["pause", "resume", "cancel"]);
}

#[rstest]
#[case("pause", "Cannot pause this download")]
#[case("cancel", "Cannot cancel this download")]
fn test_engine_refusal_is_reported(#[case] action: &str, #[case] message: &str) {
    let mut tracker = DownloadTracker::new();
    let id = tracker.start(FixedHandle, start(""), None).id;
    let err = tracker.control(&id, action).unwrap_err();
    assert!(matches!(err, DownloadError::Refused(_)));
    assert_eq!(err.to_string(), message);
    assert_eq!(tracker.get_download(&id).map(|d| d.status), Some(DownloadStatus::Progressing));
}

#[test]
fn test_resume_of_running_download_is_noop() {
    let mut tracker = DownloadTracker::new();
    let id = tracker.start(FixedHandle, start(""), None).id;
    tracker.control(&id, "resume").unwrap();
}

#[test]
fn test_unsupported_action() {
    let mut tracker = DownloadTracker::new();
    let id = tracker.start(HeadlessDownload::default(), start(""), None).id;
    let err = tracker.control(&id, "explode").unwrap_err();
    assert!(matches!(err, DownloadError::UnsupportedAction(ref a) if a == "explode"));
}

#[test]
fn test_open_target_precedence() {
    let mut tracker = DownloadTracker::new();
    let dir = Path::new("/downloads");
    let tracked = tracker.start(HeadlessDownload::default(), start("/saved/file.zip"), None).id;
    let untracked_path = tracker.start(HeadlessDownload::default(), start(""), None).id;

    assert_eq!(
        tracker.resolve_open_target(&tracked, "/hint/file.zip", "file.zip", dir),
        Some(PathBuf::from("/saved/file.zip"))
    );
    assert_eq!(
        tracker.resolve_open_target(&untracked_path, "/hint/file.zip", "file.zip", dir),
        Some(PathBuf::from("/hint/file.zip"))
    );
    assert_eq!(
        tracker.resolve_open_target("unknown", "", "other.zip", dir),
        Some(dir.join("other.zip"))
    );
    assert_eq!(tracker.resolve_open_target("unknown", "", "", dir), None);
}

#[test]
fn test_same_url_downloads_resolve_by_save_path() {
    let mut tracker = DownloadTracker::new();
    let first = tracker.start(HeadlessDownload::default(), start("/dl/file.zip"), None).id;
    let second = tracker.start(HeadlessDownload::default(), start("/dl/file (1).zip"), None).id;
    let url = "https://example.com/file.zip";

    assert_eq!(tracker.running_download(Some("/dl/file (1).zip"), url), Some(second.clone()));
    assert_eq!(tracker.running_download(Some("/dl/file.zip"), url), Some(first.clone()));

    tracker.finish(&first, DownloadDoneState::Completed, 100, 100).unwrap();
    assert_eq!(tracker.running_download(Some("/dl/file.zip"), url), None);
    // No path reported: the remaining download of that url.
    assert_eq!(tracker.running_download(None, url), Some(second));
    assert_eq!(tracker.running_download(None, "https://other.example/"), None);
}

#[test]
fn test_unique_save_path_numbers_taken_names() {
    let dir = Path::new("/dl");
    let taken: HashSet<PathBuf> = [dir.join("file.zip"), dir.join("file (1).zip"), dir.join("notes")]
        .into_iter()
        .collect();
    let in_use = |p: &Path| taken.contains(p);

    assert_eq!(unique_save_path(dir, "other.zip", in_use), dir.join("other.zip"));
    assert_eq!(unique_save_path(dir, "file.zip", in_use), dir.join("file (2).zip"));
    assert_eq!(unique_save_path(dir, "notes", in_use), dir.join("notes (1)"));
}
