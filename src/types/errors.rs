use thiserror::Error;

// === SurfaceError ===

/// Failures reported by the embedded rendering engine.
///
/// These are transient: callers log them and degrade, they never reach the user.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// The surface could not start a navigation.
    #[error("Load failed for {url}: {reason}")]
    LoadFailed { url: String, reason: String },
    /// Script injection was refused or the surface is gone.
    #[error("Script injection failed: {0}")]
    ScriptFailed(String),
    /// The owning window no longer exists.
    #[error("Window is closed")]
    WindowClosed,
    /// Any other engine-side failure.
    #[error("Engine error: {0}")]
    Engine(String),
}

// === SettingsError ===

/// Errors related to settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read or write the settings file.
    #[error("Settings IO error: {0}")]
    IoError(String),
    /// Failed to serialize or deserialize settings.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The settings key does not exist.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The value is not valid for the given key.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

// === PlacementError ===

/// Errors persisting window placement. Always swallowed by callers.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("Placement IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Placement serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// === BookmarkError ===

/// Errors related to bookmark management operations.
#[derive(Debug, Error)]
pub enum BookmarkError {
    /// Bookmark with the given ID was not found.
    #[error("Bookmark not found: {0}")]
    NotFound(String),
    /// The target folder was not found.
    #[error("Bookmark folder not found: {0}")]
    FolderNotFound(String),
    /// The move would place a folder inside itself or one of its descendants.
    #[error("Cannot move folder {folder} into its own descendant {target}")]
    CyclicMove { folder: String, target: String },
    /// Database operation failed.
    #[error("Bookmark database error: {0}")]
    DatabaseError(String),
}

// === DownloadError ===

/// User-actionable download failures; `Display` is the message shown to the user.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Download with the given ID is not tracked.
    #[error("Download not found: {0}")]
    NotFound(String),
    /// The download already finished and can no longer be controlled.
    #[error("Download already finished: {0}")]
    AlreadyFinished(String),
    /// The requested control action is not recognised.
    #[error("Unsupported download action: {0}")]
    UnsupportedAction(String),
    /// The engine cannot perform the action on this download.
    #[error("Cannot {0} this download")]
    Refused(String),
}

// === IpcError ===

/// Errors decoding a chrome message.
#[derive(Debug, Error)]
pub enum IpcError {
    /// The message is not valid JSON or does not match any command shape.
    #[error("Malformed message: {0}")]
    Malformed(String),
    /// The message names a command the shell does not handle.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}
