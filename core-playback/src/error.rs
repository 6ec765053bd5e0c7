//! # Playback Error Types
//!
//! Failure taxonomy for the playback session.

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors that can occur while running a playback session.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Session taxonomy
    // ========================================================================
    /// The OS audio policy refused focus; the command had no effect.
    #[error("Audio focus denied")]
    FocusDenied,

    /// The engine could not load or drive the active source.
    #[error("Engine failed to load source: {0}")]
    EngineLoadFailure(String),

    /// A command needed an active entry but the queue is empty.
    #[error("Queue is empty")]
    EmptyQueue,

    /// Media access is not granted; the session cannot run.
    #[error("Media permission unavailable: {0}")]
    PermissionUnavailable(String),

    /// A browsing client failed the access-control check.
    #[error("Unknown client: {0}")]
    UnknownClient(String),

    // ========================================================================
    // Controller state
    // ========================================================================
    /// The session entered the error state at startup and rejects transport.
    #[error("Session is in the error state")]
    SessionInErrorState,

    /// The controller task has exited.
    #[error("Playback session is closed")]
    SessionClosed,

    /// No queue entry carries this id.
    #[error("Invalid queue item: {0}")]
    InvalidQueueItem(u64),

    // ========================================================================
    // Wrapped errors
    // ========================================================================
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),
}

impl PlaybackError {
    /// Returns `true` if the error ends the session rather than a single command.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PlaybackError::PermissionUnavailable(_)
                | PlaybackError::SessionInErrorState
                | PlaybackError::SessionClosed
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
