//! Playback bridge traits and supporting audio types.
//!
//! A [`PlaybackAdapter`] is the host's single-track decode/output primitive
//! (MediaPlayer on Android, AVPlayer on iOS, a cpal/symphonia pipeline on
//! desktop). It knows nothing about queues: the core prepares one source at
//! a time, drives it, and releases it. Asynchronous outcomes (end of track,
//! decoder failure) are delivered through an [`AdapterEventStream`].

use crate::{
    error::Result,
    platform::{PlatformSend, PlatformSendSync},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Locator for a playable source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AudioSource {
    /// Local file accessible to the host runtime.
    LocalFile { path: PathBuf },
    /// Remote HTTP(S) stream to be fetched by the host.
    RemoteStream {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
}

impl AudioSource {
    /// Convenience constructor for a local file.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::LocalFile { path: path.into() }
    }

    /// Determine whether the source represents remote content.
    pub fn is_remote(&self) -> bool {
        matches!(self, AudioSource::RemoteStream { .. })
    }
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioSource::LocalFile { path } => write!(f, "{}", path.display()),
            AudioSource::RemoteStream { url, .. } => write!(f, "{}", url),
        }
    }
}

/// Options supplied alongside a prepare request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackOptions {
    /// Initial playback position (defaults to start of stream).
    pub start_position: Duration,
    /// Initial volume (0.0 = muted, 1.0 = unity gain).
    pub initial_volume: f32,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            start_position: Duration::from_secs(0),
            initial_volume: 1.0,
        }
    }
}

/// Identifier for a prepared source inside a host adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackSessionId(Uuid);

impl PlaybackSessionId {
    /// Generate a new session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct an identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PlaybackSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlaybackSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The adapter's own view of a prepared source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterState {
    Idle,
    Preparing,
    Playing,
    Paused,
    Stopped,
    Completed,
    Error { message: String },
}

/// Metadata attached to a prepare request, for hosts that surface it in
/// their own media session UI.
#[derive(Debug, Clone, Default)]
pub struct PlaybackMetadata {
    /// Opaque track identifier.
    pub track_id: Option<String>,
    /// Display title for the track.
    pub title: Option<String>,
    /// Display artist string.
    pub artist: Option<String>,
    /// Album or collection name.
    pub album: Option<String>,
    /// Arbitrary extra fields (e.g., artwork URI).
    pub extra: HashMap<String, String>,
}

/// Request to prepare a single source.
#[derive(Debug, Clone)]
pub struct PlaybackRequest {
    /// Source to feed into the adapter.
    pub source: AudioSource,
    /// Playback options such as initial volume or start position.
    pub options: PlaybackOptions,
    /// Optional metadata surfaced to the host.
    pub metadata: PlaybackMetadata,
}

impl PlaybackRequest {
    /// Construct a request with default options and empty metadata.
    pub fn new(source: AudioSource) -> Self {
        Self {
            source,
            options: PlaybackOptions::default(),
            metadata: PlaybackMetadata::default(),
        }
    }

    /// Attach playback options to the request.
    pub fn with_options(mut self, options: PlaybackOptions) -> Self {
        self.options = options;
        self
    }

    /// Attach metadata to the request.
    pub fn with_metadata(mut self, metadata: PlaybackMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Asynchronous notification from the adapter about a prepared source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterEvent {
    /// The source played through to its end.
    Completed { session: PlaybackSessionId },
    /// The adapter failed while the source was playing.
    Failed {
        session: PlaybackSessionId,
        message: String,
    },
}

impl AdapterEvent {
    /// Session the event refers to.
    pub fn session(&self) -> PlaybackSessionId {
        match self {
            AdapterEvent::Completed { session } | AdapterEvent::Failed { session, .. } => *session,
        }
    }
}

/// Stream of adapter events.
#[async_trait::async_trait]
pub trait AdapterEventStream: PlatformSend {
    /// Get the next adapter event.
    ///
    /// Returns `None` when the adapter has shut down.
    async fn next(&mut self) -> Option<AdapterEvent>;
}

/// Platform playback primitive driving one prepared source at a time.
///
/// Calls may block on native audio APIs; callers run them off their event
/// loop. Implementations must tolerate `unload` for a session they have
/// already released.
#[async_trait::async_trait]
pub trait PlaybackAdapter: PlatformSendSync {
    /// Prepare a source. Returns a session identifier that subsequent control
    /// calls reference. I/O and decoder errors surface here.
    async fn prepare(&self, request: PlaybackRequest) -> Result<PlaybackSessionId>;

    /// Begin or resume playback for the provided session.
    async fn play(&self, session: PlaybackSessionId) -> Result<()>;

    /// Pause playback without releasing the session.
    async fn pause(&self, session: PlaybackSessionId) -> Result<()>;

    /// Stop playback and reset position to the start of the stream.
    async fn stop(&self, session: PlaybackSessionId) -> Result<()>;

    /// Seek to an absolute position. Adapters clamp out-of-range positions.
    async fn seek(&self, session: PlaybackSessionId, position: Duration) -> Result<()>;

    /// Adjust playback volume. Volume is normalized to `0.0..=1.0`.
    async fn set_volume(&self, session: PlaybackSessionId, volume: f32) -> Result<()>;

    /// Query the current playback position.
    async fn get_position(&self, session: PlaybackSessionId) -> Result<Duration>;

    /// Fetch the adapter's current understanding of the session state.
    async fn state(&self, session: PlaybackSessionId) -> Result<AdapterState>;

    /// Release resources associated with a session.
    async fn unload(&self, session: PlaybackSessionId) -> Result<()>;

    /// Subscribe to completion and failure notifications for all sessions.
    async fn subscribe_events(&self) -> Result<Box<dyn AdapterEventStream>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_options_default_values() {
        let opts = PlaybackOptions::default();
        assert_eq!(opts.start_position, Duration::from_secs(0));
        assert_eq!(opts.initial_volume, 1.0);
    }

    #[test]
    fn session_id_is_unique() {
        let a = PlaybackSessionId::new();
        let b = PlaybackSessionId::new();
        assert_ne!(a, b);
        assert_eq!(a, PlaybackSessionId::from_uuid(*a.as_uuid()));
    }

    #[test]
    fn audio_source_equality_drives_reload_decisions() {
        let a = AudioSource::local("/music/a.flac");
        assert_eq!(a, AudioSource::local("/music/a.flac"));
        assert_ne!(a, AudioSource::local("/music/b.flac"));
        assert!(!a.is_remote());
    }

    #[test]
    fn audio_source_serializes_with_kind_tag() {
        let source = AudioSource::RemoteStream {
            url: "https://example.com/a.mp3".to_string(),
            headers: HashMap::new(),
        };
        let json = serde_json::to_string(&source).unwrap();
        assert!(json.contains("\"kind\":\"remote_stream\""));
        let back: AudioSource = serde_json::from_str(&json).unwrap();
        assert_eq!(back, source);
    }

    #[test]
    fn adapter_event_exposes_session() {
        let session = PlaybackSessionId::new();
        let event = AdapterEvent::Failed {
            session,
            message: "decoder error".to_string(),
        };
        assert_eq!(event.session(), session);
    }
}
