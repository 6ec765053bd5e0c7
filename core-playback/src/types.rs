//! Queue entries, published snapshots and transport commands.

use bridge_traits::playback::AudioSource;
use core_library::query::SearchHints;
use core_library::Song;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Queue
// ============================================================================

/// Identity of an entry inside the play queue.
///
/// Assigned by the queue in insertion order. Ids restart at zero whenever the
/// queue is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueItemId(pub u64);

impl fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One playable entry in the queue. Immutable once queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: QueueItemId,
    /// Browse id of the song (`song_<n>`)
    pub media_id: String,
    pub source: AudioSource,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_ms: u64,
    pub artwork: Option<String>,
}

impl QueueEntry {
    pub fn from_song(id: QueueItemId, song: &Song) -> Self {
        Self {
            id,
            media_id: song.media_id().to_string(),
            source: song.source.clone(),
            title: song.title.clone(),
            artist: song.artist.clone(),
            album: song.album.clone(),
            duration_ms: song.duration_ms,
            artwork: song.artwork.clone(),
        }
    }
}

/// Published copy of the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub entries: Vec<QueueEntry>,
    /// `-1` when the queue is empty or the session is stopped
    pub active_index: i64,
}

impl QueueSnapshot {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            active_index: -1,
        }
    }

    pub fn active(&self) -> Option<&QueueEntry> {
        usize::try_from(self.active_index)
            .ok()
            .and_then(|index| self.entries.get(index))
    }
}

impl Default for QueueSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

// ============================================================================
// Playback state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    Stopped,
    Paused,
    Playing,
    Error,
}

impl PlaybackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackStatus::Stopped => "stopped",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Error => "error",
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State, position and active entry, always published together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    pub position_ms: u64,
    pub active_queue_id: Option<QueueItemId>,
    /// Always 1.0
    pub speed: f32,
    /// User-facing message while in the error state
    pub error_message: Option<String>,
}

impl PlaybackSnapshot {
    pub fn stopped() -> Self {
        Self {
            status: PlaybackStatus::Stopped,
            position_ms: 0,
            active_queue_id: None,
            speed: 1.0,
            error_message: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self::stopped()
    }
}

/// Read-only projection of the active queue entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlayingMetadata {
    pub queue_id: QueueItemId,
    pub media_id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_ms: u64,
    pub artwork: Option<String>,
    pub source: AudioSource,
}

impl From<&QueueEntry> for NowPlayingMetadata {
    fn from(entry: &QueueEntry) -> Self {
        Self {
            queue_id: entry.id,
            media_id: entry.media_id.clone(),
            title: entry.title.clone(),
            artist: entry.artist.clone(),
            album: entry.album.clone(),
            duration_ms: entry.duration_ms,
            artwork: entry.artwork.clone(),
            source: entry.source.clone(),
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Where `Enqueue` places the new entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnqueuePlacement {
    AtEnd,
    AtNext,
}

/// Transport and queue commands accepted by the session controller.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Play,
    Pause,
    Stop,
    SeekTo(u64),
    SkipToNext,
    SkipToPrevious,
    SkipToQueueItem(QueueItemId),
    PlayFromId(String),
    PlayFromSearch { query: String, hints: SearchHints },
    Prepare,
    Enqueue { media_id: String, placement: EnqueuePlacement },
    Dequeue { media_id: String },
    Shutdown,
}

impl SessionCommand {
    pub const ENQUEUE_END: &'static str = "enqueue_end";
    pub const ENQUEUE_NEXT: &'static str = "enqueue_next";
    pub const DEQUEUE: &'static str = "dequeue";
    pub const MEDIA_ID_ARG: &'static str = "media_id";

    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::Play => "play",
            SessionCommand::Pause => "pause",
            SessionCommand::Stop => "stop",
            SessionCommand::SeekTo(_) => "seek_to",
            SessionCommand::SkipToNext => "skip_to_next",
            SessionCommand::SkipToPrevious => "skip_to_previous",
            SessionCommand::SkipToQueueItem(_) => "skip_to_queue_item",
            SessionCommand::PlayFromId(_) => "play_from_id",
            SessionCommand::PlayFromSearch { .. } => "play_from_search",
            SessionCommand::Prepare => "prepare",
            SessionCommand::Enqueue {
                placement: EnqueuePlacement::AtEnd,
                ..
            } => Self::ENQUEUE_END,
            SessionCommand::Enqueue {
                placement: EnqueuePlacement::AtNext,
                ..
            } => Self::ENQUEUE_NEXT,
            SessionCommand::Dequeue { .. } => Self::DEQUEUE,
            SessionCommand::Shutdown => "shutdown",
        }
    }

    /// Map a named custom action onto a queue command.
    ///
    /// Returns `None` for unknown names or a missing `media_id` argument.
    pub fn from_custom_action(name: &str, args: &BTreeMap<String, String>) -> Option<Self> {
        let media_id = args.get(Self::MEDIA_ID_ARG)?.clone();
        match name {
            Self::ENQUEUE_END => Some(SessionCommand::Enqueue {
                media_id,
                placement: EnqueuePlacement::AtEnd,
            }),
            Self::ENQUEUE_NEXT => Some(SessionCommand::Enqueue {
                media_id,
                placement: EnqueuePlacement::AtNext,
            }),
            Self::DEQUEUE => Some(SessionCommand::Dequeue { media_id }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(media_id: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("media_id".to_string(), media_id.to_string())])
    }

    #[test]
    fn test_custom_actions_map_to_queue_commands() {
        assert_eq!(
            SessionCommand::from_custom_action("enqueue_next", &args("song_3")),
            Some(SessionCommand::Enqueue {
                media_id: "song_3".to_string(),
                placement: EnqueuePlacement::AtNext,
            })
        );
        assert_eq!(
            SessionCommand::from_custom_action("dequeue", &args("song_3")),
            Some(SessionCommand::Dequeue {
                media_id: "song_3".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_or_incomplete_custom_actions() {
        assert_eq!(SessionCommand::from_custom_action("shuffle", &args("song_3")), None);
        assert_eq!(
            SessionCommand::from_custom_action("enqueue_end", &BTreeMap::new()),
            None
        );
    }

    #[test]
    fn test_command_names() {
        let enqueue = SessionCommand::Enqueue {
            media_id: "song_1".to_string(),
            placement: EnqueuePlacement::AtEnd,
        };
        assert_eq!(enqueue.name(), "enqueue_end");
        assert_eq!(SessionCommand::SeekTo(10).name(), "seek_to");
    }

    #[test]
    fn test_queue_snapshot_active() {
        let snapshot = QueueSnapshot::empty();
        assert!(snapshot.active().is_none());
        assert_eq!(snapshot.active_index, -1);
    }

    #[test]
    fn test_stopped_snapshot_has_unit_speed() {
        let snapshot = PlaybackSnapshot::stopped();
        assert_eq!(snapshot.speed, 1.0);
        assert!(snapshot.active_queue_id.is_none());
        assert!(!snapshot.is_playing());
    }
}
