//! Device media index bridge.
//!
//! Scanning and tagging files is the host's job (MediaStore on Android,
//! MPMediaLibrary on iOS, a SQLite index on desktop). The core only reads the
//! resulting rows on cold start to build its browse catalog.

use crate::{error::Result, playback::AudioSource, platform::PlatformSendSync};
use serde::{Deserialize, Serialize};

/// One song row as reported by the device media index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedSong {
    /// Stable numeric id assigned by the index.
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub artist_id: i64,
    pub album: String,
    pub album_id: i64,
    /// Position inside the album, when tagged.
    pub track_number: Option<u32>,
    pub duration_ms: u64,
    pub source: AudioSource,
    /// Artwork reference (URI or path), resolved by the host.
    pub artwork: Option<String>,
}

/// Read-only access to the device media index.
#[async_trait::async_trait]
pub trait MediaIndex: PlatformSendSync {
    /// Load every playable song. Ordering is not significant.
    async fn load_songs(&self) -> Result<Vec<IndexedSong>>;

    /// Number of songs currently indexed.
    async fn song_count(&self) -> Result<usize> {
        Ok(self.load_songs().await?.len())
    }
}
