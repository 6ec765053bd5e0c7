//! Domain models for the browse catalog
//!
//! Songs, albums and artists as seen by browsing clients, plus the namespaced
//! string ids the browse tree hands out.

use bridge_traits::media_index::IndexedSong;
use bridge_traits::playback::AudioSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ID Types
// =============================================================================

/// Media index id of a song
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(pub i64);

/// Media index id of an album
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlbumId(pub i64);

/// Media index id of an artist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtistId(pub i64);

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", MediaId::SONG_PREFIX, self.0)
    }
}

impl fmt::Display for AlbumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", MediaId::ALBUM_PREFIX, self.0)
    }
}

impl fmt::Display for ArtistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", MediaId::ARTIST_PREFIX, self.0)
    }
}

/// A parsed browse id.
///
/// Well-known nodes use reserved ids; containers and leaves are the media
/// index id behind a type prefix (`album_12`, `artist_3`, `song_40`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaId {
    Root,
    Albums,
    Artists,
    Songs,
    Album(AlbumId),
    Artist(ArtistId),
    Song(SongId),
}

impl MediaId {
    pub const ROOT: &'static str = "__ROOT__";
    pub const ALBUMS: &'static str = "__ALBUMS__";
    pub const ARTISTS: &'static str = "__ARTISTS__";
    pub const SONGS: &'static str = "__SONGS__";

    pub const ALBUM_PREFIX: &'static str = "album_";
    pub const ARTIST_PREFIX: &'static str = "artist_";
    pub const SONG_PREFIX: &'static str = "song_";

    pub fn is_playable(&self) -> bool {
        matches!(self, MediaId::Song(_))
    }

    pub fn is_browsable(&self) -> bool {
        !self.is_playable()
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaId::Root => f.write_str(Self::ROOT),
            MediaId::Albums => f.write_str(Self::ALBUMS),
            MediaId::Artists => f.write_str(Self::ARTISTS),
            MediaId::Songs => f.write_str(Self::SONGS),
            MediaId::Album(id) => id.fmt(f),
            MediaId::Artist(id) => id.fmt(f),
            MediaId::Song(id) => id.fmt(f),
        }
    }
}

impl FromStr for MediaId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Self::ROOT => return Ok(MediaId::Root),
            Self::ALBUMS => return Ok(MediaId::Albums),
            Self::ARTISTS => return Ok(MediaId::Artists),
            Self::SONGS => return Ok(MediaId::Songs),
            _ => {}
        }

        let parse = |raw: &str| {
            raw.parse::<i64>()
                .map_err(|_| format!("Malformed media id: {}", s))
        };

        if let Some(raw) = s.strip_prefix(Self::ALBUM_PREFIX) {
            Ok(MediaId::Album(AlbumId(parse(raw)?)))
        } else if let Some(raw) = s.strip_prefix(Self::ARTIST_PREFIX) {
            Ok(MediaId::Artist(ArtistId(parse(raw)?)))
        } else if let Some(raw) = s.strip_prefix(Self::SONG_PREFIX) {
            Ok(MediaId::Song(SongId(parse(raw)?)))
        } else {
            Err(format!("Unknown media id: {}", s))
        }
    }
}

// =============================================================================
// Domain Models
// =============================================================================

/// Playable song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub artist_id: ArtistId,
    pub album: String,
    pub album_id: AlbumId,
    /// Position on the album, when the index knows it
    pub track_number: Option<u32>,
    pub duration_ms: u64,
    pub source: AudioSource,
    pub artwork: Option<String>,
}

impl Song {
    pub fn media_id(&self) -> MediaId {
        MediaId::Song(self.id)
    }

    /// Validate song data
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err(format!("Song {} has an empty title", self.id.0));
        }

        if let AudioSource::LocalFile { path } = &self.source {
            if path.as_os_str().is_empty() {
                return Err(format!("Song {} has an empty source path", self.id.0));
            }
        }

        Ok(())
    }
}

impl From<IndexedSong> for Song {
    fn from(song: IndexedSong) -> Self {
        Self {
            id: SongId(song.id),
            title: song.title,
            artist: song.artist,
            artist_id: ArtistId(song.artist_id),
            album: song.album,
            album_id: AlbumId(song.album_id),
            track_number: song.track_number,
            duration_ms: song.duration_ms,
            source: song.source,
            artwork: song.artwork,
        }
    }
}

/// Album grouping, songs in track order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: AlbumId,
    pub title: String,
    pub artist: String,
    pub artwork: Option<String>,
    pub songs: Vec<SongId>,
}

/// Artist grouping, songs ordered by album then track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
    pub songs: Vec<SongId>,
}

/// One row returned by `getChildren`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub is_playable: bool,
    pub is_browsable: bool,
    pub artwork: Option<String>,
}

impl MediaItem {
    pub fn category(id: MediaId, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            subtitle: None,
            is_playable: false,
            is_browsable: true,
            artwork: None,
        }
    }
}

impl From<&Song> for MediaItem {
    fn from(song: &Song) -> Self {
        Self {
            id: song.media_id().to_string(),
            title: song.title.clone(),
            subtitle: Some(song.artist.clone()),
            is_playable: true,
            is_browsable: false,
            artwork: song.artwork.clone(),
        }
    }
}

impl From<&Album> for MediaItem {
    fn from(album: &Album) -> Self {
        Self {
            id: album.id.to_string(),
            title: album.title.clone(),
            subtitle: Some(album.artist.clone()),
            is_playable: false,
            is_browsable: true,
            artwork: album.artwork.clone(),
        }
    }
}

impl From<&Artist> for MediaItem {
    fn from(artist: &Artist) -> Self {
        let count = artist.songs.len();
        Self {
            id: artist.id.to_string(),
            title: artist.name.clone(),
            subtitle: Some(format!(
                "{} song{}",
                count,
                if count == 1 { "" } else { "s" }
            )),
            is_playable: false,
            is_browsable: true,
            artwork: None,
        }
    }
}

/// Normalize a string for searching (lowercase, trimmed)
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: i64, title: &str) -> Song {
        Song {
            id: SongId(id),
            title: title.to_string(),
            artist: "Miles Davis".to_string(),
            artist_id: ArtistId(1),
            album: "Kind of Blue".to_string(),
            album_id: AlbumId(7),
            track_number: Some(1),
            duration_ms: 545_000,
            source: AudioSource::local("/music/so_what.flac"),
            artwork: None,
        }
    }

    #[test]
    fn test_media_id_round_trip_through_strings() {
        for raw in ["__ROOT__", "__ALBUMS__", "__ARTISTS__", "__SONGS__", "album_7", "artist_1", "song_42"] {
            let id: MediaId = raw.parse().unwrap();
            assert_eq!(id.to_string(), raw);
        }
    }

    #[test]
    fn test_media_id_rejects_garbage() {
        assert!("album_x".parse::<MediaId>().is_err());
        assert!("playlist_3".parse::<MediaId>().is_err());
        assert!("".parse::<MediaId>().is_err());
    }

    #[test]
    fn test_only_songs_are_playable() {
        assert!(MediaId::Song(SongId(1)).is_playable());
        assert!(MediaId::Album(AlbumId(1)).is_browsable());
        assert!(MediaId::Root.is_browsable());
    }

    #[test]
    fn test_song_validation() {
        assert!(song(1, "So What").validate().is_ok());
        assert!(song(2, "   ").validate().is_err());

        let mut pathless = song(3, "Freddie Freeloader");
        pathless.source = AudioSource::local("");
        assert!(pathless.validate().is_err());
    }

    #[test]
    fn test_media_item_projections() {
        let item = MediaItem::from(&song(4, "Blue in Green"));
        assert_eq!(item.id, "song_4");
        assert!(item.is_playable);
        assert_eq!(item.subtitle.as_deref(), Some("Miles Davis"));

        let artist = Artist {
            id: ArtistId(1),
            name: "Miles Davis".to_string(),
            songs: vec![SongId(4)],
        };
        assert_eq!(MediaItem::from(&artist).subtitle.as_deref(), Some("1 song"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Kind Of BLUE "), "kind of blue");
    }
}
