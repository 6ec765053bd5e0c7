//! In-memory catalog built from the device media index.
//!
//! The catalog is loaded once per cold start and never mutated afterwards;
//! callers share it behind an `Arc`.

use crate::error::Result;
use crate::models::{normalize, Album, AlbumId, Artist, ArtistId, Song, SongId};
use bridge_traits::media_index::{IndexedSong, MediaIndex};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Library order: title, then id
    songs: Vec<Song>,
    song_positions: HashMap<SongId, usize>,
    /// Title order
    albums: Vec<Album>,
    /// Name order
    artists: Vec<Artist>,
}

impl Catalog {
    /// An empty catalog, used when the library could not be read.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read every song from the media index and group it.
    #[instrument(skip(index))]
    pub async fn load(index: &dyn MediaIndex) -> Result<Self> {
        let rows = index.load_songs().await?;
        debug!(rows = rows.len(), "Loaded media index rows");
        Ok(Self::from_indexed(rows))
    }

    /// Build a catalog from index rows. Invalid rows are skipped.
    pub fn from_indexed(rows: Vec<IndexedSong>) -> Self {
        let mut songs: Vec<Song> = rows
            .into_iter()
            .map(Song::from)
            .filter(|song| match song.validate() {
                Ok(()) => true,
                Err(reason) => {
                    warn!(%reason, "Skipping media index row");
                    false
                }
            })
            .collect();

        songs.sort_by(|a, b| {
            normalize(&a.title)
                .cmp(&normalize(&b.title))
                .then(a.id.cmp(&b.id))
        });
        songs.dedup_by_key(|song| song.id);

        let song_positions = songs
            .iter()
            .enumerate()
            .map(|(pos, song)| (song.id, pos))
            .collect();

        let albums = group_albums(&songs);
        let artists = group_artists(&songs);

        Self {
            songs,
            song_positions,
            albums,
            artists,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn albums(&self) -> &[Album] {
        &self.albums
    }

    pub fn artists(&self) -> &[Artist] {
        &self.artists
    }

    pub fn song(&self, id: SongId) -> Option<&Song> {
        self.song_positions.get(&id).map(|&pos| &self.songs[pos])
    }

    pub fn album(&self, id: AlbumId) -> Option<&Album> {
        self.albums.iter().find(|album| album.id == id)
    }

    pub fn artist(&self, id: ArtistId) -> Option<&Artist> {
        self.artists.iter().find(|artist| artist.id == id)
    }

    /// Songs for a list of ids, skipping ids the catalog doesn't know.
    pub fn songs_for(&self, ids: &[SongId]) -> Vec<Song> {
        ids.iter().filter_map(|id| self.song(*id)).cloned().collect()
    }
}

fn group_albums(songs: &[Song]) -> Vec<Album> {
    let mut by_id: HashMap<AlbumId, (Album, Vec<&Song>)> = HashMap::new();
    for song in songs {
        let entry = by_id.entry(song.album_id).or_insert_with(|| {
            (
                Album {
                    id: song.album_id,
                    title: song.album.clone(),
                    artist: song.artist.clone(),
                    artwork: song.artwork.clone(),
                    songs: Vec::new(),
                },
                Vec::new(),
            )
        });
        entry.1.push(song);
    }

    let mut albums: Vec<Album> = by_id
        .into_values()
        .map(|(mut album, mut tracks)| {
            tracks.sort_by_key(|song| (song.track_number.unwrap_or(u32::MAX), song.id));
            album.songs = tracks.into_iter().map(|song| song.id).collect();
            album
        })
        .collect();
    albums.sort_by(|a, b| normalize(&a.title).cmp(&normalize(&b.title)).then(a.id.cmp(&b.id)));
    albums
}

fn group_artists(songs: &[Song]) -> Vec<Artist> {
    let mut by_id: HashMap<ArtistId, (String, Vec<&Song>)> = HashMap::new();
    for song in songs {
        by_id
            .entry(song.artist_id)
            .or_insert_with(|| (song.artist.clone(), Vec::new()))
            .1
            .push(song);
    }

    let mut artists: Vec<Artist> = by_id
        .into_iter()
        .map(|(id, (name, mut tracks))| {
            tracks.sort_by(|a, b| {
                normalize(&a.album)
                    .cmp(&normalize(&b.album))
                    .then(a.track_number.unwrap_or(u32::MAX).cmp(&b.track_number.unwrap_or(u32::MAX)))
                    .then(a.id.cmp(&b.id))
            });
            Artist {
                id,
                name,
                songs: tracks.into_iter().map(|song| song.id).collect(),
            }
        })
        .collect();
    artists.sort_by(|a, b| normalize(&a.name).cmp(&normalize(&b.name)).then(a.id.cmp(&b.id)));
    artists
}
