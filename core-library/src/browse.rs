//! Browse tree over the catalog.
//!
//! ```text
//! __ROOT__
//! ├── __ALBUMS__  → album_<n>  → song_<n>
//! ├── __ARTISTS__ → artist_<n> → song_<n>
//! └── __SONGS__   → song_<n>
//! ```

use crate::catalog::Catalog;
use crate::error::{LibraryError, Result};
use crate::models::{MediaId, MediaItem, Song, SongId};
use std::sync::Arc;
use tracing::debug;

/// An ordered set of songs to queue, plus which one plays first.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub songs: Vec<Song>,
    pub active_index: usize,
}

impl Resolution {
    fn starting_at_first(songs: Vec<Song>) -> Option<Self> {
        if songs.is_empty() {
            None
        } else {
            Some(Self {
                songs,
                active_index: 0,
            })
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrowseTree {
    catalog: Arc<Catalog>,
}

impl BrowseTree {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Children of `parent_id`, in display order. Unknown or malformed ids,
    /// and leaves, have no children.
    pub fn get_children(&self, parent_id: &str) -> Vec<MediaItem> {
        let parent = match parent_id.parse::<MediaId>() {
            Ok(id) => id,
            Err(reason) => {
                debug!(%reason, "Browse request for unknown parent");
                return Vec::new();
            }
        };

        match parent {
            MediaId::Root => vec![
                MediaItem::category(MediaId::Albums, "Albums"),
                MediaItem::category(MediaId::Artists, "Artists"),
                MediaItem::category(MediaId::Songs, "Songs"),
            ],
            MediaId::Albums => self.catalog.albums().iter().map(MediaItem::from).collect(),
            MediaId::Artists => self.catalog.artists().iter().map(MediaItem::from).collect(),
            MediaId::Songs => self.catalog.songs().iter().map(MediaItem::from).collect(),
            MediaId::Album(id) => self
                .catalog
                .album(id)
                .map(|album| self.items_for(&album.songs))
                .unwrap_or_default(),
            MediaId::Artist(id) => self
                .catalog
                .artist(id)
                .map(|artist| self.items_for(&artist.songs))
                .unwrap_or_default(),
            MediaId::Song(_) => Vec::new(),
        }
    }

    /// Resolve a play request into queue contents.
    ///
    /// `__SONGS__` plays the whole library, containers play their songs from
    /// the top, and a single song plays inside its album starting at that
    /// song. Returns `None` when nothing playable sits behind the id.
    pub fn resolve(&self, media_id: &str) -> Option<Resolution> {
        let id = media_id.parse::<MediaId>().ok()?;

        match id {
            MediaId::Songs => Resolution::starting_at_first(self.catalog.songs().to_vec()),
            MediaId::Album(album_id) => {
                let album = self.catalog.album(album_id)?;
                Resolution::starting_at_first(self.catalog.songs_for(&album.songs))
            }
            MediaId::Artist(artist_id) => {
                let artist = self.catalog.artist(artist_id)?;
                Resolution::starting_at_first(self.catalog.songs_for(&artist.songs))
            }
            MediaId::Song(song_id) => {
                let song = self.catalog.song(song_id)?;
                let siblings = self
                    .catalog
                    .album(song.album_id)
                    .map(|album| self.catalog.songs_for(&album.songs))
                    .unwrap_or_default();

                match siblings.iter().position(|s| s.id == song_id) {
                    Some(active_index) => Some(Resolution {
                        songs: siblings,
                        active_index,
                    }),
                    None => Resolution::starting_at_first(vec![song.clone()]),
                }
            }
            MediaId::Root | MediaId::Albums | MediaId::Artists => None,
        }
    }

    /// Look up a single playable song by its browse id.
    pub fn playable(&self, media_id: &str) -> Result<Song> {
        let id = media_id
            .parse::<MediaId>()
            .map_err(|reason| LibraryError::MalformedId {
                id: media_id.to_string(),
                reason,
            })?;

        let MediaId::Song(song_id) = id else {
            return Err(LibraryError::NotPlayable(media_id.to_string()));
        };

        self.catalog
            .song(song_id)
            .cloned()
            .ok_or_else(|| LibraryError::NotFound {
                kind: "song",
                id: media_id.to_string(),
            })
    }

    fn items_for(&self, ids: &[SongId]) -> Vec<MediaItem> {
        ids.iter()
            .filter_map(|id| self.catalog.song(*id))
            .map(MediaItem::from)
            .collect()
    }
}
