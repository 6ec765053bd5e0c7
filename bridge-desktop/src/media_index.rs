//! Media index backed by SQLite.
//!
//! The desktop scanner (outside this crate) writes one row per song; the
//! session core reads them back on cold start through [`MediaIndex`].

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media_index::{IndexedSong, MediaIndex},
    playback::AudioSource,
};
use core_async::sync::OnceCell;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS songs (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        artist TEXT NOT NULL,
        artist_id INTEGER NOT NULL,
        album TEXT NOT NULL,
        album_id INTEGER NOT NULL,
        track_number INTEGER,
        duration_ms INTEGER NOT NULL,
        location TEXT NOT NULL,
        artwork TEXT
    )
"#;

/// SQLite-backed [`MediaIndex`].
///
/// The connection pool is opened on first use, so the index can be built
/// from synchronous configuration code.
pub struct SqliteMediaIndex {
    db_path: Option<PathBuf>,
    options: SqliteConnectOptions,
    max_connections: u32,
    pool: OnceCell<SqlitePool>,
}

impl SqliteMediaIndex {
    /// Open (creating if needed) the index database at `db_path`.
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        let index = Self::open_lazy(db_path);
        index.pool().await?;
        Ok(index)
    }

    /// Describe the index without touching the database until first use.
    pub fn open_lazy(db_path: PathBuf) -> Self {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);
        Self {
            db_path: Some(db_path),
            options,
            max_connections: 4,
            pool: OnceCell::new(),
        }
    }

    /// In-memory index (for testing).
    pub async fn in_memory() -> Result<Self> {
        // One connection, otherwise every pooled connection gets its own
        // empty in-memory database.
        let index = Self {
            db_path: None,
            options: SqliteConnectOptions::new().in_memory(true),
            max_connections: 1,
            pool: OnceCell::new(),
        };
        index.pool().await?;
        Ok(index)
    }

    /// Default on-disk location under the user's data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("media-session")
            .join("index.db")
    }

    /// Insert or replace a song row.
    pub async fn upsert_song(&self, song: &IndexedSong) -> Result<()> {
        let pool = self.pool().await?;
        sqlx::query(
            r#"
            INSERT INTO songs (id, title, artist, artist_id, album, album_id,
                               track_number, duration_ms, location, artwork)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                artist = excluded.artist,
                artist_id = excluded.artist_id,
                album = excluded.album,
                album_id = excluded.album_id,
                track_number = excluded.track_number,
                duration_ms = excluded.duration_ms,
                location = excluded.location,
                artwork = excluded.artwork
            "#,
        )
        .bind(song.id)
        .bind(&song.title)
        .bind(&song.artist)
        .bind(song.artist_id)
        .bind(&song.album)
        .bind(song.album_id)
        .bind(song.track_number.map(i64::from))
        .bind(song.duration_ms as i64)
        .bind(encode_location(&song.source))
        .bind(song.artwork.as_deref())
        .execute(pool)
        .await
        .map_err(|e| BridgeError::DatabaseError(format!("Failed to store song: {}", e)))?;
        Ok(())
    }

    async fn pool(&self) -> Result<&SqlitePool> {
        self.pool
            .get_or_try_init(|| async {
                if let Some(parent) = self.db_path.as_deref().and_then(Path::parent) {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(BridgeError::Io)?;
                }

                let pool = SqlitePoolOptions::new()
                    .max_connections(self.max_connections)
                    .connect_with(self.options.clone())
                    .await
                    .map_err(|e| {
                        BridgeError::DatabaseError(format!("Failed to connect to DB: {}", e))
                    })?;

                sqlx::query(SCHEMA).execute(&pool).await.map_err(|e| {
                    BridgeError::DatabaseError(format!("Failed to create table: {}", e))
                })?;

                debug!(path = ?self.db_path, "Opened media index");
                Ok(pool)
            })
            .await
    }
}

fn encode_location(source: &AudioSource) -> String {
    match source {
        AudioSource::LocalFile { path } => path.to_string_lossy().into_owned(),
        AudioSource::RemoteStream { url, .. } => url.clone(),
    }
}

fn decode_location(location: String) -> AudioSource {
    if location.starts_with("http://") || location.starts_with("https://") {
        AudioSource::RemoteStream {
            url: location,
            headers: HashMap::new(),
        }
    } else {
        AudioSource::LocalFile {
            path: PathBuf::from(location),
        }
    }
}

fn song_from_row(row: SqliteRow) -> std::result::Result<IndexedSong, sqlx::Error> {
    let track_number: Option<i64> = row.try_get("track_number")?;
    let duration_ms: i64 = row.try_get("duration_ms")?;
    Ok(IndexedSong {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        artist: row.try_get("artist")?,
        artist_id: row.try_get("artist_id")?,
        album: row.try_get("album")?,
        album_id: row.try_get("album_id")?,
        track_number: track_number.and_then(|n| u32::try_from(n).ok()),
        duration_ms: duration_ms.max(0) as u64,
        source: decode_location(row.try_get("location")?),
        artwork: row.try_get("artwork")?,
    })
}

#[async_trait]
impl MediaIndex for SqliteMediaIndex {
    #[instrument(skip(self))]
    async fn load_songs(&self) -> Result<Vec<IndexedSong>> {
        let pool = self.pool().await?;
        let rows = sqlx::query("SELECT * FROM songs ORDER BY id")
            .fetch_all(pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to load songs: {}", e)))?;

        let songs = rows
            .into_iter()
            .map(song_from_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| BridgeError::DatabaseError(format!("Malformed song row: {}", e)))?;

        debug!(count = songs.len(), "Loaded songs from media index");
        Ok(songs)
    }

    async fn song_count(&self) -> Result<usize> {
        let pool = self.pool().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs")
            .fetch_one(pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to count songs: {}", e)))?;
        Ok(count.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: i64, title: &str, location: &str) -> IndexedSong {
        IndexedSong {
            id,
            title: title.to_string(),
            artist: "Artist".to_string(),
            artist_id: 1,
            album: "Album".to_string(),
            album_id: 10,
            track_number: Some(id as u32),
            duration_ms: 180_000,
            source: decode_location(location.to_string()),
            artwork: None,
        }
    }

    #[tokio::test]
    async fn stores_and_loads_songs_in_id_order() {
        let index = SqliteMediaIndex::in_memory().await.unwrap();
        index.upsert_song(&song(2, "Second", "/music/2.flac")).await.unwrap();
        index.upsert_song(&song(1, "First", "/music/1.flac")).await.unwrap();

        let songs = index.load_songs().await.unwrap();
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].title, "First");
        assert_eq!(songs[1].source, AudioSource::local("/music/2.flac"));
        assert_eq!(index.song_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_row() {
        let index = SqliteMediaIndex::in_memory().await.unwrap();
        index.upsert_song(&song(1, "Old", "/music/1.flac")).await.unwrap();
        index.upsert_song(&song(1, "New", "/music/1.flac")).await.unwrap();

        let songs = index.load_songs().await.unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].title, "New");
    }

    #[tokio::test]
    async fn remote_locations_round_trip_as_streams() {
        let index = SqliteMediaIndex::in_memory().await.unwrap();
        index
            .upsert_song(&song(7, "Stream", "https://example.com/7.mp3"))
            .await
            .unwrap();

        let songs = index.load_songs().await.unwrap();
        assert!(songs[0].source.is_remote());
    }

    #[tokio::test]
    async fn empty_index_loads_nothing() {
        let index = SqliteMediaIndex::in_memory().await.unwrap();
        assert!(index.load_songs().await.unwrap().is_empty());
    }
}
