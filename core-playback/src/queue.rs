//! Play queue with an active cursor.
//!
//! The cursor is `None` only while the queue is empty. Whether the session is
//! stopped is the controller's business; it hides the cursor when publishing.

use crate::types::{QueueEntry, QueueItemId, QueueSnapshot};
use core_library::Song;

#[derive(Debug, Default)]
pub struct QueueManager {
    entries: Vec<QueueEntry>,
    active: Option<usize>,
    next_id: u64,
}

impl QueueManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole queue. `active_index` is clamped into range.
    pub fn replace(&mut self, songs: &[Song], active_index: usize) {
        self.next_id = 0;
        let mut entries = Vec::with_capacity(songs.len());
        for song in songs {
            let id = self.allocate_id();
            entries.push(QueueEntry::from_song(id, song));
        }
        self.entries = entries;
        self.active = if self.entries.is_empty() {
            None
        } else {
            Some(active_index.min(self.entries.len() - 1))
        };
    }

    /// Insert at `index` (clamped to the end).
    ///
    /// The cursor keeps its numeric value even when the insertion lands
    /// before it. An empty queue gets its cursor on the new entry.
    pub fn insert(&mut self, song: &Song, index: usize) -> &QueueEntry {
        let id = self.allocate_id();
        let index = index.min(self.entries.len());
        self.entries.insert(index, QueueEntry::from_song(id, song));
        if self.active.is_none() {
            self.active = Some(0);
        }
        &self.entries[index]
    }

    pub fn push_back(&mut self, song: &Song) -> &QueueEntry {
        let end = self.entries.len();
        self.insert(song, end)
    }

    /// Insert right after the active entry.
    pub fn insert_next(&mut self, song: &Song) -> &QueueEntry {
        let index = self.active.map(|active| active + 1).unwrap_or(0);
        self.insert(song, index)
    }

    pub fn remove_by_id(&mut self, id: QueueItemId) -> Option<QueueEntry> {
        let index = self.index_of(id)?;
        Some(self.remove_at(index))
    }

    /// Remove the first entry carrying `media_id`.
    pub fn remove_by_media_id(&mut self, media_id: &str) -> Option<QueueEntry> {
        let index = self.entries.iter().position(|e| e.media_id == media_id)?;
        Some(self.remove_at(index))
    }

    fn remove_at(&mut self, index: usize) -> QueueEntry {
        let removed = self.entries.remove(index);
        self.active = match self.active {
            _ if self.entries.is_empty() => None,
            Some(active) if index < active => Some(active - 1),
            Some(active) => Some(active.min(self.entries.len() - 1)),
            None => None,
        };
        removed
    }

    pub fn has_next(&self) -> bool {
        self.active
            .map(|active| active + 1 < self.entries.len())
            .unwrap_or(false)
    }

    /// Move the cursor forward. Returns `false` at the last entry.
    pub fn advance(&mut self) -> bool {
        match self.active {
            Some(active) if active + 1 < self.entries.len() => {
                self.active = Some(active + 1);
                true
            }
            _ => false,
        }
    }

    /// Move the cursor back. Returns `false` at the first entry.
    pub fn rewind(&mut self) -> bool {
        match self.active {
            Some(active) if active > 0 => {
                self.active = Some(active - 1);
                true
            }
            _ => false,
        }
    }

    pub fn set_active(&mut self, index: usize) -> bool {
        if index < self.entries.len() {
            self.active = Some(index);
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<&QueueEntry> {
        self.active.and_then(|active| self.entries.get(active))
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn index_of(&self, id: QueueItemId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot for subscribers; `hide_cursor` publishes `-1`.
    pub fn snapshot(&self, hide_cursor: bool) -> QueueSnapshot {
        let active_index = match self.active {
            Some(active) if !hide_cursor => active as i64,
            _ => -1,
        };
        QueueSnapshot {
            entries: self.entries.clone(),
            active_index,
        }
    }

    fn allocate_id(&mut self) -> QueueItemId {
        let id = QueueItemId(self.next_id);
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::playback::AudioSource;
    use core_library::{AlbumId, ArtistId, SongId};

    fn song(id: i64) -> Song {
        Song {
            id: SongId(id),
            title: format!("Track {}", id),
            artist: "Artist".to_string(),
            artist_id: ArtistId(1),
            album: "Album".to_string(),
            album_id: AlbumId(1),
            track_number: Some(id as u32),
            duration_ms: 1_000,
            source: AudioSource::local(format!("/music/{}.mp3", id)),
            artwork: None,
        }
    }

    fn songs(ids: &[i64]) -> Vec<Song> {
        ids.iter().copied().map(song).collect()
    }

    fn media_ids(queue: &QueueManager) -> Vec<&str> {
        queue.entries().iter().map(|e| e.media_id.as_str()).collect()
    }

    #[test]
    fn test_replace_assigns_fresh_ids_and_clamps() {
        let mut queue = QueueManager::new();
        queue.replace(&songs(&[1, 2, 3]), 9);
        assert_eq!(queue.active_index(), Some(2));
        assert_eq!(queue.entries()[0].id, QueueItemId(0));

        queue.replace(&songs(&[4]), 0);
        assert_eq!(queue.entries()[0].id, QueueItemId(0));
        assert_eq!(queue.current().unwrap().media_id, "song_4");
    }

    #[test]
    fn test_replace_with_nothing_clears_cursor() {
        let mut queue = QueueManager::new();
        queue.replace(&songs(&[1]), 0);
        queue.replace(&[], 0);
        assert!(queue.current().is_none());
        assert_eq!(queue.snapshot(false).active_index, -1);
    }

    #[test]
    fn test_advance_stops_at_last_entry() {
        let mut queue = QueueManager::new();
        queue.replace(&songs(&[1, 2]), 0);
        assert!(queue.has_next());
        assert!(queue.advance());
        assert!(!queue.has_next());
        assert!(!queue.advance());
        assert_eq!(queue.active_index(), Some(1));
    }

    #[test]
    fn test_rewind_stops_at_first_entry() {
        let mut queue = QueueManager::new();
        queue.replace(&songs(&[1, 2]), 1);
        assert!(queue.rewind());
        assert!(!queue.rewind());
        assert_eq!(queue.active_index(), Some(0));
    }

    #[test]
    fn test_insert_before_cursor_keeps_index() {
        let mut queue = QueueManager::new();
        queue.replace(&songs(&[1, 2, 3]), 1);
        queue.insert(&song(9), 0);
        assert_eq!(queue.active_index(), Some(1));
        assert_eq!(queue.current().unwrap().media_id, "song_1");
    }

    #[test]
    fn test_insert_next_and_push_back() {
        let mut queue = QueueManager::new();
        queue.replace(&songs(&[1, 2, 3]), 0);
        queue.insert_next(&song(8));
        queue.push_back(&song(9));
        assert_eq!(
            media_ids(&queue),
            ["song_1", "song_8", "song_2", "song_3", "song_9"]
        );
        assert_eq!(queue.entries()[1].id, QueueItemId(3));
        assert_eq!(queue.entries()[4].id, QueueItemId(4));
    }

    #[test]
    fn test_insert_into_empty_queue_sets_cursor() {
        let mut queue = QueueManager::new();
        queue.insert_next(&song(5));
        assert_eq!(queue.active_index(), Some(0));
    }

    #[test]
    fn test_duplicates_remove_first_match() {
        let mut queue = QueueManager::new();
        queue.replace(&songs(&[1, 2, 1]), 2);
        let removed = queue.remove_by_media_id("song_1").unwrap();
        assert_eq!(removed.id, QueueItemId(0));
        assert_eq!(media_ids(&queue), ["song_2", "song_1"]);
        // Cursor follows the entry it pointed at.
        assert_eq!(queue.current().unwrap().id, QueueItemId(2));
    }

    #[test]
    fn test_removing_last_active_entry_clamps_cursor() {
        let mut queue = QueueManager::new();
        queue.replace(&songs(&[1, 2]), 1);
        queue.remove_by_id(QueueItemId(1));
        assert_eq!(queue.active_index(), Some(0));

        queue.remove_by_id(QueueItemId(0));
        assert!(queue.is_empty());
        assert_eq!(queue.active_index(), None);
        assert!(queue.remove_by_id(QueueItemId(0)).is_none());
    }

    #[test]
    fn test_set_active_rejects_out_of_range() {
        let mut queue = QueueManager::new();
        queue.replace(&songs(&[1, 2, 3]), 0);
        assert!(queue.set_active(2));
        assert!(!queue.set_active(3));
        assert_eq!(queue.active_index(), Some(2));
    }

    #[test]
    fn test_snapshot_hides_cursor_when_asked() {
        let mut queue = QueueManager::new();
        queue.replace(&songs(&[1, 2]), 1);
        assert_eq!(queue.snapshot(false).active_index, 1);
        assert_eq!(queue.snapshot(true).active_index, -1);
        assert_eq!(queue.snapshot(true).entries.len(), 2);
    }
}
