//! # Library Browse Module
//!
//! Read-only view of the device media library for browsing clients and for
//! resolving play requests into queue contents.
//!
//! ## Overview
//!
//! This module provides:
//! - A `Catalog` of songs, albums and artists loaded from the `MediaIndex` bridge
//! - The `BrowseTree` with its namespaced ids (`__ROOT__`, `album_<n>`, `song_<n>`)
//! - Resolution of a playable id into an ordered song list and start index
//! - Faceted, case-insensitive search

pub mod browse;
pub mod catalog;
pub mod error;
pub mod models;
pub mod query;

pub use browse::{BrowseTree, Resolution};
pub use catalog::Catalog;
pub use error::{LibraryError, Result};
pub use models::{Album, AlbumId, Artist, ArtistId, MediaId, MediaItem, Song, SongId};
pub use query::{search, SearchFacet, SearchHints};
