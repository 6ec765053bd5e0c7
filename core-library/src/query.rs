//! Faceted search over the catalog.

use crate::catalog::Catalog;
use crate::models::{normalize, Song};
use serde::{Deserialize, Serialize};

/// Which field a voice or text search is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchFacet {
    Artist,
    Album,
    Title,
}

/// Extra hints supplied with a search request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHints {
    pub facet: Option<SearchFacet>,
}

impl SearchHints {
    pub fn facet(facet: SearchFacet) -> Self {
        Self { facet: Some(facet) }
    }
}

/// Songs matching `query`, case-insensitive substring.
///
/// An empty query matches the whole library. Artist and album facets return
/// songs grouped the way the browse tree orders them; a title search keeps
/// library order. Without a facet every field is tried.
pub fn search(catalog: &Catalog, query: &str, hints: &SearchHints) -> Vec<Song> {
    let needle = normalize(query);
    if needle.is_empty() {
        return catalog.songs().to_vec();
    }
    let matches = |field: &str| normalize(field).contains(&needle);

    match hints.facet {
        Some(SearchFacet::Artist) => catalog
            .artists()
            .iter()
            .filter(|artist| matches(&artist.name))
            .flat_map(|artist| catalog.songs_for(&artist.songs))
            .collect(),
        Some(SearchFacet::Album) => catalog
            .albums()
            .iter()
            .filter(|album| matches(&album.title))
            .flat_map(|album| catalog.songs_for(&album.songs))
            .collect(),
        Some(SearchFacet::Title) => catalog
            .songs()
            .iter()
            .filter(|song| matches(&song.title))
            .cloned()
            .collect(),
        None => catalog
            .songs()
            .iter()
            .filter(|song| matches(&song.title) || matches(&song.artist) || matches(&song.album))
            .cloned()
            .collect(),
    }
}
