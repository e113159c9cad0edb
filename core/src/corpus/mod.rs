//! Song corpus: the read-only store sessions pull their word lists from.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::practice::error::PracticeError;
use crate::practice::types::Song;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongSummary {
    pub id: String,
    pub title: String,
    pub words: usize,
}

#[async_trait]
pub trait SongCatalog: Send + Sync {
    async fn list(&self) -> Vec<SongSummary>;
    async fn song(&self, song_id: &str) -> Result<Arc<Song>, PracticeError>;
}

#[derive(Debug, Deserialize)]
struct SongsFile {
    #[serde(default)]
    songs: Vec<SongEntry>,
}

#[derive(Debug, Deserialize)]
struct SongEntry {
    id: String,
    title: Option<String>,
    words: Vec<String>,
}

/// Catalog held entirely in memory, keyed and listed by song id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    songs: BTreeMap<String, Arc<Song>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nursery songs shipped with the service.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.insert(Song::new(
            "twinkle",
            "Twinkle Twinkle Little Star",
            [
                "Twinkle", "twinkle", "little", "star", "how", "I", "wonder", "what", "you", "are",
            ],
        ));
        catalog.insert(Song::new(
            "abc",
            "The Alphabet Song",
            [
                "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P",
            ],
        ));
        catalog.insert(Song::new(
            "row_boat",
            "Row Row Row Your Boat",
            [
                "Row", "row", "row", "your", "boat", "gently", "down", "the", "stream",
            ],
        ));
        catalog
    }

    /// Parses a TOML document of `[[songs]]` tables with `id`, `title` and `words`.
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let parsed: SongsFile = toml::from_str(document).context("invalid songs document")?;
        let mut catalog = Self::new();
        for entry in parsed.songs {
            let title = entry.title.unwrap_or_else(|| entry.id.clone());
            catalog.insert(Song::new(entry.id, title, entry.words));
        }
        Ok(catalog)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let document = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read songs file {}", path.display()))?;
        let catalog = Self::from_toml_str(&document)
            .with_context(|| format!("failed to load songs from {}", path.display()))?;
        info!(
            target: "catalog",
            path = %path.display(),
            songs = catalog.songs.len(),
            "loaded song catalog"
        );
        Ok(catalog)
    }

    pub fn insert(&mut self, song: Song) {
        self.songs.insert(song.id.clone(), Arc::new(song));
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}

#[async_trait]
impl SongCatalog for InMemoryCatalog {
    async fn list(&self) -> Vec<SongSummary> {
        self.songs
            .values()
            .map(|song| SongSummary {
                id: song.id.clone(),
                title: song.title.clone(),
                words: song.len(),
            })
            .collect()
    }

    async fn song(&self, song_id: &str) -> Result<Arc<Song>, PracticeError> {
        self.songs
            .get(song_id)
            .cloned()
            .ok_or_else(|| PracticeError::SongNotFound(song_id.to_string()))
    }
}
