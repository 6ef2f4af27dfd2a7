//! Song data and the song library

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{chordpro, onsong};
use crate::error::{PresenterError, Result};

/// One `[chord, lyric]` pair; the chord is empty when the lyric has none
pub type ChordPair = (String, String);

/// A lyric line as a sequence of chord/lyric pairs
pub type SongLine = Vec<ChordPair>;

/// A section as authored in the song file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSection {
    pub title: String,
    #[serde(default)]
    pub lines: Vec<SongLine>,
}

/// Presentation hints stored with a song
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongPresentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_video: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default = "default_key")]
    pub key: String,
    #[serde(default = "default_tempo")]
    pub tempo: u32,
    #[serde(default = "default_time_signature", alias = "time_signature")]
    pub time_signature: String,
    #[serde(default)]
    pub ccli: String,
    #[serde(default)]
    pub sections: Vec<RawSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation: Option<SongPresentation>,
}

pub(crate) fn default_key() -> String {
    "C".to_string()
}

pub(crate) fn default_tempo() -> u32 {
    80
}

pub(crate) fn default_time_signature() -> String {
    "4/4".to_string()
}

impl Song {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            artist: String::new(),
            key: default_key(),
            tempo: default_tempo(),
            time_signature: default_time_signature(),
            ccli: String::new(),
            sections: Vec::new(),
            presentation: None,
        }
    }

    pub fn background_video(&self) -> Option<&str> {
        self.presentation.as_ref()?.background_video.as_deref()
    }
}

/// Outcome of a batch import
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Imported file paths with the id of the resulting song
    pub succeeded: Vec<(PathBuf, String)>,
    /// Failed file paths with the reason
    pub failed: Vec<(PathBuf, String)>,
}

/// Songs available to worship stacks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SongLibrary {
    songs: Vec<Song>,
}

impl SongLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_songs(songs: Vec<Song>) -> Self {
        Self { songs }
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Load `songs.json`. A missing file is an empty library.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| PresenterError::io(path, e))?;
        let songs: Vec<Song> = serde_json::from_str(&contents)?;
        info!("Loaded {} songs from {:?}", songs.len(), path);
        Ok(Self { songs })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PresenterError::io(parent, e))?;
        }
        let contents = serde_json::to_string_pretty(&self.songs)?;
        std::fs::write(path, contents).map_err(|e| PresenterError::io(path, e))?;
        Ok(())
    }

    /// Add a song, replacing any existing song with the same id
    pub fn add(&mut self, song: Song) -> &Song {
        self.songs.retain(|s| s.id != song.id);
        self.songs.push(song);
        &self.songs[self.songs.len() - 1]
    }

    /// Apply `update` to the song with `id`
    pub fn update(&mut self, id: &str, update: impl FnOnce(&mut Song)) -> Option<&Song> {
        let song = self.songs.iter_mut().find(|s| s.id == id)?;
        update(song);
        // the id is the library key
        song.id = id.to_string();
        Some(song)
    }

    pub fn delete(&mut self, id: &str) -> Option<Song> {
        let index = self.songs.iter().position(|s| s.id == id)?;
        Some(self.songs.remove(index))
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Song> {
        self.songs.iter().find(|s| s.id == id)
    }

    /// Case-insensitive substring search over title and artist
    pub fn search(&self, query: &str) -> Vec<&Song> {
        let query = query.to_lowercase();
        self.songs
            .iter()
            .filter(|s| s.title.to_lowercase().contains(&query) || s.artist.to_lowercase().contains(&query))
            .collect()
    }

    /// Parse a song file by extension and add it to the library
    pub fn import_file(&mut self, path: &Path) -> Result<&Song> {
        let content = std::fs::read_to_string(path).map_err(|e| PresenterError::io(path, e))?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Untitled");
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let song = match extension.as_str() {
            "onsong" => onsong::parse(&content, stem),
            "txt" | "pro" | "chordpro" | "cho" | "crd" => chordpro::parse(&content, stem),
            other => return Err(PresenterError::UnsupportedSongFormat(other.to_string())),
        };

        if song.sections.is_empty() {
            return Err(PresenterError::SongImport {
                path: path.to_path_buf(),
                reason: "Failed to parse song sections".to_string(),
            });
        }

        info!("Imported song {:?} from {:?}", song.title, path);
        Ok(self.add(song))
    }

    pub fn import_files(&mut self, paths: &[PathBuf]) -> ImportReport {
        let mut report = ImportReport::default();
        for path in paths {
            match self.import_file(path) {
                Ok(song) => report.succeeded.push((path.clone(), song.id.clone())),
                Err(e) => {
                    warn!("Song import failed for {:?}: {}", path, e);
                    report.failed.push((path.clone(), e.to_string()));
                }
            }
        }
        report
    }
}
