//! Persistent library and "last played" record.
//!
//! The core only needs the read/write contract of `LibraryStore`. `FileStore`
//! keeps everything in a single TOML document, rewritten atomically on every
//! change.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::Track;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("library store I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("library store at {} is corrupt: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to encode library store: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// Read/write contract for the persisted library, keyed by track id.
pub trait LibraryStore: Send + Sync {
    fn last_played(&self) -> Result<Option<Track>, StoreError>;
    fn save_last_played(&self, track: &Track) -> Result<(), StoreError>;
    fn all_tracks(&self) -> Result<Vec<Track>, StoreError>;
    /// Insert or replace every track in `tracks`.
    fn insert_all(&self, tracks: &[Track]) -> Result<(), StoreError>;
    fn delete(&self, track: &Track) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LibraryFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_played: Option<String>,
    #[serde(default)]
    tracks: Vec<StoredTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTrack {
    id: String,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration_ms: Option<u64>,
    path: PathBuf,
}

impl From<&Track> for StoredTrack {
    fn from(t: &Track) -> Self {
        Self {
            id: t.id.clone(),
            title: t.title.clone(),
            artist: t.artist.clone(),
            album: t.album.clone(),
            duration_ms: t.duration.map(|d| d.as_millis() as u64),
            path: t.path.clone(),
        }
    }
}

impl From<StoredTrack> for Track {
    fn from(s: StoredTrack) -> Self {
        Self {
            id: s.id,
            title: s.title,
            artist: s.artist,
            album: s.album,
            duration: s.duration_ms.map(Duration::from_millis),
            path: s.path,
        }
    }
}

pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<LibraryFile, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(LibraryFile::default()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        toml::from_str(&text).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, file: &LibraryFile) -> Result<(), StoreError> {
        let text = toml::to_string(file)?;
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, text).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }

    fn modify(&self, f: impl FnOnce(&mut LibraryFile)) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = self.read()?;
        f(&mut file);
        self.write(&file)
    }
}

fn upsert(tracks: &mut Vec<StoredTrack>, track: StoredTrack) {
    match tracks.iter_mut().find(|t| t.id == track.id) {
        Some(existing) => *existing = track,
        None => tracks.push(track),
    }
}

impl LibraryStore for FileStore {
    fn last_played(&self) -> Result<Option<Track>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let file = self.read()?;
        let Some(id) = file.last_played else {
            return Ok(None);
        };
        Ok(file
            .tracks
            .into_iter()
            .find(|t| t.id == id)
            .map(Track::from))
    }

    fn save_last_played(&self, track: &Track) -> Result<(), StoreError> {
        self.modify(|file| {
            upsert(&mut file.tracks, StoredTrack::from(track));
            file.last_played = Some(track.id.clone());
        })
    }

    fn all_tracks(&self) -> Result<Vec<Track>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read()?.tracks.into_iter().map(Track::from).collect())
    }

    fn insert_all(&self, tracks: &[Track]) -> Result<(), StoreError> {
        self.modify(|file| {
            for t in tracks {
                upsert(&mut file.tracks, StoredTrack::from(t));
            }
        })
    }

    fn delete(&self, track: &Track) -> Result<(), StoreError> {
        self.modify(|file| {
            file.tracks.retain(|t| t.id != track.id);
            if file.last_played.as_deref() == Some(track.id.as_str()) {
                file.last_played = None;
            }
        })
    }
}
