use std::path::{Path, PathBuf};
use std::time::Duration;

/// One playable audio item.
///
/// The `id` is the stable source locator (the file path rendered as a
/// string) and is what the store and the session surfaces key on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Option<Duration>,
    pub path: PathBuf,
}

impl Track {
    /// Build a track whose id is derived from `path`.
    pub fn from_path(path: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: locator(&path),
            title: title.into(),
            artist: None,
            album: None,
            duration: None,
            path,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Key used for the canonical (case-insensitive title) ordering.
    pub fn sort_key(&self) -> String {
        self.title.to_lowercase()
    }

    pub fn same_as(&self, other: &Track) -> bool {
        self.id == other.id
    }
}

pub(crate) fn locator(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
