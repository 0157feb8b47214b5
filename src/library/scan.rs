use std::path::{Path, PathBuf};

use lofty::prelude::*;
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::model::Track;

/// Enumerates the tracks available on this machine.
///
/// `progress` is called with `(loaded, total)` after every track so the
/// presentation can show a loading bar.
pub trait TrackScanner: Send + Sync {
    fn scan(&self, progress: &mut dyn FnMut(usize, usize)) -> Vec<Track>;
}

/// Walks a directory tree and reads tags from every audio file it finds.
pub struct DirectoryScanner {
    root: PathBuf,
    settings: LibrarySettings,
}

impl DirectoryScanner {
    pub fn new(root: impl Into<PathBuf>, settings: LibrarySettings) -> Self {
        Self {
            root: root.into(),
            settings,
        }
    }

    fn candidates(&self) -> Vec<PathBuf> {
        let settings = &self.settings;
        let mut walker = WalkDir::new(&self.root).follow_links(settings.follow_links);

        // Non-recursive = only the root directory.
        let depth_cap = if settings.recursive {
            settings.max_depth
        } else {
            Some(1)
        };
        if let Some(d) = depth_cap {
            walker = walker.max_depth(d);
        }

        walker
            .into_iter()
            .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
            .filter_map(Result::ok)
            .map(|e| e.into_path())
            .filter(|p| {
                p.is_file() && (settings.include_hidden || !is_hidden(p)) && is_audio_file(p, settings)
            })
            .collect()
    }
}

impl TrackScanner for DirectoryScanner {
    fn scan(&self, progress: &mut dyn FnMut(usize, usize)) -> Vec<Track> {
        let paths = self.candidates();
        let total = paths.len();
        log::debug!("scanning {total} audio files under {}", self.root.display());

        let mut tracks = Vec::with_capacity(total);
        for (i, path) in paths.iter().enumerate() {
            tracks.push(read_track(path));
            progress(i + 1, total);
        }
        tracks
    }
}

/// Build a `Track` from `path`, falling back to the file stem when the file
/// carries no usable tags.
pub(crate) fn read_track(path: &Path) -> Track {
    let default_title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string();

    let mut track = Track::from_path(path, default_title);

    if let Ok(tagged) = lofty::read_from_path(path) {
        track.duration = Some(tagged.properties().duration());

        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            if let Some(v) = non_blank(tag.title().as_deref()) {
                track.title = v;
            }
            track.artist = non_blank(tag.artist().as_deref());
            track.album = non_blank(tag.album().as_deref());
        }
    }

    track
}

fn non_blank(v: Option<&str>) -> Option<String> {
    v.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
