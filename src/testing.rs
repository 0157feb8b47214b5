//! Test doubles shared by the unit tests of several modules.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::audio::{EngineError, Renderer};
use crate::config::AudioSettings;
use crate::library::{LibraryStore, StoreError, Track, TrackScanner};

pub fn track(name: &str, title: &str) -> Track {
    Track::from_path(format!("/music/{name}.flac"), title)
        .with_artist(format!("{name} artist"))
        .with_duration(Duration::from_secs(180))
}

/// Fast sampling so tests do not wait on the real one-second interval.
pub fn fast_audio() -> AudioSettings {
    AudioSettings {
        sample_interval_ms: 5,
        completion_poll_ms: 5,
        ..AudioSettings::default()
    }
}

/// Poll `cond` until it holds or a second has passed.
pub fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(1);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}

#[derive(Debug, Default)]
pub struct RendererState {
    pub loaded: Option<Track>,
    pub loads: usize,
    pub playing: bool,
    pub position: Duration,
    pub volume: Option<f32>,
    pub finished: bool,
    pub unplayable: HashSet<PathBuf>,
}

/// In-memory renderer; the test keeps a handle on its state.
#[derive(Clone, Default)]
pub struct FakeRenderer {
    pub state: Arc<Mutex<RendererState>>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, RendererState> {
        self.state.lock().unwrap()
    }

    pub fn finish(&self) {
        let mut s = self.state();
        s.finished = true;
        s.playing = false;
    }
}

impl Renderer for FakeRenderer {
    fn load(&mut self, track: &Track) -> Result<Option<Duration>, EngineError> {
        let mut s = self.state();
        if s.unplayable.contains(&track.path) {
            return Err(EngineError::Decode {
                path: track.path.clone(),
                reason: "unsupported".into(),
            });
        }
        s.loaded = Some(track.clone());
        s.loads += 1;
        s.playing = false;
        s.position = Duration::ZERO;
        s.finished = false;
        Ok(track.duration)
    }

    fn play(&mut self) {
        self.state().playing = true;
    }

    fn pause(&mut self) {
        self.state().playing = false;
    }

    fn stop(&mut self) {
        let mut s = self.state();
        s.loaded = None;
        s.playing = false;
        s.position = Duration::ZERO;
    }

    fn seek(&mut self, to: Duration) -> Result<(), EngineError> {
        self.state().position = to;
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.state().volume = Some(volume);
    }

    fn position(&self) -> Duration {
        self.state.lock().unwrap().position
    }

    fn is_finished(&self) -> bool {
        let s = self.state.lock().unwrap();
        s.loaded.is_some() && s.finished
    }
}

/// Store that keeps everything in memory and can be told to fail writes.
#[derive(Default)]
pub struct MemoryStore {
    pub tracks: Mutex<Vec<Track>>,
    pub last_played: Mutex<Option<Track>>,
    pub fail_writes: AtomicBool,
    pub inserts: AtomicUsize,
}

impl MemoryStore {
    pub fn with_tracks(tracks: Vec<Track>) -> Self {
        Self {
            tracks: Mutex::new(tracks),
            ..Self::default()
        }
    }

    fn write_error() -> StoreError {
        StoreError::Io {
            path: PathBuf::from("/memory"),
            source: std::io::Error::other("read-only"),
        }
    }
}

impl LibraryStore for MemoryStore {
    fn last_played(&self) -> Result<Option<Track>, StoreError> {
        Ok(self.last_played.lock().unwrap().clone())
    }

    fn save_last_played(&self, track: &Track) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::write_error());
        }
        *self.last_played.lock().unwrap() = Some(track.clone());
        Ok(())
    }

    fn all_tracks(&self) -> Result<Vec<Track>, StoreError> {
        Ok(self.tracks.lock().unwrap().clone())
    }

    fn insert_all(&self, tracks: &[Track]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::write_error());
        }
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let mut stored = self.tracks.lock().unwrap();
        for t in tracks {
            stored.retain(|s| s.id != t.id);
            stored.push(t.clone());
        }
        Ok(())
    }

    fn delete(&self, track: &Track) -> Result<(), StoreError> {
        self.tracks.lock().unwrap().retain(|s| s.id != track.id);
        Ok(())
    }
}

/// Scanner returning a fixed list, reporting one step per track.
#[derive(Default)]
pub struct FixedScanner {
    pub tracks: Vec<Track>,
    pub scans: AtomicUsize,
}

impl FixedScanner {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            scans: AtomicUsize::new(0),
        }
    }
}

impl TrackScanner for FixedScanner {
    fn scan(&self, progress: &mut dyn FnMut(usize, usize)) -> Vec<Track> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let total = self.tracks.len();
        for i in 0..total {
            progress(i + 1, total);
        }
        self.tracks.clone()
    }
}
