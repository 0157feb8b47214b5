//! Playback coordinator.
//!
//! The coordinator owns the playlist (canonical and shuffled order), the
//! "last played" record and the observable state the presentation renders.
//! It is the only caller of the audio engine: user commands, engine events
//! and changes other surfaces write into the `Authority` all end up here
//! and are applied while holding the engine lock.
//!
//! - `view`: observable state (`PlayerView`) and the progress fraction
//! - `pump`: the thread that applies engine events and authority changes
//! - `worker`: background I/O (last-played writes)

mod pump;
mod view;
mod worker;

pub use view::{PlayerView, progress_fraction};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use rand::thread_rng;

use crate::audio::{AudioEngine, EngineEvent, PlayOutcome, UNKNOWN_DURATION};
use crate::authority::Authority;
use crate::library::{LibraryStore, Playlist, Track, TrackScanner};

use worker::BackgroundWorker;

pub struct Coordinator {
    engine: Mutex<AudioEngine>,
    playlist: Mutex<Playlist>,
    authority: Authority,
    store: Arc<dyn LibraryStore>,
    scanner: Arc<dyn TrackScanner>,
    view: PlayerView,
    worker: BackgroundWorker,
    shutdown: Mutex<Option<Sender<()>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Coordinator {
    /// Take ownership of the engine and start applying its events.
    pub fn start(
        engine: AudioEngine,
        events: Receiver<EngineEvent>,
        authority: Authority,
        store: Arc<dyn LibraryStore>,
        scanner: Arc<dyn TrackScanner>,
    ) -> Arc<Self> {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        let changes = authority.subscribe();

        let coordinator = Arc::new(Self {
            engine: Mutex::new(engine),
            playlist: Mutex::new(Playlist::default()),
            authority,
            store,
            scanner,
            view: PlayerView::default(),
            worker: BackgroundWorker::spawn("last-played"),
            shutdown: Mutex::new(Some(shutdown_tx)),
            pump: Mutex::new(None),
        });

        let handle = pump::spawn(
            Arc::downgrade(&coordinator),
            events,
            changes,
            shutdown_rx,
        );
        *lock(&coordinator.pump) = handle;
        coordinator
    }

    pub fn view(&self) -> &PlayerView {
        &self.view
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Tracks in the active order.
    pub fn tracks(&self) -> Vec<Track> {
        lock(&self.playlist).active().cloned().collect()
    }

    pub fn current(&self) -> Option<Track> {
        self.authority.current()
    }

    pub fn is_playing(&self) -> bool {
        self.authority.is_playing()
    }

    pub fn is_shuffled(&self) -> bool {
        lock(&self.playlist).is_shuffled()
    }

    pub fn find(&self, id: &str) -> Option<Track> {
        lock(&self.playlist).find(id).cloned()
    }

    fn engine(&self) -> MutexGuard<'_, AudioEngine> {
        lock(&self.engine)
    }

    /// Load the library on a background thread.
    pub fn load_tracks(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        thread::spawn(move || this.load_library())
    }

    /// Load the persisted library, scanning only when nothing is persisted
    /// yet, and install it as the playlist.
    pub fn load_library(&self) {
        self.view.loading.set(true);

        let stored = self.store.all_tracks().unwrap_or_else(|e| {
            log::warn!("could not read the library store: {e}");
            Vec::new()
        });

        let tracks = if stored.is_empty() {
            self.view.loaded.set(0);
            self.view.total.set(0);
            let scanned = self.scanner.scan(&mut |loaded, total| {
                self.view.loaded.set(loaded);
                self.view.total.set(total);
            });
            if scanned.is_empty() {
                log::info!("no tracks found; the library is empty");
            } else if let Err(e) = self.store.insert_all(&scanned) {
                log::warn!("could not persist the scanned library: {e}");
            }
            scanned
        } else {
            self.view.loaded.set(stored.len());
            self.view.total.set(stored.len());
            stored
        };

        log::info!("library loaded: {} tracks", tracks.len());
        self.install(tracks);
        self.view.loading.set(false);
    }

    fn install(&self, tracks: Vec<Track>) {
        let mut engine = self.engine();
        let current = self.authority.current();

        let active: Vec<Track> = {
            let mut playlist = lock(&self.playlist);
            let shuffled = playlist.is_shuffled();
            *playlist = Playlist::new(tracks);
            if shuffled {
                playlist.enable_shuffle(current.as_ref(), &mut thread_rng());
            }
            playlist.active().cloned().collect()
        };
        self.view.tracks.set(active);

        if let Some(cur) = current {
            if !lock(&self.playlist).contains(&cur) {
                log::debug!("{} left the library", cur.id);
                if let Err(e) = engine.pause() {
                    log::warn!("could not pause: {e}");
                }
                self.authority.reset();
                self.view.current.set(None);
                self.view.playing.set(false);
            }
        }

        if self.authority.current().is_none() {
            self.restore_last_played();
        }
    }

    fn restore_last_played(&self) {
        let last = match self.store.last_played() {
            Ok(Some(t)) => t,
            Ok(None) => return,
            Err(e) => {
                log::warn!("could not read the last played track: {e}");
                return;
            }
        };
        let Some(track) = self.find(&last.id) else {
            return;
        };
        log::debug!("restoring last played {}", track.id);
        self.authority.select(track.clone());
        self.view.current.set(Some(track));
        self.view.refresh_progress();
        self.trigger_scroll_to_current();
    }

    /// Start `track` from the beginning. Focus denial leaves everything as
    /// it was.
    pub fn play(&self, track: &Track) {
        let mut engine = self.engine();
        self.start_track(&mut engine, track);
    }

    fn start_track(&self, engine: &mut AudioEngine, track: &Track) -> bool {
        let (queue, index) = {
            let playlist = lock(&self.playlist);
            let Some(index) = playlist.position_of(track) else {
                log::warn!("{} is not in the library", track.id);
                return false;
            };
            (playlist.active().cloned().collect::<Vec<_>>(), index)
        };

        match engine.set_playlist(queue, index) {
            Ok(PlayOutcome::Started) => {
                self.authority.set_playing(Some(track.clone()));
                self.view.current.set(Some(track.clone()));
                self.view.playing.set(true);
                self.view.position.set(Duration::ZERO);
                self.view.duration.set(engine.duration());
                self.view.refresh_progress();
                self.remember(track);
                true
            }
            Ok(outcome) => {
                log::info!("{} not started: {outcome:?}", track.id);
                false
            }
            Err(e) => {
                log::warn!("cannot play {}: {e}", track.id);
                false
            }
        }
    }

    fn remember(&self, track: &Track) {
        let store = Arc::clone(&self.store);
        let track = track.clone();
        self.worker.submit(move || {
            if let Err(e) = store.save_last_played(&track) {
                log::warn!("could not save last played track: {e}");
            }
        });
    }

    /// Next track in the active order, wrapping to the first.
    pub fn play_next(&self) {
        let mut engine = self.engine();
        self.step(&mut engine, true);
    }

    /// Previous track in the active order, wrapping to the last.
    pub fn play_previous(&self) {
        let mut engine = self.engine();
        self.step(&mut engine, false);
    }

    fn step(&self, engine: &mut AudioEngine, forward: bool) {
        let target = {
            let playlist = lock(&self.playlist);
            match self.authority.current() {
                Some(cur) if forward => playlist.next_after(&cur).cloned(),
                Some(cur) => playlist.previous_before(&cur).cloned(),
                None => playlist.active_at(0).cloned(),
            }
        };
        if let Some(track) = target {
            self.start_track(engine, &track);
        }
    }

    /// Move on after the current track ended, skipping tracks that fail to
    /// start. When none starts, playback stops on the finished track.
    fn continue_after_completion(&self, engine: &mut AudioEngine) {
        let attempts = lock(&self.playlist).len();
        let mut from = self.authority.current();
        for _ in 0..attempts {
            let next = {
                let playlist = lock(&self.playlist);
                match &from {
                    Some(cur) => playlist.next_after(cur).cloned(),
                    None => playlist.active_at(0).cloned(),
                }
            };
            let Some(track) = next else { break };
            if self.start_track(engine, &track) {
                return;
            }
            from = Some(track);
        }
        log::warn!("no playable track to continue with");
        self.authority.pause();
        self.view.playing.set(false);
    }

    /// Switch shuffle. Turning it on puts the current track first and plays
    /// it: a playing track keeps going, a paused or cued one resumes, and
    /// with nothing current the first shuffled track starts.
    pub fn toggle_shuffle(&self) {
        let mut engine = self.engine();
        let on = !self.is_shuffled();
        let first = self.apply_shuffle(&engine, on);
        if !on {
            return;
        }
        match self.authority.current() {
            None => {
                if let Some(track) = first {
                    self.start_track(&mut engine, &track);
                }
            }
            Some(_) if !engine.is_playing() => self.resume_locked(&mut engine),
            Some(_) => {}
        }
    }

    /// Set the shuffle flag without starting playback.
    pub fn set_shuffle(&self, on: bool) {
        let engine = self.engine();
        if self.is_shuffled() != on {
            self.apply_shuffle(&engine, on);
        }
    }

    fn apply_shuffle(&self, engine: &AudioEngine, on: bool) -> Option<Track> {
        let current = self
            .authority
            .current()
            .or_else(|| engine.current().cloned());
        let (active, first) = {
            let mut playlist = lock(&self.playlist);
            if on {
                playlist.enable_shuffle(current.as_ref(), &mut thread_rng());
            } else {
                playlist.disable_shuffle();
            }
            let active: Vec<Track> = playlist.active().cloned().collect();
            let first = active.first().cloned();
            (active, first)
        };
        self.view.tracks.set(active);
        self.view.shuffle.set(on);
        log::debug!("shuffle {}", if on { "on" } else { "off" });
        first
    }

    pub fn pause(&self) {
        let mut engine = self.engine();
        self.pause_locked(&mut engine);
    }

    fn pause_locked(&self, engine: &mut AudioEngine) {
        if let Err(e) = engine.pause() {
            log::warn!("pause failed: {e}");
        }
        self.authority.pause();
        self.view.playing.set(false);
    }

    /// Continue the current track. A track that was only cued (restored at
    /// startup, or picked while paused) is started from the beginning.
    pub fn resume(&self) {
        let mut engine = self.engine();
        self.resume_locked(&mut engine);
    }

    fn resume_locked(&self, engine: &mut AudioEngine) {
        let Some(current) = self.authority.current() else {
            return;
        };
        let loaded = engine.current().is_some_and(|t| t.same_as(&current));
        if !loaded {
            self.start_track(engine, &current);
            return;
        }
        match engine.resume() {
            Ok(PlayOutcome::Started) => {
                self.authority.set_playing(None);
                self.view.playing.set(true);
            }
            Ok(outcome) => log::info!("resume not started: {outcome:?}"),
            Err(e) => log::warn!("resume failed: {e}"),
        }
    }

    pub fn toggle_play_pause(&self) {
        let mut engine = self.engine();
        if engine.is_playing() {
            self.pause_locked(&mut engine);
        } else {
            self.resume_locked(&mut engine);
        }
    }

    /// Pause and rewind to the start of the track.
    pub fn stop(&self) {
        let mut engine = self.engine();
        self.pause_locked(&mut engine);
        self.seek_locked(&mut engine, Duration::ZERO);
    }

    pub fn seek(&self, position: Duration) {
        let mut engine = self.engine();
        self.seek_locked(&mut engine, position);
    }

    /// Seek to `fraction` (clamped to [0, 1]) of the track. Ignored while the
    /// length is unknown.
    pub fn seek_to_fraction(&self, fraction: f32) {
        if !fraction.is_finite() {
            return;
        }
        let mut engine = self.engine();
        let duration = engine.duration();
        if engine.current().is_none() || duration <= UNKNOWN_DURATION {
            return;
        }
        let target = duration.mul_f64(f64::from(fraction.clamp(0.0, 1.0)));
        self.seek_locked(&mut engine, target);
    }

    fn seek_locked(&self, engine: &mut AudioEngine, position: Duration) {
        match engine.seek(position) {
            Ok(at) => {
                self.view.position.set(at);
                self.view.refresh_progress();
            }
            Err(e) => log::warn!("seek failed: {e}"),
        }
    }

    pub fn trigger_scroll_to_current(&self) {
        let index = self
            .authority
            .current()
            .and_then(|t| lock(&self.playlist).position_of(&t));
        if index.is_some() {
            self.view.scroll_to_index.set(index);
        }
    }

    pub fn trigger_scroll_to(&self, index: usize) {
        if index < lock(&self.playlist).len() {
            self.view.scroll_to_index.set(Some(index));
        }
    }

    pub fn clear_scroll_to_index(&self) {
        self.view.scroll_to_index.set(None);
    }

    /// Re-derive the current track from what the engine has loaded, e.g.
    /// after the presentation reattaches.
    pub fn sync_current_from_player(&self) {
        let engine = self.engine();
        let Some(track) = engine.current().cloned() else {
            return;
        };
        let playing = engine.is_playing();
        drop(engine);

        self.view.current.set(Some(track));
        self.view.playing.set(playing);
        self.view.refresh_progress();
        self.trigger_scroll_to_current();
    }

    /// Stop the pump, release the output and flush pending writes.
    pub fn release(&self) {
        lock(&self.shutdown).take();
        if let Some(h) = lock(&self.pump).take() {
            if h.thread().id() != thread::current().id() {
                let _ = h.join();
            }
        }
        self.engine().release();
        self.worker.shutdown();
        self.authority.reset();
        self.view.playing.set(false);
        log::info!("playback released");
    }
}

#[cfg(test)]
mod tests;
