use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::config::AudioSettings;
use crate::library::Track;

use super::focus::{FocusArbiter, FocusClientId, next_client_id};
use super::renderer::{Renderer, SharedRenderer, lock};
use super::sampler::{ProgressSampler, SamplerConfig, clamp};
use super::sink::RodioRenderer;
use super::types::{
    EngineError, EngineEvent, FocusChange, FocusKind, FocusState, PlayOutcome, UNKNOWN_DURATION,
};

/// Owns the renderer, the focus registration and the progress sampler.
///
/// Everything the engine learns asynchronously (position, duration, end of
/// track, focus changes) arrives on the receiver returned by `new`. The
/// owner is expected to feed `EngineEvent::Focus` back into
/// `on_focus_change`.
pub struct AudioEngine {
    renderer: SharedRenderer,
    focus: Arc<dyn FocusArbiter>,
    client: FocusClientId,
    events: Sender<EngineEvent>,
    sampling: SamplerConfig,
    duck_volume: f32,

    playlist: Vec<Track>,
    current: Option<Track>,
    duration: Option<Duration>,
    playing: bool,
    focus_state: FocusState,
    released: bool,

    sampler: Option<ProgressSampler>,
    // Per loaded track; set once its completion has been reported.
    finished: Arc<AtomicBool>,
    live_samplers: Arc<AtomicUsize>,
}

impl AudioEngine {
    pub fn new(
        renderer: Box<dyn Renderer>,
        focus: Arc<dyn FocusArbiter>,
        settings: &AudioSettings,
    ) -> (Self, Receiver<EngineEvent>) {
        let (events, rx) = unbounded();
        let engine = Self {
            renderer: Arc::new(Mutex::new(renderer)),
            focus,
            client: next_client_id(),
            events,
            sampling: SamplerConfig {
                interval: settings.sample_interval(),
                poll: settings.completion_poll(),
            },
            duck_volume: settings.duck_volume,
            playlist: Vec::new(),
            current: None,
            duration: None,
            playing: false,
            focus_state: FocusState::None,
            released: false,
            sampler: None,
            finished: Arc::new(AtomicBool::new(false)),
            live_samplers: Arc::new(AtomicUsize::new(0)),
        };
        (engine, rx)
    }

    /// Engine on the default output device. An `Err` here is fatal.
    pub fn open_default(
        focus: Arc<dyn FocusArbiter>,
        settings: &AudioSettings,
    ) -> Result<(Self, Receiver<EngineEvent>), EngineError> {
        let renderer = RodioRenderer::open_default()?;
        Ok(Self::new(Box::new(renderer), focus, settings))
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn playlist(&self) -> &[Track] {
        &self.playlist
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn focus_state(&self) -> FocusState {
        self.focus_state
    }

    /// Length of the loaded track, or `UNKNOWN_DURATION`.
    pub fn duration(&self) -> Duration {
        self.duration.unwrap_or(UNKNOWN_DURATION)
    }

    pub fn position(&self) -> Duration {
        if self.current.is_none() {
            return Duration::ZERO;
        }
        clamp(lock(&self.renderer).position(), self.duration)
    }

    pub fn active_samplers(&self) -> usize {
        self.live_samplers.load(Ordering::SeqCst)
    }

    /// Start `track` from the beginning.
    ///
    /// Focus is requested first; when it is denied nothing about the engine
    /// changes. A track that fails to load leaves the previous one in place.
    pub fn play(&mut self, track: &Track) -> Result<PlayOutcome, EngineError> {
        self.ensure_live()?;
        if !self.acquire_focus() {
            return Ok(PlayOutcome::FocusDenied);
        }

        let loaded = lock(&self.renderer).load(track);
        let known = match loaded {
            Ok(d) => d,
            Err(e) => {
                if !self.playing {
                    self.release_focus(FocusState::None);
                }
                return Err(e);
            }
        };

        self.stop_sampler();
        self.current = Some(track.clone());
        self.duration = known;
        self.finished = Arc::new(AtomicBool::new(false));
        self.emit(EngineEvent::Duration(self.duration()));

        lock(&self.renderer).play();
        self.set_playing(true);
        self.start_sampler();
        log::debug!("playing {}", track.id);
        Ok(PlayOutcome::Started)
    }

    /// Pause and give the output back. A no-op when not playing.
    pub fn pause(&mut self) -> Result<(), EngineError> {
        self.ensure_live()?;
        if !self.playing {
            return Ok(());
        }
        self.halt();
        self.release_focus(FocusState::None);
        Ok(())
    }

    /// Continue the loaded track where it stopped. A track that already
    /// played to its end starts over.
    pub fn resume(&mut self) -> Result<PlayOutcome, EngineError> {
        self.ensure_live()?;
        let Some(track) = self.current.clone() else {
            return Ok(PlayOutcome::NothingLoaded);
        };
        if self.playing {
            return Ok(PlayOutcome::Started);
        }
        if self.finished.load(Ordering::SeqCst) {
            return self.play(&track);
        }
        if !self.acquire_focus() {
            return Ok(PlayOutcome::FocusDenied);
        }

        lock(&self.renderer).play();
        self.set_playing(true);
        self.start_sampler();
        Ok(PlayOutcome::Started)
    }

    /// The loaded track played to its end. Sampling stops and the engine
    /// reports not playing; focus is kept for whatever plays next.
    pub fn finish(&mut self) {
        if !self.released && self.playing {
            self.halt();
        }
    }

    /// Jump within the loaded track; the target is clamped to its length.
    /// Returns the position actually sought to.
    pub fn seek(&mut self, to: Duration) -> Result<Duration, EngineError> {
        self.ensure_live()?;
        if self.current.is_none() {
            return Ok(Duration::ZERO);
        }
        let to = clamp(to, self.duration);
        lock(&self.renderer).seek(to)?;
        self.emit(EngineEvent::Position(to));
        Ok(to)
    }

    /// Replace the engine's queue and start playing at `start`.
    pub fn set_playlist(
        &mut self,
        tracks: Vec<Track>,
        start: usize,
    ) -> Result<PlayOutcome, EngineError> {
        self.ensure_live()?;
        let Some(track) = tracks.get(start).cloned() else {
            return Err(EngineError::NoSuchIndex(start));
        };
        self.playlist = tracks;
        self.play(&track)
    }

    /// Stop everything and drop the focus registration. Later commands fail
    /// with `EngineError::Released`.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.stop_sampler();
        lock(&self.renderer).stop();
        if self.playing {
            self.set_playing(false);
        }
        self.release_focus(FocusState::None);
        self.current = None;
        self.duration = None;
        self.released = true;
        log::debug!("audio engine released");
    }

    pub fn on_focus_change(&mut self, change: FocusChange) {
        if self.released {
            return;
        }
        log::info!("audio focus: {change:?}");
        match change {
            FocusChange::Loss => {
                if self.playing {
                    self.halt();
                }
                self.release_focus(FocusState::Lost);
            }
            FocusChange::LossTransient => {
                // Keep the registration; the arbiter tells us when it is back.
                if self.playing {
                    self.halt();
                }
                self.focus_state = FocusState::Lost;
            }
            FocusChange::LossTransientCanDuck => {
                lock(&self.renderer).set_volume(self.duck_volume);
                self.focus_state = FocusState::Ducked;
            }
            FocusChange::Gain => {
                lock(&self.renderer).set_volume(1.0);
                self.focus_state = FocusState::Granted;
            }
        }
    }

    fn ensure_live(&self) -> Result<(), EngineError> {
        if self.released {
            Err(EngineError::Released)
        } else {
            Ok(())
        }
    }

    fn acquire_focus(&mut self) -> bool {
        let granted = self
            .focus
            .request(self.client, FocusKind::Gain, self.events.clone());
        if granted {
            log::debug!("audio focus granted");
            if self.focus_state == FocusState::Ducked {
                lock(&self.renderer).set_volume(1.0);
            }
            self.focus_state = FocusState::Granted;
        } else {
            log::debug!("audio focus denied");
        }
        granted
    }

    fn release_focus(&mut self, state: FocusState) {
        self.focus.abandon(self.client);
        self.focus_state = state;
    }

    /// Pause the renderer and the sampler without touching focus.
    fn halt(&mut self) {
        self.stop_sampler();
        lock(&self.renderer).pause();
        self.set_playing(false);
    }

    fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
        self.emit(EngineEvent::PlayingChanged(playing));
    }

    fn start_sampler(&mut self) {
        // Joins the previous thread before the next one starts.
        self.stop_sampler();
        let Some(track) = self.current.as_ref() else {
            return;
        };
        self.sampler = Some(ProgressSampler::spawn(
            self.renderer.clone(),
            self.events.clone(),
            self.sampling,
            track.id.clone(),
            self.duration,
            self.finished.clone(),
            self.live_samplers.clone(),
        ));
    }

    fn stop_sampler(&mut self) {
        if let Some(s) = self.sampler.take() {
            s.cancel();
        }
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.release();
    }
}
