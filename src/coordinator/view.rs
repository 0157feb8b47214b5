use std::time::Duration;

use crate::audio::UNKNOWN_DURATION;
use crate::library::Track;
use crate::observable::Observable;

/// State streams the presentation layer renders from.
#[derive(Clone)]
pub struct PlayerView {
    /// Tracks in the active (canonical or shuffled) order.
    pub tracks: Observable<Vec<Track>>,
    pub current: Observable<Option<Track>>,
    pub playing: Observable<bool>,
    pub position: Observable<Duration>,
    pub duration: Observable<Duration>,
    /// `position / duration` in [0, 1].
    pub progress: Observable<f32>,
    pub loading: Observable<bool>,
    pub loaded: Observable<usize>,
    pub total: Observable<usize>,
    pub shuffle: Observable<bool>,
    /// Edge-triggered: the consumer scrolls, then calls
    /// `Coordinator::clear_scroll_to_index`.
    pub scroll_to_index: Observable<Option<usize>>,
}

impl Default for PlayerView {
    fn default() -> Self {
        Self {
            tracks: Observable::new(Vec::new()),
            current: Observable::new(None),
            playing: Observable::new(false),
            position: Observable::new(Duration::ZERO),
            duration: Observable::new(UNKNOWN_DURATION),
            progress: Observable::new(0.0),
            loading: Observable::new(false),
            loaded: Observable::new(0),
            total: Observable::new(0),
            shuffle: Observable::new(false),
            scroll_to_index: Observable::new(None),
        }
    }
}

impl PlayerView {
    pub(crate) fn refresh_progress(&self) {
        let fraction = if self.current.get().is_none() {
            0.0
        } else {
            progress_fraction(self.position.get(), self.duration.get())
        };
        self.progress.set(fraction);
    }
}

/// Fraction of the track played. An unknown length counts as no progress.
pub fn progress_fraction(position: Duration, duration: Duration) -> f32 {
    if duration <= UNKNOWN_DURATION {
        return 0.0;
    }
    (position.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0) as f32
}
