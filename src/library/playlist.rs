//! The working set of tracks and its active ordering.
//!
//! Tracks are held once, in canonical order (case-insensitive title). The
//! shuffle state is a permutation of indices into that list, so toggling
//! shuffle never duplicates or drops a track, and switching it off restores
//! the canonical order exactly.

use rand::Rng;
use rand::seq::SliceRandom;

use super::model::Track;

#[derive(Debug, Clone, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
    order: Vec<usize>,
    shuffle: bool,
}

impl Playlist {
    /// Build a playlist in canonical order, independent of the input order.
    pub fn new(mut tracks: Vec<Track>) -> Self {
        // Stable sort: equal titles keep their scan order.
        tracks.sort_by_cached_key(Track::sort_key);
        let order = (0..tracks.len()).collect();
        Self {
            tracks,
            order,
            shuffle: false,
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Tracks in canonical order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle
    }

    /// Canonical indices in active order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Tracks in active order (shuffled or canonical).
    pub fn active(&self) -> impl Iterator<Item = &Track> + '_ {
        self.order.iter().filter_map(|&i| self.tracks.get(i))
    }

    pub fn active_at(&self, pos: usize) -> Option<&Track> {
        self.order.get(pos).and_then(|&i| self.tracks.get(i))
    }

    /// Index of `track` in canonical order.
    pub fn index_of(&self, track: &Track) -> Option<usize> {
        self.tracks.iter().position(|t| t.same_as(track))
    }

    /// Position of `track` in the active order.
    pub fn position_of(&self, track: &Track) -> Option<usize> {
        let idx = self.index_of(track)?;
        self.order.iter().position(|&i| i == idx)
    }

    pub fn contains(&self, track: &Track) -> bool {
        self.index_of(track).is_some()
    }

    pub fn find(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// The track after `current` in active order, wrapping to the first.
    pub fn next_after(&self, current: &Track) -> Option<&Track> {
        let pos = self.position_of(current)?;
        let next = if pos + 1 >= self.order.len() { 0 } else { pos + 1 };
        self.active_at(next)
    }

    /// The track before `current` in active order, wrapping to the last.
    pub fn previous_before(&self, current: &Track) -> Option<&Track> {
        let pos = self.position_of(current)?;
        let prev = if pos == 0 { self.order.len() - 1 } else { pos - 1 };
        self.active_at(prev)
    }

    /// Switch shuffle on with a fresh permutation, moving `front` (when it is
    /// part of the playlist) to position 0.
    pub fn enable_shuffle<R: Rng + ?Sized>(&mut self, front: Option<&Track>, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.tracks.len()).collect();
        order.shuffle(rng);

        if let Some(idx) = front.and_then(|t| self.index_of(t)) {
            if let Some(pos) = order.iter().position(|&i| i == idx) {
                order.remove(pos);
                order.insert(0, idx);
            }
        }

        self.order = order;
        self.shuffle = true;
    }

    /// Switch shuffle off, restoring canonical order.
    pub fn disable_shuffle(&mut self) {
        self.order = (0..self.tracks.len()).collect();
        self.shuffle = false;
    }
}
