//! The shared "now playing" record.
//!
//! Every surface (presentation, media session, car browser) reads and writes
//! the same `Authority`. Mutations run under one lock and the change is
//! broadcast to every listener before the lock is released, so listeners see
//! states in the order they were written, each tagged with an increasing
//! sequence number. A mutation that leaves the record unchanged is not
//! broadcast.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::library::Track;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NowPlaying {
    pub track: Option<Track>,
    pub playing: bool,
}

#[derive(Clone, Debug)]
pub struct AuthorityChange {
    pub seq: u64,
    pub state: NowPlaying,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

struct Record {
    state: NowPlaying,
    seq: u64,
    listeners: Vec<Sender<AuthorityChange>>,
}

#[derive(Clone)]
pub struct Authority {
    record: Arc<Mutex<Record>>,
}

impl Default for Authority {
    fn default() -> Self {
        Self::new()
    }
}

impl Authority {
    pub fn new() -> Self {
        Self {
            record: Arc::new(Mutex::new(Record {
                state: NowPlaying::default(),
                seq: 0,
                listeners: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Record> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> NowPlaying {
        self.lock().state.clone()
    }

    pub fn current(&self) -> Option<Track> {
        self.lock().state.track.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.lock().state.playing
    }

    /// Register a listener. The current state is delivered first.
    pub fn subscribe(&self) -> Receiver<AuthorityChange> {
        let (tx, rx) = unbounded();
        let mut record = self.lock();
        let first = AuthorityChange {
            seq: record.seq,
            state: record.state.clone(),
        };
        if tx.send(first).is_ok() {
            record.listeners.push(tx);
        }
        rx
    }

    /// Apply `f` and broadcast the result if the record changed.
    fn mutate(&self, f: impl FnOnce(&mut NowPlaying)) -> bool {
        let mut record = self.lock();
        let before = record.state.clone();
        f(&mut record.state);
        if record.state == before {
            return false;
        }
        record.seq += 1;
        let change = AuthorityChange {
            seq: record.seq,
            state: record.state.clone(),
        };
        record
            .listeners
            .retain(|tx| tx.send(change.clone()).is_ok());
        true
    }

    /// Mark playing, switching to `track` when one is given. Without a
    /// current track there is nothing to play and the call is a no-op.
    pub fn set_playing(&self, track: Option<Track>) -> bool {
        self.mutate(|s| {
            if let Some(t) = track {
                s.track = Some(t);
            }
            if s.track.is_some() {
                s.playing = true;
            }
        })
    }

    /// Make `track` current without starting it.
    pub fn select(&self, track: Track) -> bool {
        self.mutate(|s| {
            s.track = Some(track);
            s.playing = false;
        })
    }

    pub fn pause(&self) -> bool {
        self.mutate(|s| s.playing = false)
    }

    pub fn toggle(&self) -> bool {
        self.mutate(|s| {
            if s.track.is_some() {
                s.playing = !s.playing;
            }
        })
    }

    /// Step one position through `playlist` from the current track and mark
    /// playing. At either end of the list, or when the current track is not
    /// in it, nothing happens.
    pub fn advance(&self, direction: Direction, playlist: &[Track]) -> bool {
        self.mutate(|s| {
            let Some(cur) = s.track.as_ref() else {
                return;
            };
            let Some(idx) = playlist.iter().position(|t| t.same_as(cur)) else {
                return;
            };
            let target = match direction {
                Direction::Forward if idx + 1 < playlist.len() => idx + 1,
                Direction::Backward if idx > 0 => idx - 1,
                _ => return,
            };
            s.track = Some(playlist[target].clone());
            s.playing = true;
        })
    }

    /// Overwrite the record with what the engine is actually doing.
    pub fn restore(&self, state: NowPlaying) -> bool {
        self.mutate(|s| *s = state)
    }

    pub fn reset(&self) -> bool {
        self.restore(NowPlaying::default())
    }
}
