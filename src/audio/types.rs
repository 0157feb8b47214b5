//! Audio-related small types.
//!
//! Events flowing out of the engine, focus vocabulary, and the engine error
//! type.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Reported duration before the renderer knows the real one. Never zero so
/// that `position / duration` is always defined.
pub const UNKNOWN_DURATION: Duration = Duration::from_millis(1);

/// Focus held by an engine.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FocusState {
    #[default]
    None,
    Granted,
    /// Another client is playing over us; we keep playing quietly.
    Ducked,
    Lost,
}

/// How long and how exclusively a client wants the output.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FocusKind {
    /// Indefinite, e.g. music playback.
    Gain,
    /// Short interruption; the previous holder pauses.
    Transient,
    /// Short interruption; the previous holder may keep playing ducked.
    TransientMayDuck,
    /// Short interruption that refuses to share, e.g. a call. Other requests
    /// are denied while it is held.
    TransientExclusive,
}

/// Notification delivered to a focus holder.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FocusChange {
    Gain,
    Loss,
    LossTransient,
    LossTransientCanDuck,
}

/// Everything the engine reports to its single consumer.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    Position(Duration),
    Duration(Duration),
    PlayingChanged(bool),
    /// The track with this id played to its end.
    Completed(String),
    Focus(FocusChange),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    /// Another client holds the output; nothing changed.
    FocusDenied,
    /// `resume` with no track loaded.
    NothingLoaded,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("audio output unavailable: {0}")]
    Init(String),
    #[error("failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("seek failed: {0}")]
    Seek(String),
    #[error("no track at index {0}")]
    NoSuchIndex(usize),
    #[error("engine has been released")]
    Released,
}
