//! Audio engine: the single renderer, audio focus and progress sampling.
//!
//! - `engine`: `AudioEngine`, the only thing that drives the renderer
//! - `focus`: focus arbitration between output clients
//! - `renderer`/`sink`: the renderer seam and its rodio implementation
//! - `sampler`: the background position/completion poller
//! - `types`: events, focus vocabulary and `EngineError`

mod engine;
mod focus;
mod renderer;
mod sampler;
mod sink;
mod types;

pub use engine::AudioEngine;
pub use focus::{FocusArbiter, FocusClientId, SharedFocus, next_client_id};
pub use renderer::Renderer;
pub use types::{
    EngineError, EngineEvent, FocusChange, FocusKind, FocusState, PlayOutcome, UNKNOWN_DURATION,
};
