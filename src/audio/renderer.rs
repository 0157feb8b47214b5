use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::library::Track;

use super::types::EngineError;

/// The decoder/output pair the engine drives.
///
/// `load` leaves the renderer paused at the start of the new track and
/// returns the track length when the decoder knows it.
pub trait Renderer: Send {
    fn load(&mut self, track: &Track) -> Result<Option<Duration>, EngineError>;
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek(&mut self, to: Duration) -> Result<(), EngineError>;
    fn set_volume(&mut self, volume: f32);
    fn position(&self) -> Duration;
    /// A loaded track played through to its end.
    fn is_finished(&self) -> bool;
}

pub(crate) type SharedRenderer = Arc<Mutex<Box<dyn Renderer>>>;

pub(crate) fn lock(renderer: &SharedRenderer) -> MutexGuard<'_, Box<dyn Renderer>> {
    renderer.lock().unwrap_or_else(PoisonError::into_inner)
}
