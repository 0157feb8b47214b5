//! Background progress sampling.
//!
//! While a track plays, one sampler thread polls the renderer. It publishes
//! the position every `interval` and reports the end of the track once. The
//! engine owns at most one `ProgressSampler`; cancelling joins the thread, so
//! a replacement is never started while the previous one is still running.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};

use super::renderer::{SharedRenderer, lock};
use super::types::EngineEvent;

#[derive(Clone, Copy, Debug)]
pub(crate) struct SamplerConfig {
    pub interval: Duration,
    pub poll: Duration,
}

pub(crate) struct ProgressSampler {
    cancel: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl ProgressSampler {
    /// `finished` is shared per loaded track: whoever flips it first reports
    /// the completion, so a resumed sampler never reports it again.
    pub fn spawn(
        renderer: SharedRenderer,
        events: Sender<EngineEvent>,
        config: SamplerConfig,
        track_id: String,
        duration: Option<Duration>,
        finished: Arc<AtomicBool>,
        live: Arc<AtomicUsize>,
    ) -> Self {
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        live.fetch_add(1, Ordering::SeqCst);

        let join = thread::spawn(move || {
            let mut last_report: Option<Instant> = None;
            loop {
                let due = last_report.is_none_or(|t| t.elapsed() >= config.interval);
                if due {
                    let pos = clamp(lock(&renderer).position(), duration);
                    if events.send(EngineEvent::Position(pos)).is_err() {
                        break;
                    }
                    last_report = Some(Instant::now());
                }

                match cancel_rx.recv_timeout(config.poll) {
                    Err(RecvTimeoutError::Timeout) => {}
                    // Cancelled, or the engine dropped its handle.
                    _ => break,
                }

                if lock(&renderer).is_finished() {
                    if !finished.swap(true, Ordering::SeqCst) {
                        if let Some(d) = duration {
                            let _ = events.send(EngineEvent::Position(d));
                        }
                        let _ = events.send(EngineEvent::Completed(track_id.clone()));
                    }
                    break;
                }
            }
            live.fetch_sub(1, Ordering::SeqCst);
        });

        Self {
            cancel: Some(cancel_tx),
            join: Some(join),
        }
    }

    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender wakes the thread immediately.
        self.cancel.take();
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}

/// Keep a sampled position inside the track once its length is known.
pub(crate) fn clamp(pos: Duration, duration: Option<Duration>) -> Duration {
    match duration {
        Some(d) => pos.min(d),
        None => pos,
    }
}

impl Drop for ProgressSampler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
