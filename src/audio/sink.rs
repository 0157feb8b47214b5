//! `Renderer` backed by a `rodio` sink on the default output device.
//!
//! The cpal stream behind `OutputStream` must stay on the thread that opened
//! it, so a small thread owns the stream for the renderer's lifetime and
//! hands back a `Sink` connected to its mixer. Every track is decoded into
//! that one sink.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rodio::source::SeekError;
use rodio::{Decoder, OutputStreamBuilder, Sink, Source};

use crate::library::Track;

use super::renderer::Renderer;
use super::types::EngineError;

/// Keeps the output stream thread alive; dropping it closes the device.
struct StreamGuard {
    shutdown: Option<mpsc::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.shutdown.take();
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}

pub struct RodioRenderer {
    sink: Sink,
    loaded: Option<PathBuf>,
    // Added to the sink position after a seek that had to re-open the file.
    offset: Duration,
    _stream: StreamGuard,
}

impl RodioRenderer {
    /// Open the default output device. Failure here means no playback is
    /// possible at all.
    pub fn open_default() -> Result<Self, EngineError> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<Sink, String>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || {
                let mut stream = match OutputStreamBuilder::open_default_stream() {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                // rodio logs to stderr when OutputStream is dropped.
                stream.log_on_drop(false);

                let sink = Sink::connect_new(stream.mixer());
                sink.pause();
                if ready_tx.send(Ok(sink)).is_err() {
                    return;
                }
                // Park until the renderer goes away.
                let _ = shutdown_rx.recv();
            })
            .map_err(|e| EngineError::Init(e.to_string()))?;

        let guard = StreamGuard {
            shutdown: Some(shutdown_tx),
            join: Some(join),
        };

        let sink = ready_rx
            .recv()
            .map_err(|_| EngineError::Init("audio output thread exited".into()))?
            .map_err(EngineError::Init)?;

        Ok(Self {
            sink,
            loaded: None,
            offset: Duration::ZERO,
            _stream: guard,
        })
    }

    fn decode(path: &PathBuf) -> Result<Decoder<BufReader<File>>, EngineError> {
        let file = File::open(path).map_err(|source| EngineError::Open {
            path: path.clone(),
            source,
        })?;
        Decoder::new(BufReader::new(file)).map_err(|e| EngineError::Decode {
            path: path.clone(),
            reason: e.to_string(),
        })
    }
}

impl Renderer for RodioRenderer {
    fn load(&mut self, track: &Track) -> Result<Option<Duration>, EngineError> {
        let source = Self::decode(&track.path)?;
        let duration = source.total_duration().or(track.duration);

        self.sink.clear();
        self.sink.append(source);
        self.sink.pause();
        self.loaded = Some(track.path.clone());
        self.offset = Duration::ZERO;
        Ok(duration)
    }

    fn play(&mut self) {
        self.sink.play();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn stop(&mut self) {
        self.sink.clear();
        self.loaded = None;
        self.offset = Duration::ZERO;
    }

    fn seek(&mut self, to: Duration) -> Result<(), EngineError> {
        let Some(path) = self.loaded.clone() else {
            return Ok(());
        };

        match self.sink.try_seek(to) {
            Ok(()) => {
                self.offset = Duration::ZERO;
                Ok(())
            }
            Err(SeekError::NotSupported { .. }) => {
                // Fall back to re-opening the file and skipping into it.
                let paused = self.sink.is_paused();
                let source = Self::decode(&path)?.skip_duration(to);
                self.sink.clear();
                self.sink.append(source);
                if !paused {
                    self.sink.play();
                }
                self.offset = to;
                Ok(())
            }
            Err(e) => Err(EngineError::Seek(e.to_string())),
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.sink.set_volume(volume);
    }

    fn position(&self) -> Duration {
        if self.loaded.is_none() {
            return Duration::ZERO;
        }
        self.offset + self.sink.get_pos()
    }

    fn is_finished(&self) -> bool {
        self.loaded.is_some() && self.sink.empty()
    }
}
