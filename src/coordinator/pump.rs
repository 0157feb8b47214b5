//! The coordinator's event thread.
//!
//! Engine events and authority changes are applied one at a time. Authority
//! changes are coalesced: the engine is always reconciled against the
//! latest snapshot, not against each intermediate state.

use std::sync::Weak;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, select};

use crate::audio::{EngineEvent, PlayOutcome};
use crate::authority::{AuthorityChange, NowPlaying};

use super::Coordinator;

pub(super) fn spawn(
    coordinator: Weak<Coordinator>,
    events: Receiver<EngineEvent>,
    changes: Receiver<AuthorityChange>,
    shutdown: Receiver<()>,
) -> Option<JoinHandle<()>> {
    thread::Builder::new()
        .name("playback-pump".into())
        .spawn(move || run(coordinator, events, changes, shutdown))
        .map_err(|e| log::error!("could not start the playback event thread: {e}"))
        .ok()
}

fn run(
    coordinator: Weak<Coordinator>,
    events: Receiver<EngineEvent>,
    changes: Receiver<AuthorityChange>,
    shutdown: Receiver<()>,
) {
    loop {
        select! {
            recv(events) -> msg => {
                let Ok(event) = msg else { break };
                let Some(c) = coordinator.upgrade() else { break };
                c.on_engine_event(event);
            }
            recv(changes) -> msg => {
                let Ok(mut change) = msg else { break };
                while let Ok(newer) = changes.try_recv() {
                    change = newer;
                }
                let Some(c) = coordinator.upgrade() else { break };
                log::trace!("authority change #{}", change.seq);
                c.reconcile();
            }
            recv(shutdown) -> _ => break,
        }
    }
    log::debug!("playback event thread stopped");
}

impl Coordinator {
    fn on_engine_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::Position(p) => {
                self.view.position.set(p);
                self.view.refresh_progress();
            }
            EngineEvent::Duration(d) => {
                self.view.duration.set(d);
                self.view.refresh_progress();
            }
            // The authority is written by whoever issued the command.
            EngineEvent::PlayingChanged(_) => {}
            EngineEvent::Completed(id) => {
                let mut engine = self.engine();
                if engine.current().is_some_and(|t| t.id == id) {
                    log::debug!("{id} finished");
                    engine.finish();
                    self.continue_after_completion(&mut engine);
                }
            }
            EngineEvent::Focus(change) => {
                let mut engine = self.engine();
                let was_playing = engine.is_playing();
                engine.on_focus_change(change);
                if was_playing && !engine.is_playing() {
                    self.authority.pause();
                    self.view.playing.set(false);
                }
            }
        }
    }

    /// Bring the engine in line with the authority, which another surface
    /// may have written directly. When the engine cannot follow (focus
    /// denied, unplayable track) its real state is published instead.
    fn reconcile(&self) {
        let mut engine = self.engine();
        let wanted = self.authority.snapshot();
        self.view.current.set(wanted.track.clone());
        self.view.playing.set(wanted.playing);
        self.view.refresh_progress();

        let Some(track) = wanted.track else {
            if engine.is_playing() {
                if let Err(e) = engine.pause() {
                    log::warn!("pause failed: {e}");
                }
            }
            return;
        };

        if !wanted.playing {
            if engine.is_playing() {
                if let Err(e) = engine.pause() {
                    log::warn!("pause failed: {e}");
                }
            }
            return;
        }

        let loaded = engine.current().is_some_and(|t| t.same_as(&track));
        if loaded && engine.is_playing() {
            return;
        }

        let started = if loaded {
            matches!(engine.resume(), Ok(PlayOutcome::Started))
        } else {
            self.start_track(&mut engine, &track)
        };

        if !started {
            let actual = NowPlaying {
                track: engine.current().cloned(),
                playing: engine.is_playing(),
            };
            log::info!("playback could not follow the requested state");
            self.authority.restore(actual);
        }
    }
}
