use std::sync::{Arc, PoisonError, RwLock};
use std::thread;

use crossbeam_channel::{Receiver, bounded, select};

use crate::authority::{Authority, Direction, NowPlaying};
use crate::coordinator::PlayerView;
use crate::library::{LibraryStore, Playlist, Track};

use super::projection::project;
use super::transport::{TransportCommand, TransportTarget, dispatch};
use super::{MediaSession, SessionTask};

pub const ROOT_ID: &str = "root";

/// One node of the browse tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrowseItem {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub browsable: bool,
    pub playable: bool,
}

impl From<&Track> for BrowseItem {
    fn from(t: &Track) -> Self {
        Self {
            id: t.id.clone(),
            title: t.title.clone(),
            subtitle: t.artist.clone(),
            browsable: false,
            playable: true,
        }
    }
}

/// Best-effort snapshot of the persisted library in canonical order. Read
/// once, blocking, before the host can bind.
pub fn load_snapshot(store: &dyn LibraryStore) -> Vec<Track> {
    match store.all_tracks() {
        Ok(tracks) => Playlist::new(tracks).tracks().to_vec(),
        Err(e) => {
            log::warn!("automotive snapshot unavailable: {e}");
            Vec::new()
        }
    }
}

/// Browse host adapter. Until a coordinator is attached, commands act on
/// the authority directly against the startup snapshot.
pub struct AutomotiveAdapter {
    authority: Authority,
    snapshot: Vec<Track>,
    session: Arc<dyn MediaSession>,
    target: RwLock<Option<Arc<dyn TransportTarget>>>,
}

impl AutomotiveAdapter {
    pub fn new(authority: Authority, snapshot: Vec<Track>, session: Arc<dyn MediaSession>) -> Arc<Self> {
        let items: Vec<BrowseItem> = snapshot.iter().map(BrowseItem::from).collect();
        session.set_browse_items(&items);
        Arc::new(Self {
            authority,
            snapshot,
            session,
            target: RwLock::new(None),
        })
    }

    pub fn attach_coordinator(&self, target: Arc<dyn TransportTarget>) {
        *self.target.write().unwrap_or_else(PoisonError::into_inner) = Some(target);
    }

    fn target(&self) -> Option<Arc<dyn TransportTarget>> {
        self.target
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn root(&self) -> BrowseItem {
        BrowseItem {
            id: ROOT_ID.to_string(),
            title: "Library".to_string(),
            subtitle: None,
            browsable: true,
            playable: false,
        }
    }

    /// The tree is flat: the root holds every track, nothing else has
    /// children.
    pub fn load_children(&self, parent_id: &str) -> Vec<BrowseItem> {
        if parent_id != ROOT_ID {
            return Vec::new();
        }
        self.snapshot.iter().map(BrowseItem::from).collect()
    }

    pub fn on_state(&self, state: &NowPlaying) {
        let (metadata, status) = project(state);
        self.session.set_metadata(metadata.as_ref());
        self.session.set_status(status);
    }

    pub fn on_command(&self, cmd: TransportCommand) {
        log::debug!("automotive command: {cmd:?}");
        if let Some(target) = self.target() {
            dispatch(target.as_ref(), &cmd);
            return;
        }

        let authority = &self.authority;
        match cmd {
            TransportCommand::Play => {
                authority.set_playing(None);
            }
            TransportCommand::Pause | TransportCommand::Stop => {
                authority.pause();
            }
            TransportCommand::PlayPause => {
                authority.toggle();
            }
            TransportCommand::SkipNext => {
                authority.advance(Direction::Forward, &self.snapshot);
            }
            TransportCommand::SkipPrevious => {
                authority.advance(Direction::Backward, &self.snapshot);
            }
            TransportCommand::PlayItem(id) => {
                if let Some(t) = self.snapshot.iter().find(|t| t.id == id) {
                    authority.set_playing(Some(t.clone()));
                }
            }
            TransportCommand::Quit => {}
        }
    }

    pub fn spawn(
        self: &Arc<Self>,
        view: &PlayerView,
        commands: Receiver<TransportCommand>,
    ) -> Option<SessionTask> {
        let changes = self.authority.subscribe();
        let positions = view.position.subscribe();
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let this = Arc::clone(self);

        let join = thread::Builder::new()
            .name("automotive-session".into())
            .spawn(move || {
                loop {
                    select! {
                        recv(changes) -> msg => match msg {
                            Ok(change) => this.on_state(&change.state),
                            Err(_) => break,
                        },
                        recv(positions) -> msg => match msg {
                            Ok(p) => this.session.set_position(p),
                            Err(_) => break,
                        },
                        recv(commands) -> msg => match msg {
                            Ok(cmd) => this.on_command(cmd),
                            Err(_) => break,
                        },
                        recv(stop_rx) -> _ => break,
                    }
                }
            });

        match join {
            Ok(h) => Some(SessionTask::new(stop_tx, h)),
            Err(e) => {
                log::warn!("automotive session disabled: {e}");
                None
            }
        }
    }
}
