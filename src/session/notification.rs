use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded, select};

use crate::authority::{Authority, NowPlaying};
use crate::coordinator::PlayerView;

use super::projection::{SessionMetadata, SessionStatus, project};
use super::transport::{TransportCommand, TransportTarget, dispatch};
use super::{MediaSession, SessionError, SessionTask};

/// A persistent, user-visible "now playing" indicator with transport
/// affordances.
pub trait StatusSurface: Send {
    fn show(&mut self, metadata: &SessionMetadata, status: SessionStatus)
    -> Result<(), SessionError>;
    fn dismiss(&mut self) -> Result<(), SessionError>;
}

/// Raises the host to a state the OS keeps alive while it plays.
pub trait ForegroundHost: Send {
    fn promote(&mut self) -> Result<(), SessionError>;
    fn demote(&mut self);
}

struct Surface {
    // `None` once the OS refused it; the feature is then a no-op.
    surface: Option<Box<dyn StatusSurface>>,
    host: Option<Box<dyn ForegroundHost>>,
    promoted: bool,
    visible: bool,
    // Torn down by stop or task removal; stays down until playback starts.
    dismissed: bool,
}

impl Surface {
    fn show(&mut self, metadata: &SessionMetadata, status: SessionStatus) {
        if !self.promoted {
            if let Some(host) = self.host.as_mut() {
                if let Err(e) = host.promote() {
                    log::warn!("foreground promotion unavailable, continuing without it: {e}");
                    self.host = None;
                }
            }
            self.promoted = true;
        }

        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        match surface.show(metadata, status) {
            Ok(()) => self.visible = true,
            Err(e) => {
                log::warn!("status surface unavailable, disabling it: {e}");
                self.surface = None;
                self.visible = false;
            }
        }
    }

    fn hide(&mut self) {
        if self.visible {
            if let Some(surface) = self.surface.as_mut() {
                if let Err(e) = surface.dismiss() {
                    log::warn!("could not dismiss the status surface: {e}");
                }
            }
            self.visible = false;
        }
        if self.promoted {
            if let Some(host) = self.host.as_mut() {
                host.demote();
            }
            self.promoted = false;
        }
    }
}

/// Media session plus status surface, driven by the shared authority.
pub struct NotificationAdapter {
    target: Arc<dyn TransportTarget>,
    session: Arc<dyn MediaSession>,
    surface: Mutex<Surface>,
    quit: Sender<()>,
}

impl NotificationAdapter {
    /// `surface` and `host` may be missing when the OS does not offer them.
    /// `quit` is signalled when the host is removed.
    pub fn new(
        target: Arc<dyn TransportTarget>,
        session: Arc<dyn MediaSession>,
        surface: Option<Box<dyn StatusSurface>>,
        host: Option<Box<dyn ForegroundHost>>,
        quit: Sender<()>,
    ) -> Arc<Self> {
        Arc::new(Self {
            target,
            session,
            surface: Mutex::new(Surface {
                surface,
                host,
                promoted: false,
                visible: false,
                dismissed: false,
            }),
            quit,
        })
    }

    fn surface(&self) -> MutexGuard<'_, Surface> {
        self.surface.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_surface_visible(&self) -> bool {
        self.surface().visible
    }

    pub fn on_state(&self, state: &NowPlaying) {
        let (metadata, status) = project(state);
        self.session.set_metadata(metadata.as_ref());
        self.session.set_status(status);

        let mut surface = self.surface();
        match metadata {
            None => surface.hide(),
            Some(metadata) => {
                if status == SessionStatus::Playing {
                    surface.dismissed = false;
                }
                if !surface.dismissed {
                    surface.show(&metadata, status);
                }
            }
        }
    }

    pub fn on_position(&self, position: Duration) {
        self.session.set_position(position);
    }

    pub fn on_command(&self, cmd: TransportCommand) {
        log::debug!("notification command: {cmd:?}");
        match cmd {
            TransportCommand::Quit => self.on_task_removed(),
            TransportCommand::Stop => {
                self.target.stop();
                self.tear_down();
            }
            other => dispatch(self.target.as_ref(), &other),
        }
    }

    /// The host was removed from the recent-task list: pause, take the
    /// surface down and ask the process to exit.
    pub fn on_task_removed(&self) {
        self.target.pause();
        self.tear_down();
        let _ = self.quit.send(());
    }

    fn tear_down(&self) {
        let mut surface = self.surface();
        surface.hide();
        surface.dismissed = true;
    }

    /// Follow `authority` and the view's position, and apply `commands`.
    pub fn spawn(
        self: &Arc<Self>,
        authority: &Authority,
        view: &PlayerView,
        commands: Receiver<TransportCommand>,
    ) -> Option<SessionTask> {
        let changes = authority.subscribe();
        let positions = view.position.subscribe();
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let this = Arc::clone(self);

        let join = thread::Builder::new()
            .name("notification-session".into())
            .spawn(move || {
                loop {
                    select! {
                        recv(changes) -> msg => match msg {
                            Ok(change) => this.on_state(&change.state),
                            Err(_) => break,
                        },
                        recv(positions) -> msg => match msg {
                            Ok(p) => this.on_position(p),
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
                log::warn!("notification session disabled: {e}");
                None
            }
        }
    }
}
