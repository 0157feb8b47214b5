//! Desktop implementations of the status surface and foreground host.
//!
//! The surface is a resident freedesktop notification with previous /
//! play-pause / next actions. The foreground host is a logind idle
//! inhibitor held while the surface is up.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;

use crossbeam_channel::Sender;
use zbus::blocking::Connection;
use zbus::proxy;
use zvariant::{OwnedFd, Value};

use super::SessionError;
use super::notification::{ForegroundHost, StatusSurface};
use super::projection::{SessionMetadata, SessionStatus};
use super::transport::TransportCommand;

#[proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
    #[allow(clippy::too_many_arguments)]
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: &[&str],
        hints: &HashMap<&str, &Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;

    fn close_notification(&self, id: u32) -> zbus::Result<()>;

    #[zbus(signal)]
    fn action_invoked(&self, id: u32, action_key: &str) -> zbus::Result<()>;
}

#[proxy(
    interface = "org.freedesktop.login1.Manager",
    default_service = "org.freedesktop.login1",
    default_path = "/org/freedesktop/login1"
)]
trait LoginManager {
    fn inhibit(&self, what: &str, who: &str, why: &str, mode: &str) -> zbus::Result<OwnedFd>;
}

const ACTION_PREVIOUS: &str = "previous";
const ACTION_PLAY_PAUSE: &str = "play-pause";
const ACTION_NEXT: &str = "next";

fn action_command(key: &str) -> Option<TransportCommand> {
    match key {
        ACTION_PREVIOUS => Some(TransportCommand::SkipPrevious),
        ACTION_PLAY_PAUSE => Some(TransportCommand::PlayPause),
        ACTION_NEXT => Some(TransportCommand::SkipNext),
        _ => None,
    }
}

pub struct DesktopNotifications {
    proxy: NotificationsProxyBlocking<'static>,
    app_name: String,
    // Id of the notification on screen, 0 when none.
    id: Arc<AtomicU32>,
}

impl DesktopNotifications {
    /// Connect to the notification daemon. Action buttons pressed on the
    /// notification are sent to `commands`.
    pub fn connect(
        app_name: &str,
        commands: Sender<TransportCommand>,
    ) -> Result<Self, SessionError> {
        let connection = Connection::session()?;
        let proxy = NotificationsProxyBlocking::new(&connection)?;
        let id = Arc::new(AtomicU32::new(0));

        let signals = proxy.receive_action_invoked()?;
        let shown = id.clone();
        thread::Builder::new()
            .name("notification-actions".into())
            .spawn(move || {
                for signal in signals {
                    let Ok(args) = signal.args() else { continue };
                    let current = shown.load(Ordering::SeqCst);
                    if current == 0 || *args.id() != current {
                        continue;
                    }
                    if let Some(cmd) = action_command(args.action_key()) {
                        if commands.send(cmd).is_err() {
                            break;
                        }
                    }
                }
            })?;

        Ok(Self {
            proxy,
            app_name: app_name.to_string(),
            id,
        })
    }
}

impl StatusSurface for DesktopNotifications {
    fn show(
        &mut self,
        metadata: &SessionMetadata,
        status: SessionStatus,
    ) -> Result<(), SessionError> {
        let body = match (&metadata.artist, &metadata.album) {
            (Some(artist), Some(album)) => format!("{artist} - {album}"),
            (Some(artist), None) => artist.clone(),
            (None, Some(album)) => album.clone(),
            (None, None) => String::new(),
        };
        let toggle_label = match status {
            SessionStatus::Playing => "Pause",
            _ => "Play",
        };
        let actions = [
            ACTION_PREVIOUS,
            "Previous",
            ACTION_PLAY_PAUSE,
            toggle_label,
            ACTION_NEXT,
            "Next",
        ];

        let resident = Value::from(true);
        let category = Value::from("x-gnome.music");
        let mut hints = HashMap::new();
        hints.insert("resident", &resident);
        hints.insert("category", &category);

        let new_id = self.proxy.notify(
            &self.app_name,
            self.id.load(Ordering::SeqCst),
            "audio-x-generic",
            &metadata.title,
            &body,
            &actions,
            &hints,
            0,
        )?;
        self.id.store(new_id, Ordering::SeqCst);
        Ok(())
    }

    fn dismiss(&mut self) -> Result<(), SessionError> {
        let id = self.id.swap(0, Ordering::SeqCst);
        if id != 0 {
            self.proxy.close_notification(id)?;
        }
        Ok(())
    }
}

/// Keeps the machine from idling away while audio plays.
pub struct IdleInhibitor {
    proxy: LoginManagerProxyBlocking<'static>,
    who: String,
    held: Option<OwnedFd>,
}

impl IdleInhibitor {
    pub fn connect(who: &str) -> Result<Self, SessionError> {
        let connection = Connection::system()?;
        let proxy = LoginManagerProxyBlocking::new(&connection)?;
        Ok(Self {
            proxy,
            who: who.to_string(),
            held: None,
        })
    }
}

impl ForegroundHost for IdleInhibitor {
    fn promote(&mut self) -> Result<(), SessionError> {
        if self.held.is_none() {
            let fd = self
                .proxy
                .inhibit("idle:sleep", &self.who, "Playing audio", "block")?;
            self.held = Some(fd);
        }
        Ok(())
    }

    fn demote(&mut self) {
        // Closing the descriptor releases the inhibitor.
        self.held.take();
    }
}
