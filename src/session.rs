//! OS media-session surfaces.
//!
//! Adapters translate the shared `Authority` state (plus position from the
//! coordinator's view) into what an OS session shows, and route the
//! transport commands the OS sends back into the coordinator.
//!
//! - `projection`: `SessionStatus`, `SessionMetadata` and `project`
//! - `transport`: `TransportCommand`, `TransportTarget`, `dispatch`
//! - `notification`: persistent status surface + media session
//! - `automotive`: flat browse tree with its own startup snapshot
//! - `desktop`: freedesktop notification surface and logind inhibitor

mod automotive;
mod desktop;
mod notification;
mod projection;
mod transport;

pub use automotive::{AutomotiveAdapter, BrowseItem, ROOT_ID, load_snapshot};
pub use desktop::{DesktopNotifications, IdleInhibitor};
pub use notification::{ForegroundHost, NotificationAdapter, StatusSurface};
pub use projection::{SessionMetadata, SessionStatus, project};
pub use transport::{TransportCommand, TransportTarget, dispatch};

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Sender;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("D-Bus error: {0}")]
    Bus(zbus::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zbus::Error> for SessionError {
    fn from(e: zbus::Error) -> Self {
        if let zbus::Error::MethodError(name, detail, _) = &e {
            let name = name.as_str();
            if name.ends_with("AccessDenied") || name.ends_with("PermissionDenied") {
                return Self::PermissionDenied(detail.clone().unwrap_or_else(|| name.to_string()));
            }
        }
        Self::Bus(e)
    }
}

/// The OS-side media session an adapter publishes into.
pub trait MediaSession: Send + Sync {
    fn set_metadata(&self, metadata: Option<&SessionMetadata>);
    fn set_status(&self, status: SessionStatus);
    fn set_position(&self, position: Duration);
    /// Items offered for browsing. Sessions without a browse tree ignore it.
    fn set_browse_items(&self, _items: &[BrowseItem]) {}
}

/// A running adapter loop. Stopping it joins the thread.
pub struct SessionTask {
    stop: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl SessionTask {
    pub(crate) fn new(stop: Sender<()>, join: JoinHandle<()>) -> Self {
        Self {
            stop: Some(stop),
            join: Some(join),
        }
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.take();
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}

impl Drop for SessionTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}
