use std::time::Duration;

use crate::authority::NowPlaying;
use crate::library::Track;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    Playing,
    Paused,
    #[default]
    Stopped,
}

impl SessionStatus {
    /// MPRIS `PlaybackStatus` spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Stopped => "Stopped",
        }
    }
}

/// What an OS session shows for the current track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionMetadata {
    pub id: String,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Option<Duration>,
    pub url: String,
}

impl From<&Track> for SessionMetadata {
    fn from(t: &Track) -> Self {
        Self {
            id: t.id.clone(),
            title: t.title.clone(),
            artist: t.artist.clone(),
            album: t.album.clone(),
            duration: t.duration,
            url: format!("file://{}", t.path.display()),
        }
    }
}

/// Project the shared state into session metadata and a tri-state status.
/// No track means stopped; a track that is not playing means paused.
pub fn project(state: &NowPlaying) -> (Option<SessionMetadata>, SessionStatus) {
    match &state.track {
        None => (None, SessionStatus::Stopped),
        Some(t) => {
            let status = if state.playing {
                SessionStatus::Playing
            } else {
                SessionStatus::Paused
            };
            (Some(SessionMetadata::from(t)), status)
        }
    }
}
