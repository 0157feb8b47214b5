//! MPRIS exporter: the desktop's media session.
//!
//! Serves `org.mpris.MediaPlayer2` and `.Player` on the session bus, and
//! `.TrackList` when a browse tree is offered. Methods called by the desktop
//! become `TransportCommand`s on the given channel; state pushed through
//! `MediaSession` is served from a shared snapshot and announced with
//! `PropertiesChanged`.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use async_io::{Timer, block_on};
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

use crate::session::{BrowseItem, MediaSession, SessionMetadata, SessionStatus, TransportCommand};

const PATH: &str = "/org/mpris/MediaPlayer2";
const NO_TRACK: &str = "/org/mpris/MediaPlayer2/TrackList/NoTrack";

#[derive(Clone, Debug)]
pub struct MprisConfig {
    /// Well-known name suffix: `org.mpris.MediaPlayer2.<bus_name>`.
    pub bus_name: String,
    pub identity: String,
    /// Export the TrackList interface with the browse items.
    pub track_list: bool,
}

#[derive(Debug, Default)]
struct SharedState {
    status: SessionStatus,
    metadata: Option<SessionMetadata>,
    position: Duration,
    items: Vec<BrowseItem>,
}

#[derive(Copy, Clone, Debug)]
enum Changed {
    Player,
    TrackList,
}

fn lock(state: &Mutex<SharedState>) -> MutexGuard<'_, SharedState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle used to publish state; cheap to clone.
#[derive(Clone)]
pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
    notify: Sender<Changed>,
}

impl MediaSession for MprisHandle {
    fn set_metadata(&self, metadata: Option<&SessionMetadata>) {
        let mut s = lock(&self.state);
        if s.metadata.as_ref() != metadata {
            s.metadata = metadata.cloned();
            s.position = Duration::ZERO;
            let _ = self.notify.send(Changed::Player);
        }
    }

    fn set_status(&self, status: SessionStatus) {
        let mut s = lock(&self.state);
        if s.status != status {
            s.status = status;
            let _ = self.notify.send(Changed::Player);
        }
    }

    fn set_position(&self, position: Duration) {
        // Position is polled by clients, never signalled.
        lock(&self.state).position = position;
    }

    fn set_browse_items(&self, items: &[BrowseItem]) {
        lock(&self.state).items = items.to_vec();
        let _ = self.notify.send(Changed::TrackList);
    }
}

/// Object path standing for the track with `id`.
fn track_path(id: &str) -> OwnedObjectPath {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let path = format!("{PATH}/track/{:016x}", hasher.finish());
    OwnedObjectPath::try_from(path)
        .unwrap_or_else(|_| ObjectPath::from_static_str_unchecked(NO_TRACK).into())
}

fn insert(map: &mut HashMap<String, OwnedValue>, key: &str, value: Value<'_>) {
    if let Ok(v) = OwnedValue::try_from(value) {
        map.insert(key.to_string(), v);
    }
}

fn metadata_map(meta: &SessionMetadata) -> HashMap<String, OwnedValue> {
    let mut map = HashMap::new();
    insert(&mut map, "mpris:trackid", Value::from(track_path(&meta.id).into_inner()));
    insert(&mut map, "xesam:title", Value::from(meta.title.clone()));
    if let Some(artist) = &meta.artist {
        insert(&mut map, "xesam:artist", Value::from(vec![artist.clone()]));
    }
    if let Some(album) = &meta.album {
        insert(&mut map, "xesam:album", Value::from(album.clone()));
    }
    insert(&mut map, "xesam:url", Value::from(meta.url.clone()));
    if let Some(length) = meta.duration {
        insert(&mut map, "mpris:length", Value::from(length.as_micros() as i64));
    }
    map
}

fn item_map(item: &BrowseItem) -> HashMap<String, OwnedValue> {
    let mut map = HashMap::new();
    insert(&mut map, "mpris:trackid", Value::from(track_path(&item.id).into_inner()));
    insert(&mut map, "xesam:title", Value::from(item.title.clone()));
    if let Some(artist) = &item.subtitle {
        insert(&mut map, "xesam:artist", Value::from(vec![artist.clone()]));
    }
    map
}

struct RootIface {
    tx: Sender<TransportCommand>,
    identity: String,
    track_list: bool,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        // Nothing to raise.
    }

    fn quit(&self) {
        let _ = self.tx.send(TransportCommand::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        self.track_list
    }

    #[zbus(property)]
    fn identity(&self) -> String {
        self.identity.clone()
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["file".to_string()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<TransportCommand>,
    state: Arc<Mutex<SharedState>>,
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        let _ = self.tx.send(TransportCommand::SkipNext);
    }

    fn previous(&self) {
        let _ = self.tx.send(TransportCommand::SkipPrevious);
    }

    fn play(&self) {
        let _ = self.tx.send(TransportCommand::Play);
    }

    fn pause(&self) {
        let _ = self.tx.send(TransportCommand::Pause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(TransportCommand::PlayPause);
    }

    fn stop(&self) {
        let _ = self.tx.send(TransportCommand::Stop);
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        lock(&self.state).status.as_str()
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        lock(&self.state)
            .metadata
            .as_ref()
            .map(metadata_map)
            .unwrap_or_default()
    }

    /// Microseconds.
    #[zbus(property)]
    fn position(&self) -> i64 {
        lock(&self.state).position.as_micros() as i64
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }
}

struct TrackListIface {
    tx: Sender<TransportCommand>,
    state: Arc<Mutex<SharedState>>,
}

impl TrackListIface {
    fn item_at(&self, path: &OwnedObjectPath) -> Option<BrowseItem> {
        lock(&self.state)
            .items
            .iter()
            .find(|i| &track_path(&i.id) == path)
            .cloned()
    }
}

#[interface(name = "org.mpris.MediaPlayer2.TrackList")]
impl TrackListIface {
    fn get_tracks_metadata(&self, track_ids: Vec<OwnedObjectPath>) -> Vec<HashMap<String, OwnedValue>> {
        track_ids
            .iter()
            .filter_map(|p| self.item_at(p))
            .map(|i| item_map(&i))
            .collect()
    }

    fn go_to(&self, track_id: OwnedObjectPath) {
        if let Some(item) = self.item_at(&track_id) {
            let _ = self.tx.send(TransportCommand::PlayItem(item.id));
        }
    }

    fn add_track(&self, _uri: String, _after_track: OwnedObjectPath, _set_as_current: bool) {
        log::debug!("MPRIS: AddTrack is not supported");
    }

    fn remove_track(&self, _track_id: OwnedObjectPath) {
        log::debug!("MPRIS: RemoveTrack is not supported");
    }

    #[zbus(property)]
    fn tracks(&self) -> Vec<OwnedObjectPath> {
        lock(&self.state)
            .items
            .iter()
            .map(|i| track_path(&i.id))
            .collect()
    }

    #[zbus(property)]
    fn can_edit_tracks(&self) -> bool {
        false
    }
}

/// Export a player on the session bus. Bus failures are logged and leave
/// the returned handle working against a session nobody sees.
pub fn spawn_mpris(config: MprisConfig, tx: Sender<TransportCommand>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (notify_tx, notify_rx) = unbounded::<Changed>();

    let state_for_thread = state.clone();
    let name = config.bus_name.clone();
    let spawned = thread::Builder::new()
        .name(format!("mpris-{name}"))
        .spawn(move || block_on(serve(config, tx, state_for_thread, notify_rx)));
    if let Err(e) = spawned {
        log::warn!("MPRIS: could not start {name}: {e}");
    }

    MprisHandle {
        state,
        notify: notify_tx,
    }
}

async fn serve(
    config: MprisConfig,
    tx: Sender<TransportCommand>,
    state: Arc<Mutex<SharedState>>,
    notify: Receiver<Changed>,
) {
    let connection = match Connection::session().await {
        Ok(c) => c,
        Err(e) => {
            log::warn!("MPRIS: failed to connect to session bus: {e}");
            return;
        }
    };

    let well_known = format!("org.mpris.MediaPlayer2.{}", config.bus_name);
    if let Err(e) = connection.request_name(well_known.as_str()).await {
        log::warn!("MPRIS: failed to acquire {well_known}: {e}");
        return;
    }

    let object_server = connection.object_server();

    let root = RootIface {
        tx: tx.clone(),
        identity: config.identity.clone(),
        track_list: config.track_list,
    };
    if let Err(e) = object_server.at(PATH, root).await {
        log::warn!("MPRIS: failed to register root iface: {e}");
        return;
    }

    let player = PlayerIface {
        tx: tx.clone(),
        state: state.clone(),
    };
    if let Err(e) = object_server.at(PATH, player).await {
        log::warn!("MPRIS: failed to register player iface: {e}");
        return;
    }

    if config.track_list {
        if let Err(e) = object_server.at(PATH, TrackListIface { tx, state }).await {
            log::warn!("MPRIS: failed to register track list iface: {e}");
        }
    }
    log::info!("MPRIS: serving {well_known}");

    loop {
        Timer::after(Duration::from_millis(100)).await;

        let (mut player, mut list) = (false, false);
        loop {
            match notify.try_recv() {
                Ok(Changed::Player) => player = true,
                Ok(Changed::TrackList) => list = true,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return,
            }
        }

        if player {
            if let Ok(iface) = object_server.interface::<_, PlayerIface>(PATH).await {
                let emitter = iface.signal_emitter();
                let p = iface.get().await;
                let _ = p.playback_status_changed(emitter).await;
                let _ = p.metadata_changed(emitter).await;
            }
        }
        if list && config.track_list {
            if let Ok(iface) = object_server.interface::<_, TrackListIface>(PATH).await {
                let emitter = iface.signal_emitter();
                let _ = iface.get().await.tracks_changed(emitter).await;
            }
        }
    }
}
