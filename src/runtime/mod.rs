use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::{Sender, unbounded};

use crate::audio::{AudioEngine, SharedFocus};
use crate::authority::Authority;
use crate::config::Settings;
use crate::coordinator::Coordinator;
use crate::library::{DirectoryScanner, FileStore, LibraryStore, Track};
use crate::mpris::{MprisConfig, spawn_mpris};
use crate::session::{
    AutomotiveAdapter, DesktopNotifications, ForegroundHost, IdleInhibitor, NotificationAdapter,
    SessionTask, StatusSurface, TransportCommand, load_snapshot,
};

mod console;
mod event_loop;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = settings::load_settings();

    let dir = env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| {
        env::current_dir().unwrap_or_else(|_| PathBuf::from("Music"))
    });

    let focus = Arc::new(SharedFocus::new());
    let (engine, events) = AudioEngine::open_default(focus, &settings.audio)?;

    let library_path = settings.library_path().unwrap_or_else(|| {
        log::warn!("no data directory found, keeping the library next to the music");
        dir.join(".legato-library.toml")
    });
    let store: Arc<dyn LibraryStore> = Arc::new(FileStore::new(library_path));
    let scanner = Arc::new(DirectoryScanner::new(dir, settings.library.clone()));
    let authority = Authority::new();

    // The browse host may bind before the coordinator exists; it works from
    // what was persisted last time.
    let snapshot = if settings.session.automotive {
        load_snapshot(store.as_ref())
    } else {
        Vec::new()
    };

    let coordinator = Coordinator::start(engine, events, authority.clone(), store, scanner);

    let (quit_tx, quit_rx) = unbounded::<()>();
    let sessions = start_sessions(&settings, &coordinator, &authority, snapshot, quit_tx.clone());

    startup::load_library(&coordinator, &settings);

    let (console_tx, console_rx) = unbounded();
    console::spawn_reader(console_tx);
    println!("{}", console::HELP);

    event_loop::run(&coordinator, console_rx, quit_rx);

    drop(sessions);
    drop(quit_tx);
    coordinator.release();
    Ok(())
}

fn start_sessions(
    settings: &Settings,
    coordinator: &Arc<Coordinator>,
    authority: &Authority,
    snapshot: Vec<Track>,
    quit: Sender<()>,
) -> Vec<SessionTask> {
    let identity = &settings.session.identity;
    let mut tasks = Vec::new();

    if settings.session.notification {
        let (tx, rx) = unbounded::<TransportCommand>();
        let session = spawn_mpris(
            MprisConfig {
                bus_name: identity.clone(),
                identity: identity.clone(),
                track_list: false,
            },
            tx.clone(),
        );

        let surface: Option<Box<dyn StatusSurface>> =
            match DesktopNotifications::connect(identity, tx) {
                Ok(n) => Some(Box::new(n)),
                Err(e) => {
                    log::warn!("desktop notifications unavailable: {e}");
                    None
                }
            };
        let host: Option<Box<dyn ForegroundHost>> = match IdleInhibitor::connect(identity) {
            Ok(i) => Some(Box::new(i)),
            Err(e) => {
                log::warn!("idle inhibitor unavailable: {e}");
                None
            }
        };

        let adapter = NotificationAdapter::new(
            coordinator.clone(),
            Arc::new(session),
            surface,
            host,
            quit,
        );
        tasks.extend(adapter.spawn(authority, coordinator.view(), rx));
    }

    if settings.session.automotive {
        let (tx, rx) = unbounded::<TransportCommand>();
        let session = spawn_mpris(
            MprisConfig {
                bus_name: format!("{identity}.browse"),
                identity: format!("{identity} (library)"),
                track_list: true,
            },
            tx,
        );

        let adapter = AutomotiveAdapter::new(authority.clone(), snapshot, Arc::new(session));
        tasks.extend(adapter.spawn(coordinator.view(), rx));
        adapter.attach_coordinator(coordinator.clone());
    }

    tasks
}
