use crossbeam_channel::{Receiver, never, select};

use crate::coordinator::Coordinator;
use crate::runtime::console::{self, ConsoleCmd};

/// Presentation loop: logs now-playing changes from the view streams and
/// applies console commands until a quit is requested from the console or
/// from a session adapter.
pub fn run(coordinator: &Coordinator, commands: Receiver<ConsoleCmd>, quit: Receiver<()>) {
    let view = coordinator.view();
    let current = view.current.subscribe();
    let playing = view.playing.subscribe();
    let loading = view.loading.subscribe();
    let shuffle = view.shuffle.subscribe();
    let mut commands = commands;
    let mut was_loading = false;

    loop {
        select! {
            recv(current) -> msg => match msg {
                Ok(Some(track)) => log::info!("now playing: {}", console::describe(&track)),
                Ok(None) => log::info!("nothing playing"),
                Err(_) => break,
            },
            recv(playing) -> msg => match msg {
                Ok(p) => log::debug!("playing: {p}"),
                Err(_) => break,
            },
            recv(loading) -> msg => match msg {
                Ok(true) => {
                    was_loading = true;
                    log::info!("loading library...");
                }
                Ok(false) if was_loading => {
                    log::info!("library ready: {} tracks", view.tracks.get().len());
                }
                Ok(false) => {}
                Err(_) => break,
            },
            recv(shuffle) -> msg => match msg {
                Ok(on) => log::info!("shuffle {}", if on { "on" } else { "off" }),
                Err(_) => break,
            },
            recv(commands) -> msg => match msg {
                Ok(cmd) => {
                    if !console::apply(coordinator, cmd) {
                        break;
                    }
                }
                // Stdin closed; keep running for the session adapters.
                Err(_) => commands = never(),
            },
            recv(quit) -> _ => break,
        }
    }
    log::info!("shutting down");
}
