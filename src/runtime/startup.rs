use std::sync::Arc;
use std::thread;

use crate::config;
use crate::coordinator::Coordinator;

/// Load the library in the background, then apply the playback defaults
/// that need a playlist to act on.
pub fn load_library(coordinator: &Arc<Coordinator>, settings: &config::Settings) {
    let shuffle = settings.playback.shuffle;
    let this = Arc::clone(coordinator);
    let spawned = thread::Builder::new()
        .name("library-load".into())
        .spawn(move || {
            this.load_library();
            if shuffle {
                this.set_shuffle(true);
            }
        });
    if let Err(e) = spawned {
        log::warn!("could not load the library in the background: {e}");
        coordinator.load_library();
        coordinator.set_shuffle(shuffle);
    }
}
