//! Music library: the `Track` value, the playlist ordering and the two
//! collaborators the core consumes (a scanner and a persistent store).

mod model;
mod playlist;
mod scan;
mod store;

pub use model::Track;
pub use playlist::Playlist;
pub use scan::{DirectoryScanner, TrackScanner};
pub use store::{FileStore, LibraryStore, StoreError};
