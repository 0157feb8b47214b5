//! Configuration loader and schema types.
//!
//! This module exposes the settings schema that drives the engine, the
//! library scanner, the session adapters and the library store, plus helpers
//! to locate and load the configuration file.

mod load;
mod schema;

pub use load::default_library_path;
pub use schema::*;

#[cfg(test)]
mod tests;
