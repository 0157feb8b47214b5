use std::{env, path::PathBuf};

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` reads an optional config file, then environment variables
/// (prefix `LEGATO__`) on top, and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("LEGATO")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.audio.sample_interval_ms == 0 {
            return Err("audio.sample_interval_ms must be >= 1".to_string());
        }
        if self.audio.completion_poll_ms == 0 {
            return Err("audio.completion_poll_ms must be >= 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.audio.duck_volume) {
            return Err("audio.duck_volume must be within 0.0..=1.0".to_string());
        }
        if self.session.identity.trim().is_empty() {
            return Err("session.identity must not be empty".to_string());
        }
        Ok(())
    }

    /// The library file to use: the configured one, or the XDG default.
    pub fn library_path(&self) -> Option<PathBuf> {
        self.storage
            .library_path
            .clone()
            .or_else(default_library_path)
    }
}

/// Resolve the config path from `LEGATO_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("LEGATO_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/legato/config.toml`
/// or `~/.config/legato/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    xdg_dir("XDG_CONFIG_HOME", ".config").map(|d| d.join("legato").join("config.toml"))
}

/// `$XDG_DATA_HOME/legato/library.toml`, or `~/.local/share/legato/library.toml`.
pub fn default_library_path() -> Option<PathBuf> {
    xdg_dir("XDG_DATA_HOME", ".local/share").map(|d| d.join("legato").join("library.toml"))
}

fn xdg_dir(var: &str, home_fallback: &str) -> Option<PathBuf> {
    if let Some(xdg) = env::var_os(var) {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(home_fallback))
    }
}
