use super::load::{default_config_path, resolve_config_path};
use super::*;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_legato_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("LEGATO_CONFIG_PATH", "/tmp/legato-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/legato-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/xdg-config-home")
            .join("legato")
            .join("config.toml")
    );
}

#[test]
fn default_library_path_falls_back_to_home_local_share() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_DATA_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    let p = default_library_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/home-dir")
            .join(".local/share")
            .join("legato")
            .join("library.toml")
    );
}

#[test]
fn configured_library_path_wins_over_default() {
    let settings = Settings {
        storage: StorageSettings {
            library_path: Some("/srv/music/library.toml".into()),
        },
        ..Settings::default()
    };
    assert_eq!(
        settings.library_path().unwrap(),
        std::path::PathBuf::from("/srv/music/library.toml")
    );
}

#[test]
fn settings_load_from_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[audio]
sample_interval_ms = 500
completion_poll_ms = 50
duck_volume = 0.35

[playback]
shuffle = true

[library]
extensions = ["mp3"]
recursive = false
include_hidden = false
follow_links = false

[session]
identity = "carstereo"
notification = false

[storage]
library_path = "/tmp/legato/library.toml"
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("LEGATO_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("LEGATO__AUDIO__SAMPLE_INTERVAL_MS");

    let s = Settings::load().unwrap();
    assert_eq!(s.audio.sample_interval_ms, 500);
    assert_eq!(s.audio.completion_poll_ms, 50);
    assert!((s.audio.duck_volume - 0.35).abs() < f32::EPSILON);
    assert!(s.playback.shuffle);
    assert_eq!(s.library.extensions, vec!["mp3".to_string()]);
    assert!(!s.library.recursive);
    assert!(!s.library.include_hidden);
    assert!(!s.library.follow_links);
    assert_eq!(s.session.identity, "carstereo");
    assert!(!s.session.notification);
    assert!(s.session.automotive);
    assert_eq!(
        s.storage.library_path,
        Some(std::path::PathBuf::from("/tmp/legato/library.toml"))
    );
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[audio]
sample_interval_ms = 250
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("LEGATO_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("LEGATO__AUDIO__SAMPLE_INTERVAL_MS", "2000");

    let s = Settings::load().unwrap();
    assert_eq!(s.audio.sample_interval_ms, 2000);
}

#[test]
fn validate_rejects_zero_intervals_and_bad_duck_volume() {
    let mut s = Settings::default();
    assert!(s.validate().is_ok());

    s.audio.sample_interval_ms = 0;
    assert!(s.validate().is_err());

    s = Settings::default();
    s.audio.duck_volume = 1.5;
    assert!(s.validate().is_err());

    s = Settings::default();
    s.session.identity = "  ".into();
    assert!(s.validate().is_err());
}
