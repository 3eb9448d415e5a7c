//! Persistent storage for the user-editable settings.
//!
//! The five settings fields live in the `[settings]` section of an INI file.
//! The store keeps the current [`Settings`] tuple in a `tokio::sync::watch`
//! slot: saving through [`SettingsStore::update`] or editing the file on disk
//! (picked up by [`SettingsStore::watch_file`]) publishes a new tuple, and the
//! poller restarts on every tuple that differs from the previous one.

use crate::errors::ConfigError;
use crate::model::{Mode, Settings, DEFAULT_CUSTOM_REFRESH_SECONDS};
use configparser::ini::Ini;
use log::{debug, error, info, trace, warn};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

const SECTION: &str = "settings";
const KEY_USE_CUSTOM_MODE: &str = "use_custom_mode";
const KEY_API_KEY: &str = "api_key";
const KEY_MAC_ADDRESS: &str = "mac_address";
const KEY_CUSTOM_URL: &str = "custom_url";
const KEY_CUSTOM_REFRESH_SECONDS: &str = "custom_refresh_seconds";

/// File-backed settings with change notification.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    tx: watch::Sender<Settings>,
    /// File contents as last read or written by us.
    last_contents: Mutex<Option<String>>,
}

impl SettingsStore {
    /// Opens the store at `path` and loads its current contents.
    ///
    /// A missing file is not an error: it yields unconfigured default settings,
    /// which the poller reports as "please configure".
    ///
    /// # Errors
    /// Returns `ConfigError` if the file exists but cannot be read or parsed.
    #[must_use = "opening the settings store can fail, the Result must be handled"]
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        info!("Opening settings store at: {}", path.display());
        let (settings, contents) = match read_settings_file(&path)? {
            Some((settings, contents)) => (settings, Some(contents)),
            None => {
                info!("Settings file {} does not exist yet; starting unconfigured.", path.display());
                (Settings::default(), None)
            }
        };
        debug!("Initial settings: {:?}", redacted(&settings));
        let (tx, _rx) = watch::channel(settings);
        Ok(Self { path, tx, last_contents: Mutex::new(contents) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A receiver that always holds the latest settings tuple.
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    /// Snapshot of the current settings tuple.
    pub fn current(&self) -> Settings {
        self.tx.borrow().clone()
    }

    /// Writes `settings` to disk and publishes them.
    ///
    /// Returns whether the published tuple changed. Saving the tuple that is
    /// already current rewrites the file but does not notify subscribers.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for a zero refresh period, or
    /// `ConfigError::Io` if the file cannot be written.
    pub fn update(&self, settings: Settings) -> Result<bool, ConfigError> {
        if settings.custom_refresh_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: KEY_CUSTOM_REFRESH_SECONDS.to_string(),
                message: "refresh period must be at least one second".to_string(),
            });
        }
        let written = write_settings_file(&self.path, &settings)?;
        *self.last_contents.lock().unwrap_or_else(|p| p.into_inner()) = Some(written);
        let changed = self.publish(settings);
        info!("Settings saved to {} (changed: {})", self.path.display(), changed);
        Ok(changed)
    }

    /// Re-reads the file if its contents differ from what we last read or wrote.
    ///
    /// Returns whether a different tuple was published.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file exists but cannot be read or parsed.
    pub fn reload_if_changed(&self) -> Result<bool, ConfigError> {
        let Some(contents) = read_contents(&self.path)? else {
            trace!("Settings file {} does not exist.", self.path.display());
            return Ok(false);
        };
        {
            let mut last = self.last_contents.lock().unwrap_or_else(|p| p.into_inner());
            if last.as_deref() == Some(contents.as_str()) {
                trace!("Settings file {} unchanged.", self.path.display());
                return Ok(false);
            }
            *last = Some(contents.clone());
        }
        let changed = self.publish(parse_settings(&contents)?);
        if changed {
            info!("Settings file {} was edited externally; new settings published.", self.path.display());
        }
        Ok(changed)
    }

    /// Polls the settings file for external edits until the task is dropped.
    pub async fn watch_file(self: Arc<Self>, poll_interval: Duration) {
        info!("Watching settings file {} every {:?}", self.path.display(), poll_interval);
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.reload_if_changed() {
                error!("Failed to reload settings file {}: {}. Will retry.", self.path.display(), e);
            }
        }
    }

    fn publish(&self, settings: Settings) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == settings {
                false
            } else {
                debug!("Publishing settings: {:?}", redacted(&settings));
                *current = settings;
                true
            }
        })
    }
}

fn read_contents(path: &Path) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(c) => Ok(Some(c)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => {
            error!("Error reading settings file '{}': {}", path.display(), e);
            Err(ConfigError::Io(e))
        }
    }
}

/// Reads and parses the settings file; `Ok(None)` when it does not exist.
fn read_settings_file(path: &Path) -> Result<Option<(Settings, String)>, ConfigError> {
    match read_contents(path)? {
        Some(contents) => Ok(Some((parse_settings(&contents)?, contents))),
        None => Ok(None),
    }
}

/// An `Ini` that keeps `#` and `;` inside values (URL fragments, tokens).
fn settings_ini() -> Ini {
    let mut ini = Ini::new();
    ini.set_comment_symbols(&[]);
    ini
}

fn is_comment_line(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with('#') || line.starts_with(';')
}

/// Parses INI text into a settings tuple.
///
/// Missing keys take their defaults. Unreadable values are logged and also
/// fall back to defaults, so a hand-edited file never blocks the display.
/// Only whole lines starting with `#` or `;` are comments.
pub fn parse_settings(contents: &str) -> Result<Settings, ConfigError> {
    let body: Vec<&str> = contents.lines().filter(|line| !is_comment_line(line)).collect();
    let mut ini = settings_ini();
    ini.read(body.join("\n")).map_err(ConfigError::Parse)?;

    let text = |key: &str| ini.get(SECTION, key).map(|v| v.trim().to_string()).unwrap_or_default();

    let use_custom = match ini.getboolcoerce(SECTION, KEY_USE_CUSTOM_MODE) {
        Ok(v) => v.unwrap_or(false),
        Err(e) => {
            warn!("Ignoring unreadable '{}': {}", KEY_USE_CUSTOM_MODE, e);
            false
        }
    };
    let custom_refresh_seconds = match ini.getuint(SECTION, KEY_CUSTOM_REFRESH_SECONDS) {
        Ok(Some(0)) | Ok(None) => DEFAULT_CUSTOM_REFRESH_SECONDS,
        Ok(Some(secs)) => secs,
        Err(e) => {
            warn!("Ignoring unreadable '{}': {}", KEY_CUSTOM_REFRESH_SECONDS, e);
            DEFAULT_CUSTOM_REFRESH_SECONDS
        }
    };

    Ok(Settings {
        mode: if use_custom { Mode::Custom } else { Mode::Managed },
        api_key: text(KEY_API_KEY),
        mac_address: text(KEY_MAC_ADDRESS),
        custom_url: text(KEY_CUSTOM_URL),
        custom_refresh_seconds,
    })
}

/// Writes the settings file and returns the text written.
fn write_settings_file(path: &Path, settings: &Settings) -> Result<String, ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut ini = settings_ini();
    let use_custom = settings.mode == Mode::Custom;
    ini.set(SECTION, KEY_USE_CUSTOM_MODE, Some(use_custom.to_string()));
    ini.set(SECTION, KEY_API_KEY, Some(settings.api_key.clone()));
    ini.set(SECTION, KEY_MAC_ADDRESS, Some(settings.mac_address.clone()));
    ini.set(SECTION, KEY_CUSTOM_URL, Some(settings.custom_url.clone()));
    ini.set(SECTION, KEY_CUSTOM_REFRESH_SECONDS, Some(settings.custom_refresh_seconds.to_string()));
    let contents = ini.writes();
    std::fs::write(path, &contents).map_err(|e| {
        error!("Error writing settings file '{}': {}", path.display(), e);
        ConfigError::Io(e)
    })?;
    Ok(contents)
}

/// Settings with the access token masked, for logs.
fn redacted(settings: &Settings) -> Settings {
    let mut shown = settings.clone();
    if !shown.api_key.is_empty() {
        shown.api_key = "***".to_string();
    }
    shown
}
