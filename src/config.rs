//! Handles launcher configuration.
//!
//! This module defines the `AppConfig` struct which holds the parameters that
//! are fixed for the lifetime of the process (settings file location, API
//! base URL, HTTP timeouts, which surface to host). They come from the command
//! line; the user-editable settings live in [`crate::settings_store`].

use clap::Parser;
use directories::ProjectDirs;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://usetrmnl.com";
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SETTINGS_FILE_NAME: &str = "settings.ini";

/// Command-line flags.
#[derive(Debug, Clone, Parser)]
#[command(name = "display_poller_rs", about = "Full-screen display client for a hosted image API")]
pub struct Cli {
    /// Path to the settings file. Defaults to the platform config directory.
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Base URL of the display API.
    #[arg(long, default_value = DEFAULT_API_BASE_URL)]
    pub api_base_url: String,

    /// Run as a screensaver: any input closes the window.
    #[arg(long)]
    pub screensaver: bool,

    /// Do not go full-screen.
    #[arg(long)]
    pub windowed: bool,

    /// How often to check the settings file for external edits (seconds).
    #[arg(long, default_value_t = 2)]
    pub settings_poll_secs: u64,
}

/// Which presentation host to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceKind {
    Window,
    Screensaver,
}

/// Holds the application's launcher configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub settings_path: PathBuf,
    pub api_base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub surface: SurfaceKind,
    pub fullscreen: bool,
    pub settings_poll_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            surface: SurfaceKind::Window,
            fullscreen: true,
            settings_poll_interval: Duration::from_secs(2),
        }
    }
}

impl AppConfig {
    /// Builds the configuration from parsed command-line flags.
    pub fn from_cli(cli: Cli) -> Self {
        let settings_path = cli.settings.unwrap_or_else(default_settings_path);
        let surface = if cli.screensaver { SurfaceKind::Screensaver } else { SurfaceKind::Window };
        let app_config = Self {
            settings_path,
            api_base_url: cli.api_base_url.trim_end_matches('/').to_string(),
            surface,
            fullscreen: !cli.windowed,
            settings_poll_interval: Duration::from_secs(cli.settings_poll_secs.max(1)),
            ..Self::default()
        };
        info!("Launcher configuration: {:?}", app_config);
        app_config
    }
}

/// `<config dir>/display_poller/settings.ini`, or `./settings.ini` when the
/// platform has no home directory.
pub fn default_settings_path() -> PathBuf {
    match ProjectDirs::from("", "", "display_poller") {
        Some(dirs) => {
            let path = dirs.config_dir().join(SETTINGS_FILE_NAME);
            debug!("Default settings path: {}", path.display());
            path
        }
        None => {
            warn!("No platform config directory; using ./{}", SETTINGS_FILE_NAME);
            PathBuf::from(SETTINGS_FILE_NAME)
        }
    }
}
