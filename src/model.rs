//! Defines the core data structures used by the poller and the surfaces.
//!
//! This includes the settings tuple that drives the poller, the JSON response
//! of the remote display API, and the UI state every surface renders.

use serde::Deserialize;

/// Refresh period used in Custom mode when the user never set one.
pub const DEFAULT_CUSTOM_REFRESH_SECONDS: u64 = 900;

/// Which credential set the poller consults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Poll the hosted display API with an access token and device id.
    #[default]
    Managed,
    /// Show a user-supplied image URL, cache-busted on a fixed period.
    Custom,
}

/// A full configuration snapshot. Every distinct value restarts the poller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub mode: Mode,
    /// Access token sent as the `access-token` header.
    pub api_key: String,
    /// Device identifier (MAC address) sent as the `id` header.
    pub mac_address: String,
    pub custom_url: String,
    pub custom_refresh_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::Managed,
            api_key: String::new(),
            mac_address: String::new(),
            custom_url: String::new(),
            custom_refresh_seconds: DEFAULT_CUSTOM_REFRESH_SECONDS,
        }
    }
}

impl Settings {
    /// Builds a Managed-mode tuple.
    pub fn managed(api_key: impl Into<String>, mac_address: impl Into<String>) -> Self {
        Self {
            mode: Mode::Managed,
            api_key: api_key.into(),
            mac_address: mac_address.into(),
            ..Self::default()
        }
    }

    /// Builds a Custom-mode tuple.
    pub fn custom(custom_url: impl Into<String>, custom_refresh_seconds: u64) -> Self {
        Self {
            mode: Mode::Custom,
            custom_url: custom_url.into(),
            custom_refresh_seconds,
            ..Self::default()
        }
    }
}

/// Credentials for one Managed-mode run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub device_id: String,
}

/// Body of `GET /api/display`. Every field is optional; unknown fields are ignored.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DisplayResponse {
    #[serde(default)]
    pub image_url: Option<String>,
    /// Seconds until the next fetch.
    #[serde(default)]
    pub refresh_rate: Option<i64>,
    /// Minutes until the next fetch, used when `refresh_rate` is missing.
    #[serde(default)]
    pub reset_duration: Option<i64>,
}

impl DisplayResponse {
    /// The image URL, treating an empty string the same as a missing field.
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref().filter(|url| !url.trim().is_empty())
    }
}

/// What the surfaces should currently show. Only the latest value matters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiState {
    Loading,
    Success { image_url: String },
    Error { message: String },
}

impl UiState {
    pub fn error(message: impl Into<String>) -> Self {
        UiState::Error { message: message.into() }
    }

    pub fn success(image_url: impl Into<String>) -> Self {
        UiState::Success { image_url: image_url.into() }
    }
}
