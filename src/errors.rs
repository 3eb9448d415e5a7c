//! Defines the custom error types used throughout the `display_poller_rs` application.
//!
//! Errors are grouped by the layer that produces them: settings persistence,
//! the remote display API, and the presentation-side image pipeline. A
//! top-level `AppError` wraps them for `main`. Each error type implements
//! `Debug`, `Display`, and `std::error::Error`, and provides `From`
//! implementations for the underlying library errors.

use std::error::Error as StdError;
use std::fmt;

// --- ConfigError ---
/// Errors related to loading and storing the settings file.
#[must_use = "a configuration error should be handled or propagated"]
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading or writing the settings file.
    Io(std::io::Error),
    /// The settings file exists but could not be parsed.
    Parse(String),
    /// A key was present but its value could not be interpreted.
    InvalidValue { key: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Settings I/O error: {}", e),
            ConfigError::Parse(e) => write!(f, "Settings parse error: {}", e),
            ConfigError::InvalidValue { key, message } => {
                write!(f, "Invalid value for settings key '{}': {}", key, message)
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

// --- ApiError ---
/// Errors from a single call to the remote display API.
///
/// The `Display` text of these errors is what ends up after
/// `"Failed to fetch: "` on screen, so it is kept short.
#[must_use = "an API error should be handled or propagated"]
#[derive(Debug)]
pub enum ApiError {
    /// The request could not be sent or the body could not be read.
    Reqwest(reqwest::Error),
    /// The body was not valid display-response JSON.
    SerdeJson(serde_json::Error),
    /// The server answered with a non-success status.
    HttpError { status: reqwest::StatusCode, message: String },
    /// Anything else (used by test doubles and URL construction).
    Generic(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Reqwest(e) => write!(f, "{}", e),
            ApiError::SerdeJson(e) => write!(f, "invalid response body: {}", e),
            ApiError::HttpError { status, message } => write!(f, "HTTP {}: {}", status, message),
            ApiError::Generic(s) => write!(f, "{}", s),
        }
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ApiError::Reqwest(e) => Some(e),
            ApiError::SerdeJson(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Reqwest(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::SerdeJson(err)
    }
}

// --- MediaError ---
/// Errors related to downloading and decoding the image a surface displays.
#[must_use = "a media error should be handled or propagated"]
#[derive(Debug)]
pub enum MediaError {
    /// The image download failed.
    Download(reqwest::Error),
    /// The downloaded bytes could not be decoded by the `image` crate.
    Image(image::ImageError),
    /// A generic media-related error.
    Generic(String),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::Download(e) => write!(f, "Image download error: {}", e),
            MediaError::Image(e) => write!(f, "Image decode error: {}", e),
            MediaError::Generic(s) => write!(f, "Media error: {}", s),
        }
    }
}

impl StdError for MediaError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            MediaError::Download(e) => Some(e),
            MediaError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<image::ImageError> for MediaError {
    fn from(err: image::ImageError) -> Self { MediaError::Image(err) }
}
impl From<reqwest::Error> for MediaError {
    fn from(err: reqwest::Error) -> Self { MediaError::Download(err) }
}

// --- AppError (Top-level error enum) ---
/// A top-level error type that can encompass any error within the application.
#[must_use = "an application error should be handled or propagated"]
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Api(ApiError),
    Media(MediaError),
    /// The windowing layer failed to start or crashed.
    Gui(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "Application Configuration Error: {}", e),
            AppError::Api(e) => write!(f, "Application API Error: {}", e),
            AppError::Media(e) => write!(f, "Application Media Error: {}", e),
            AppError::Gui(s) => write!(f, "Application GUI Error: {}", s),
        }
    }
}

impl StdError for AppError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            AppError::Config(e) => Some(e),
            AppError::Api(e) => Some(e),
            AppError::Media(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self { AppError::Config(err) }
}
impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self { AppError::Api(err) }
}
impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self { AppError::Media(err) }
}
impl From<eframe::Error> for AppError {
    fn from(err: eframe::Error) -> Self { AppError::Gui(err.to_string()) }
}
