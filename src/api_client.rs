//! Handles all interactions with the remote display API.
//!
//! One call is one `GET /api/display` carrying the device credentials and a
//! fixed set of emulated-device headers. The client never retries; the poller
//! owns the retry policy.

use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::model::{Credentials, DisplayResponse};
use log::{debug, error, info, trace};
use reqwest::Client;
use std::future::Future;

pub const HEADER_ACCESS_TOKEN: &str = "access-token";
pub const HEADER_DEVICE_ID: &str = "id";
pub const HEADER_BATTERY_VOLTAGE: &str = "battery-voltage";
pub const HEADER_WIFI_RSSI: &str = "wifi-rssi";
pub const HEADER_FW_VERSION: &str = "fw-version";

/// Placeholder device telemetry; this client has no battery or radio to report.
pub const EMULATED_BATTERY_VOLTAGE: &str = "5.0";
pub const EMULATED_WIFI_RSSI: &str = "-50";
pub const EMULATED_FW_VERSION: &str = "1.0.0";

/// Source of display responses for the poller.
pub trait DisplayApi: Send + Sync + 'static {
    /// Performs exactly one request for the current display.
    fn fetch(&self, credentials: &Credentials) -> impl Future<Output = Result<DisplayResponse, ApiError>> + Send;
}

/// Builds the HTTP client shared by the API client and the image loader.
///
/// # Errors
/// Returns `ApiError::Reqwest` if the TLS backend cannot be initialised.
pub fn build_http_client(config: &AppConfig) -> Result<Client, ApiError> {
    debug!(
        "Building HTTP client (connect timeout {:?}, request timeout {:?})",
        config.connect_timeout, config.request_timeout
    );
    let client = Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .build()?;
    Ok(client)
}

/// `reqwest`-backed client for `GET <base>/api/display`.
#[derive(Clone, Debug)]
pub struct DisplayApiClient {
    client: Client,
    display_url: String,
}

impl DisplayApiClient {
    /// Builds a client with the configured connect and request timeouts.
    ///
    /// # Errors
    /// Returns `ApiError::Reqwest` if the TLS backend cannot be initialised.
    #[must_use = "building the API client can fail; the Result must be handled"]
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        let client = build_http_client(config)?;
        Ok(Self::with_client(client, &config.api_base_url))
    }

    /// Wraps an existing `reqwest::Client`, e.g. one shared with the image loader.
    pub fn with_client(client: Client, api_base_url: &str) -> Self {
        let display_url = format!("{}/api/display", api_base_url.trim_end_matches('/'));
        info!("Display API endpoint: {}", display_url);
        Self { client, display_url }
    }

    pub fn display_url(&self) -> &str {
        &self.display_url
    }
}

impl DisplayApi for DisplayApiClient {
    async fn fetch(&self, credentials: &Credentials) -> Result<DisplayResponse, ApiError> {
        debug!("Fetching display for device id: {}", credentials.device_id);
        let response = self
            .client
            .get(&self.display_url)
            .header(HEADER_ACCESS_TOKEN, &credentials.api_key)
            .header(HEADER_DEVICE_ID, &credentials.device_id)
            .header(HEADER_BATTERY_VOLTAGE, EMULATED_BATTERY_VOLTAGE)
            .header(HEADER_WIFI_RSSI, EMULATED_WIFI_RSSI)
            .header(HEADER_FW_VERSION, EMULATED_FW_VERSION)
            .send()
            .await
            .map_err(|e| {
                error!("Request error fetching display for device {}: {}", credentials.device_id, e);
                ApiError::Reqwest(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("HTTP error fetching display for device {}: {} - {}", credentials.device_id, status, body);
            let message = match body.trim() {
                "" => status.canonical_reason().unwrap_or("request failed").to_string(),
                text => text.chars().take(200).collect(),
            };
            return Err(ApiError::HttpError { status, message });
        }

        let bytes = response.bytes().await?;
        trace!("Display response body: {}", String::from_utf8_lossy(&bytes));
        let display = serde_json::from_slice::<DisplayResponse>(&bytes).map_err(|e| {
            error!("Failed to parse display response for device {}: {}", credentials.device_id, e);
            ApiError::SerdeJson(e)
        })?;
        info!(
            "Display fetched for device {}: image_url present: {}, refresh_rate: {:?}, reset_duration: {:?}",
            credentials.device_id,
            display.image_url().is_some(),
            display.refresh_rate,
            display.reset_duration
        );
        Ok(display)
    }
}
