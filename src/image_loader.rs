//! Downloads and decodes the image a surface displays.
//!
//! The poller only publishes URLs; turning a URL into pixels is the surface's
//! job. A failed download or decode is shown by the surface and never fed
//! back into the poller.

use crate::errors::MediaError;
use egui::ColorImage as EguiColorImage;
use image::DynamicImage;
use log::{debug, error, info, trace};
use reqwest::Client as ReqwestClient;

/// Fetches `url` and decodes it into an egui image.
#[must_use = "fetching an image can fail; the Result must be handled"]
pub async fn fetch_image(client: &ReqwestClient, url: &str) -> Result<EguiColorImage, MediaError> {
    debug!("Fetching display image: {}", url);
    let response = client.get(url).send().await.map_err(|e| {
        error!("Request error fetching image '{}': {}", url, e);
        MediaError::Download(e)
    })?;

    let response = response.error_for_status().map_err(|e| {
        let status = e.status().unwrap_or_default();
        error!("HTTP error {} fetching image '{}': {}", status, url, e);
        MediaError::Download(e)
    })?;

    let image_bytes = response.bytes().await.map_err(|e| {
        error!("Error reading image bytes for '{}': {}", url, e);
        MediaError::Download(e)
    })?;
    trace!("Downloaded {} bytes from {}", image_bytes.len(), url);

    // Large PNGs take long enough to decode that they should stay off the async workers.
    let url_for_log = url.to_string();
    let decoded = tokio::task::spawn_blocking(move || decode_image(&image_bytes))
        .await
        .map_err(|e| {
            error!("Tokio task join error decoding image {}: {}", url_for_log, e);
            MediaError::Generic(format!("Decoding {} panicked: {}", url_for_log, e))
        })??;
    info!("Fetched and decoded image {} ({}x{})", url, decoded.size[0], decoded.size[1]);
    Ok(decoded)
}

/// Decodes PNG or JPEG bytes into an egui image.
pub fn decode_image(bytes: &[u8]) -> Result<EguiColorImage, MediaError> {
    let img = image::load_from_memory(bytes).map_err(|e| {
        error!("Error decoding image ({} bytes): {}", bytes.len(), e);
        MediaError::Image(e)
    })?;
    Ok(to_color_image(&img))
}

fn to_color_image(img: &DynamicImage) -> EguiColorImage {
    let size = [img.width() as _, img.height() as _];
    let image_buffer = img.to_rgba8();
    let pixels = image_buffer.as_flat_samples();
    EguiColorImage::from_rgba_unmultiplied(size, pixels.as_slice())
}
