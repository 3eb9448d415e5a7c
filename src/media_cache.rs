//! Tracks which image a surface shows and which one is being fetched.
//!
//! The UI thread asks for a URL, a spawned task downloads it, and the result
//! lands in a single pending slot that the next frame picks up. Only the most
//! recently requested URL is accepted; results for URLs that were superseded
//! while downloading are dropped.

use crate::errors::MediaError;
use crate::image_loader;
use egui::ColorImage as EguiColorImage;
use log::{debug, info, trace};
use reqwest::Client as ReqwestClient;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;

/// A finished download: the URL it was for and its outcome.
pub type ImageResult = (String, Result<Arc<EguiColorImage>, MediaError>);

type PendingSlot = Arc<Mutex<Option<ImageResult>>>;

#[derive(Debug, Default)]
pub struct MediaCacheManager {
    /// URL of the image currently uploaded as a texture.
    shown_url: Option<String>,
    /// URL most recently handed to a download task.
    requested_url: Option<String>,
    pending: PendingSlot,
}

impl MediaCacheManager {
    pub fn new() -> Self {
        debug!("Initializing new MediaCacheManager.");
        Self::default()
    }

    /// Whether `url` still has to be downloaded.
    pub fn needs_fetch(&self, url: &str) -> bool {
        self.requested_url.as_deref() != Some(url)
    }

    pub fn shown_url(&self) -> Option<&str> {
        self.shown_url.as_deref()
    }

    /// Starts downloading `url` on `runtime`; `on_ready` runs once the result
    /// is in the pending slot (surfaces use it to request a repaint).
    pub fn start_fetch(
        &mut self,
        runtime: &Handle,
        client: ReqwestClient,
        url: String,
        on_ready: impl FnOnce() + Send + 'static,
    ) {
        info!("Initiating fetch for display image: {}", url);
        let pending = self.begin(url.clone());
        runtime.spawn(async move {
            let result = image_loader::fetch_image(&client, &url).await.map(Arc::new);
            deliver(&pending, url, result);
            on_ready();
        });
    }

    /// Takes the finished download for the current request, if any.
    pub fn take_ready(&mut self) -> Option<ImageResult> {
        let ready = self.pending.lock().unwrap_or_else(|p| p.into_inner()).take()?;
        if self.requested_url.as_deref() != Some(ready.0.as_str()) {
            debug!("Dropping stale image result for {}", ready.0);
            return None;
        }
        if ready.1.is_ok() {
            self.shown_url = Some(ready.0.clone());
        }
        Some(ready)
    }

    /// Forgets the current request so the next `needs_fetch` is true again.
    pub fn clear_request(&mut self) {
        trace!("Clearing image request (was {:?}).", self.requested_url);
        self.requested_url = None;
    }

    fn begin(&mut self, url: String) -> PendingSlot {
        self.requested_url = Some(url);
        self.pending.clone()
    }
}

fn deliver(pending: &PendingSlot, url: String, result: Result<Arc<EguiColorImage>, MediaError>) {
    trace!("Image result ready for {} (ok: {})", url, result.is_ok());
    *pending.lock().unwrap_or_else(|p| p.into_inner()) = Some((url, result));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> Arc<EguiColorImage> {
        Arc::new(EguiColorImage::new([2, 2], egui::Color32::BLACK))
    }

    #[test]
    fn accepts_result_for_current_request() {
        let mut cache = MediaCacheManager::new();
        assert!(cache.needs_fetch("a"));
        let slot = cache.begin("a".into());
        assert!(!cache.needs_fetch("a"));
        assert!(cache.take_ready().is_none());

        deliver(&slot, "a".into(), Ok(image()));
        let (url, result) = cache.take_ready().unwrap();
        assert_eq!(url, "a");
        assert!(result.is_ok());
        assert_eq!(cache.shown_url(), Some("a"));
        assert!(cache.take_ready().is_none());
    }

    #[test]
    fn drops_superseded_result() {
        let mut cache = MediaCacheManager::new();
        let slot = cache.begin("old".into());
        cache.begin("new".into());
        deliver(&slot, "old".into(), Ok(image()));
        assert!(cache.take_ready().is_none());
        assert_eq!(cache.shown_url(), None);
    }

    #[test]
    fn failed_download_keeps_previous_image() {
        let mut cache = MediaCacheManager::new();
        let slot = cache.begin("a".into());
        deliver(&slot, "a".into(), Ok(image()));
        cache.take_ready();

        cache.begin("b".into());
        deliver(&slot, "b".into(), Err(MediaError::Generic("404".into())));
        let (_, result) = cache.take_ready().unwrap();
        assert!(result.is_err());
        assert_eq!(cache.shown_url(), Some("a"));

        cache.clear_request();
        assert!(cache.needs_fetch("b"));
    }
}
