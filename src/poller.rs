//! The display poller: turns a stream of settings tuples into UI states.
//!
//! A supervisor task watches the settings slot. For every distinct tuple it
//! cancels the current poll run (if any), waits for it to finish, and spawns a
//! new run carrying the new tuple. A run validates its tuple, then loops
//! fetch → publish → wait until it is cancelled. All runs publish into one
//! `watch` slot, so every surface sees only the latest [`UiState`].

use crate::api_client::DisplayApi;
use crate::model::{Credentials, DisplayResponse, Mode, Settings, UiState};
use log::{debug, error, info, trace, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Wait used after a successful fetch that carried no timing hint.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);
/// Wait used after any transport or parse failure.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(60);

pub const MSG_CONFIGURE_CUSTOM: &str = "Please configure Image URL in Settings";
pub const MSG_CONFIGURE_MANAGED: &str = "Please configure API Key and MAC Address in Settings";
pub const MSG_NO_IMAGE_URL: &str = "Invalid response: No image_url found";
const MSG_FETCH_FAILED_PREFIX: &str = "Failed to fetch: ";

/// What a validated settings tuple asks the poller to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunPlan {
    Managed(Credentials),
    Custom { url: String, refresh: Duration },
}

/// Checks that the fields required by the tuple's mode are present.
///
/// Only the credential set selected by `mode` is consulted. On failure the
/// returned message is what the surfaces should show.
pub fn validate(settings: &Settings) -> Result<RunPlan, &'static str> {
    match settings.mode {
        Mode::Custom => {
            let url = settings.custom_url.trim();
            if url.is_empty() {
                return Err(MSG_CONFIGURE_CUSTOM);
            }
            Ok(RunPlan::Custom {
                url: url.to_string(),
                refresh: Duration::from_secs(settings.custom_refresh_seconds.max(1)),
            })
        }
        Mode::Managed => {
            let api_key = settings.api_key.trim();
            let device_id = settings.mac_address.trim();
            if api_key.is_empty() || device_id.is_empty() {
                return Err(MSG_CONFIGURE_MANAGED);
            }
            Ok(RunPlan::Managed(Credentials {
                api_key: api_key.to_string(),
                device_id: device_id.to_string(),
            }))
        }
    }
}

/// Wait before the next fetch after a response that carried an image.
///
/// `refresh_rate` (seconds) wins over `reset_duration` (minutes); with neither
/// the fixed 15-minute default applies, whatever the previous wait was.
pub fn next_refresh_interval(response: &DisplayResponse) -> Duration {
    match (response.refresh_rate, response.reset_duration) {
        (Some(secs), _) if secs > 0 => Duration::from_secs(secs as u64),
        (_, Some(mins)) if mins > 0 => Duration::from_secs((mins as u64).saturating_mul(60)),
        _ => DEFAULT_REFRESH_INTERVAL,
    }
}

/// Appends the `t=<millis>` cache-busting parameter.
pub fn timestamped_url(url: &str, millis: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}t={}", url, separator, millis)
}

/// Entry point for starting pollers.
pub struct DisplayPoller;

impl DisplayPoller {
    /// Starts the supervisor on the current tokio runtime.
    ///
    /// The poller runs until [`PollerHandle::shutdown`] is called or the
    /// handle is dropped.
    pub fn spawn<A: DisplayApi>(api: Arc<A>, settings_rx: watch::Receiver<Settings>) -> PollerHandle {
        let (state_tx, state_rx) = watch::channel(UiState::Loading);
        let shutdown = CancellationToken::new();
        debug!("Spawning display poller supervisor task.");
        let task = tokio::spawn(supervise(api, settings_rx, state_tx, shutdown.clone()));
        PollerHandle { state_rx, shutdown, task: Some(task) }
    }
}

/// Owner's view of a running poller.
#[derive(Debug)]
pub struct PollerHandle {
    state_rx: watch::Receiver<UiState>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// A receiver that always holds the latest UI state.
    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.state_rx.clone()
    }

    pub fn current(&self) -> UiState {
        self.state_rx.borrow().clone()
    }

    /// Cancels the active run and waits for the supervisor to exit.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Display poller supervisor ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn supervise<A: DisplayApi>(
    api: Arc<A>,
    mut settings_rx: watch::Receiver<Settings>,
    state_tx: watch::Sender<UiState>,
    shutdown: CancellationToken,
) {
    let mut source_open = true;
    loop {
        let settings = settings_rx.borrow_and_update().clone();
        let run_token = shutdown.child_token();
        let run = tokio::spawn(run_settings(api.clone(), settings.clone(), state_tx.clone(), run_token.clone()));

        let restart = loop {
            tokio::select! {
                _ = shutdown.cancelled() => break false,
                changed = settings_rx.changed(), if source_open => {
                    if changed.is_err() {
                        warn!("Settings source closed; keeping the current poll run until shutdown.");
                        source_open = false;
                        continue;
                    }
                    if *settings_rx.borrow_and_update() == settings {
                        trace!("Identical settings republished; not restarting.");
                        continue;
                    }
                    break true;
                }
            }
        };

        run_token.cancel();
        if let Err(e) = run.await {
            error!("Poll run ended abnormally: {}", e);
        }
        if !restart {
            info!("Display poller shut down.");
            return;
        }
        info!("Settings changed; restarting the poll run.");
    }
}

/// One poll run for one settings tuple. Returns when the tuple is invalid
/// (the poller is idle until the next tuple) or when cancelled.
async fn run_settings<A: DisplayApi>(
    api: Arc<A>,
    settings: Settings,
    state_tx: watch::Sender<UiState>,
    token: CancellationToken,
) {
    if token.is_cancelled() {
        return;
    }
    let plan = match validate(&settings) {
        Ok(plan) => plan,
        Err(message) => {
            warn!("Settings incomplete for {:?} mode: {}", settings.mode, message);
            publish(&state_tx, UiState::error(message));
            return;
        }
    };
    publish(&state_tx, UiState::Loading);

    tokio::select! {
        _ = token.cancelled() => debug!("Poll run cancelled."),
        _ = run_plan(api.as_ref(), plan, &state_tx) => {}
    }
}

async fn run_plan<A: DisplayApi>(api: &A, plan: RunPlan, state_tx: &watch::Sender<UiState>) {
    match plan {
        RunPlan::Managed(credentials) => managed_loop(api, &credentials, state_tx).await,
        RunPlan::Custom { url, refresh } => custom_loop(&url, refresh, state_tx).await,
    }
}

async fn managed_loop<A: DisplayApi>(api: &A, credentials: &Credentials, state_tx: &watch::Sender<UiState>) {
    info!("Starting managed poll loop for device {}", credentials.device_id);
    let mut interval = DEFAULT_REFRESH_INTERVAL;
    loop {
        match api.fetch(credentials).await {
            Ok(response) => match response.image_url() {
                Some(image_url) => {
                    publish(state_tx, UiState::success(image_url));
                    interval = next_refresh_interval(&response);
                }
                None => {
                    warn!("Display response without image_url; keeping wait of {:?}", interval);
                    publish(state_tx, UiState::error(MSG_NO_IMAGE_URL));
                }
            },
            Err(e) => {
                warn!("Display fetch failed: {}. Retrying in {:?}", e, RETRY_BACKOFF);
                publish(state_tx, UiState::error(format!("{}{}", MSG_FETCH_FAILED_PREFIX, e)));
                interval = RETRY_BACKOFF;
            }
        }
        debug!("Next display fetch in {:?}", interval);
        tokio::time::sleep(interval).await;
    }
}

async fn custom_loop(url: &str, refresh: Duration, state_tx: &watch::Sender<UiState>) {
    info!("Starting custom poll loop for {} every {:?}", url, refresh);
    let mut last_stamp = i64::MIN;
    loop {
        // Wall-clock millis can repeat; each cycle still gets a fresh URL.
        let stamp = chrono::Utc::now().timestamp_millis().max(last_stamp.saturating_add(1));
        last_stamp = stamp;
        publish(state_tx, UiState::success(timestamped_url(url, stamp)));
        tokio::time::sleep(refresh).await;
    }
}

fn publish(state_tx: &watch::Sender<UiState>, state: UiState) {
    debug!("Publishing UI state: {:?}", state);
    state_tx.send_replace(state);
}
