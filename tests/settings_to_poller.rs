use display_poller_rs::api_client::DisplayApi;
use display_poller_rs::errors::ApiError;
use display_poller_rs::model::{Credentials, DisplayResponse, Settings, UiState};
use display_poller_rs::poller::{DisplayPoller, MSG_CONFIGURE_CUSTOM, MSG_CONFIGURE_MANAGED};
use display_poller_rs::settings_store::SettingsStore;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Always answers with the same image and records which devices asked.
struct FixedApi {
    image_url: String,
    devices: Mutex<Vec<String>>,
}

impl DisplayApi for FixedApi {
    async fn fetch(&self, credentials: &Credentials) -> Result<DisplayResponse, ApiError> {
        self.devices.lock().unwrap().push(credentials.device_id.clone());
        Ok(DisplayResponse {
            image_url: Some(self.image_url.clone()),
            refresh_rate: Some(60),
            reset_duration: None,
        })
    }
}

async fn wait_for(rx: &mut watch::Receiver<UiState>, pred: impl Fn(&UiState) -> bool) -> UiState {
    loop {
        {
            let state = rx.borrow_and_update();
            if pred(&*state) {
                return (*state).clone();
            }
        }
        rx.changed().await.expect("poller stopped publishing");
    }
}

#[tokio::test(start_paused = true)]
async fn saving_settings_restarts_the_poller() {
    let dir = tempfile::tempdir().unwrap();
    let store = SettingsStore::open(dir.path().join("settings.ini")).unwrap();
    let api = Arc::new(FixedApi { image_url: "https://cdn/screen.png".into(), devices: Mutex::new(Vec::new()) });
    let poller = DisplayPoller::spawn(api.clone(), store.subscribe());
    let mut states = poller.subscribe();

    // Fresh install: nothing configured.
    wait_for(&mut states, |s| *s == UiState::error(MSG_CONFIGURE_MANAGED)).await;
    assert!(api.devices.lock().unwrap().is_empty());

    store.update(Settings::managed("token", "AA:BB:CC:DD:EE:FF")).unwrap();
    wait_for(&mut states, |s| *s == UiState::success("https://cdn/screen.png")).await;
    assert_eq!(*api.devices.lock().unwrap(), vec!["AA:BB:CC:DD:EE:FF".to_string()]);

    // Switching to custom mode with no URL drops back to a configuration error.
    store.update(Settings::custom("", 30)).unwrap();
    wait_for(&mut states, |s| *s == UiState::error(MSG_CONFIGURE_CUSTOM)).await;

    store.update(Settings::custom("http://frame.local/now.jpg", 30)).unwrap();
    let state = wait_for(&mut states, |s| matches!(s, UiState::Success { .. })).await;
    match state {
        UiState::Success { image_url } => assert!(image_url.starts_with("http://frame.local/now.jpg?t=")),
        other => panic!("unexpected state {other:?}"),
    }

    // The managed run is gone: no further API calls however long we wait.
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(api.devices.lock().unwrap().len(), 1);

    poller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn external_file_edit_reaches_the_poller() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.ini");
    let store = Arc::new(SettingsStore::open(&path).unwrap());
    let api = Arc::new(FixedApi { image_url: "https://cdn/a.png".into(), devices: Mutex::new(Vec::new()) });
    let poller = DisplayPoller::spawn(api.clone(), store.subscribe());
    let mut states = poller.subscribe();
    wait_for(&mut states, |s| *s == UiState::error(MSG_CONFIGURE_MANAGED)).await;

    let watcher = tokio::spawn(store.clone().watch_file(Duration::from_secs(2)));
    std::fs::write(&path, "[settings]\napi_key = token\nmac_address = 11:22:33:44:55:66\n").unwrap();
    wait_for(&mut states, |s| *s == UiState::success("https://cdn/a.png")).await;
    assert_eq!(*api.devices.lock().unwrap(), vec!["11:22:33:44:55:66".to_string()]);

    watcher.abort();
    poller.shutdown().await;
}
