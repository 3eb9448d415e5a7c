use clap::Parser;
use display_poller_rs::api_client::{self, DisplayApiClient};
use display_poller_rs::config::{AppConfig, Cli, SurfaceKind};
use display_poller_rs::errors::AppError;
use display_poller_rs::poller::DisplayPoller;
use display_poller_rs::settings_store::SettingsStore;
use eframe::NativeOptions;
use log::{error, info};
use std::sync::Arc;

mod settings_form;
mod surface;

use surface::DisplayApp;

fn native_options(config: &AppConfig) -> NativeOptions {
    let title = match config.surface {
        SurfaceKind::Window => "Display",
        SurfaceKind::Screensaver => "Display Screensaver",
    };
    let viewport = egui::ViewportBuilder::default()
        .with_title(title)
        .with_inner_size([1024.0, 768.0])
        .with_fullscreen(config.fullscreen);
    NativeOptions { viewport, ..Default::default() }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    env_logger::init(); // Initialize logger
    info!("Starting display_poller_rs application...");
    let config = AppConfig::from_cli(Cli::parse());

    let store = Arc::new(SettingsStore::open(&config.settings_path)?);
    let http_client = api_client::build_http_client(&config)?;
    let api = Arc::new(DisplayApiClient::with_client(http_client.clone(), &config.api_base_url));

    let poller = DisplayPoller::spawn(api, store.subscribe());
    let watcher = tokio::spawn(store.clone().watch_file(config.settings_poll_interval));

    let state_rx = poller.subscribe();
    let runtime = tokio::runtime::Handle::current();
    let surface = config.surface;
    let app_store = store.clone();
    let result = eframe::run_native(
        "display_poller_rs",
        native_options(&config),
        Box::new(move |cc| Box::new(DisplayApp::new(cc, surface, state_rx, app_store, http_client, runtime))),
    );

    info!("Surface closed; stopping background tasks.");
    watcher.abort();
    poller.shutdown().await;
    if let Err(e) = &result {
        error!("GUI exited with error: {}", e);
    }
    result.map_err(AppError::from)
}
