//! The egui hosts that render the poller's output.
//!
//! One `DisplayApp` type serves both surfaces: the full-screen window (with a
//! settings form on `S`) and the screensaver (closes on any user input).

use crate::settings_form::{FormAction, SettingsForm};
use display_poller_rs::config::SurfaceKind;
use display_poller_rs::media_cache::MediaCacheManager;
use display_poller_rs::model::UiState;
use display_poller_rs::settings_store::SettingsStore;
use egui::{pos2, vec2, CentralPanel, Color32, Rect, RichText, TextureHandle, TextureOptions};
use log::{debug, error, info, warn};
use reqwest::Client as ReqwestClient;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::watch;

/// Input during the first moments of a screensaver is startup noise, not a dismissal.
const SCREENSAVER_GRACE: Duration = Duration::from_secs(1);
const SPINNER_SIZE: f32 = 48.0;

pub struct DisplayApp {
    surface: SurfaceKind,
    state_rx: watch::Receiver<UiState>,
    ui_state: UiState,
    http_client: ReqwestClient,
    runtime: Handle,
    store: Arc<SettingsStore>,
    media_manager: MediaCacheManager,
    texture: Option<TextureHandle>,
    image_error: Option<String>,
    settings_form: Option<SettingsForm>,
    started_at: Instant,
}

impl DisplayApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        surface: SurfaceKind,
        state_rx: watch::Receiver<UiState>,
        store: Arc<SettingsStore>,
        http_client: ReqwestClient,
        runtime: Handle,
    ) -> Self {
        info!("Initializing {:?} surface.", surface);
        let ctx = cc.egui_ctx.clone();
        let mut repaint_rx = state_rx.clone();
        debug!("Spawning UI state repaint task.");
        runtime.spawn(async move {
            while repaint_rx.changed().await.is_ok() {
                ctx.request_repaint();
            }
            debug!("UI state channel closed; repaint task exiting.");
        });

        let ui_state = state_rx.borrow().clone();
        Self {
            surface,
            state_rx,
            ui_state,
            http_client,
            runtime,
            store,
            media_manager: MediaCacheManager::new(),
            texture: None,
            image_error: None,
            settings_form: None,
            started_at: Instant::now(),
        }
    }

    fn sync_ui_state(&mut self) {
        if !self.state_rx.has_changed().unwrap_or(false) {
            return;
        }
        let new_state = self.state_rx.borrow_and_update().clone();
        if new_state != self.ui_state {
            info!("UI state changed from {:?} to {:?}", self.ui_state, new_state);
        }
        // A republished URL is the retry for a failed download. Any publication
        // clears the failed request, so the same URL arriving again after an
        // error is downloaded again on purpose.
        if self.image_error.take().is_some() {
            self.media_manager.clear_request();
        }
        self.ui_state = new_state;
    }

    fn drive_image_fetch(&mut self, ctx: &egui::Context) {
        if let UiState::Success { image_url } = &self.ui_state {
            if self.media_manager.needs_fetch(image_url) {
                let repaint_ctx = ctx.clone();
                self.media_manager.start_fetch(
                    &self.runtime,
                    self.http_client.clone(),
                    image_url.clone(),
                    move || repaint_ctx.request_repaint(),
                );
            }
        }

        if let Some((url, result)) = self.media_manager.take_ready() {
            match result {
                Ok(image) => {
                    debug!("Uploading texture for {}", url);
                    match &mut self.texture {
                        Some(tex) => tex.set((*image).clone(), TextureOptions::LINEAR),
                        None => {
                            self.texture = Some(ctx.load_texture("display_image", (*image).clone(), TextureOptions::LINEAR))
                        }
                    }
                    self.image_error = None;
                }
                Err(e) => {
                    warn!("Could not display {}: {}", url, e);
                    self.image_error = Some(e.to_string());
                }
            }
        }
    }

    fn handle_input(&mut self, ctx: &egui::Context) {
        match self.surface {
            SurfaceKind::Screensaver => {
                ctx.set_cursor_icon(egui::CursorIcon::None);
                if self.started_at.elapsed() >= SCREENSAVER_GRACE && user_interacted(ctx) {
                    info!("User input while screensaver active; closing.");
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            }
            SurfaceKind::Window => {
                let (open_settings, escape) =
                    ctx.input(|i| (i.key_pressed(egui::Key::S), i.key_pressed(egui::Key::Escape)));
                if self.settings_form.is_some() {
                    if escape {
                        debug!("Settings form dismissed with Escape.");
                        self.settings_form = None;
                    }
                } else if open_settings {
                    debug!("Opening settings form.");
                    self.settings_form = Some(SettingsForm::new(self.store.current()));
                } else if escape {
                    info!("Escape pressed; closing window.");
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            }
        }
    }

    fn show_settings_form(&mut self, ctx: &egui::Context) {
        let Some(form) = self.settings_form.as_mut() else { return };
        match form.show(ctx) {
            FormAction::None => {}
            FormAction::Cancel => self.settings_form = None,
            FormAction::Save(settings) => match self.store.update(settings) {
                Ok(changed) => {
                    info!("Settings saved from form (changed: {}).", changed);
                    self.settings_form = None;
                }
                Err(e) => {
                    error!("Failed to save settings: {}", e);
                    form.set_status(e.to_string());
                }
            },
        }
    }

    fn draw(&self, ui: &mut egui::Ui) {
        let available_rect = ui.available_rect_before_wrap();
        match &self.ui_state {
            UiState::Loading => draw_spinner(ui, available_rect),
            UiState::Success { .. } => {
                if let Some(tex) = &self.texture {
                    let size = tex.size_vec2();
                    let img_rect = calculate_draw_rect(size.x, size.y, available_rect);
                    let uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
                    ui.painter().image(tex.id(), img_rect, uv, Color32::WHITE);
                } else if let Some(message) = &self.image_error {
                    draw_message(ui, message);
                } else {
                    draw_spinner(ui, available_rect);
                }
            }
            UiState::Error { message } => draw_message(ui, message),
        }
    }
}

impl eframe::App for DisplayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sync_ui_state();
        self.drive_image_fetch(ctx);
        self.handle_input(ctx);

        CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::BLACK))
            .show(ctx, |ui| self.draw(ui));

        self.show_settings_form(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("{:?} surface exiting.", self.surface);
    }
}

fn user_interacted(ctx: &egui::Context) -> bool {
    ctx.input(|i| {
        i.pointer.any_pressed()
            || i.pointer.delta() != egui::Vec2::ZERO
            || i.events.iter().any(|e| matches!(e, egui::Event::Key { pressed: true, .. }))
    })
}

fn draw_spinner(ui: &mut egui::Ui, area: Rect) {
    let rect = Rect::from_center_size(area.center(), vec2(SPINNER_SIZE, SPINNER_SIZE));
    ui.put(rect, egui::Spinner::new().size(SPINNER_SIZE).color(Color32::LIGHT_GRAY));
}

fn draw_message(ui: &mut egui::Ui, message: &str) {
    ui.centered_and_justified(|ui| {
        ui.label(RichText::new(message).color(Color32::WHITE).size(22.0));
    });
}

/// Largest rect with the media's aspect ratio that fits in `available_rect`, centered.
pub fn calculate_draw_rect(media_width: f32, media_height: f32, available_rect: Rect) -> Rect {
    if media_width <= 0.0 || media_height <= 0.0 {
        return available_rect;
    }
    let aspect_ratio = media_width / media_height;
    let mut draw_width = available_rect.width();
    let mut draw_height = available_rect.width() / aspect_ratio;
    if draw_height > available_rect.height() {
        draw_height = available_rect.height();
        draw_width = available_rect.height() * aspect_ratio;
    }
    Rect::from_center_size(available_rect.center(), vec2(draw_width, draw_height))
}
