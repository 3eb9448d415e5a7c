//! The settings form shown over the window surface.

use display_poller_rs::model::{Mode, Settings};
use egui::{Align2, Color32, DragValue, Grid, TextEdit};

const MAX_REFRESH_SECONDS: u64 = 24 * 60 * 60;

/// What the user did with the form this frame.
#[derive(Debug, PartialEq)]
pub enum FormAction {
    None,
    Save(Settings),
    Cancel,
}

/// Editable copy of the settings; nothing is stored until Save.
pub struct SettingsForm {
    draft: Settings,
    status: Option<String>,
}

impl SettingsForm {
    pub fn new(current: Settings) -> Self {
        Self { draft: current, status: None }
    }

    pub fn set_status(&mut self, status: String) {
        self.status = Some(status);
    }

    /// The draft as it would be saved: text trimmed, refresh at least one second.
    pub fn finished(&self) -> Settings {
        Settings {
            mode: self.draft.mode,
            api_key: self.draft.api_key.trim().to_string(),
            mac_address: self.draft.mac_address.trim().to_string(),
            custom_url: self.draft.custom_url.trim().to_string(),
            custom_refresh_seconds: self.draft.custom_refresh_seconds.clamp(1, MAX_REFRESH_SECONDS),
        }
    }

    pub fn show(&mut self, ctx: &egui::Context) -> FormAction {
        let mut action = FormAction::None;
        egui::Window::new("Settings")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.radio_value(&mut self.draft.mode, Mode::Managed, "Managed (API key)");
                    ui.radio_value(&mut self.draft.mode, Mode::Custom, "Custom image URL");
                });
                ui.separator();

                match self.draft.mode {
                    Mode::Managed => {
                        Grid::new("managed_settings").num_columns(2).show(ui, |ui| {
                            ui.label("API Key");
                            ui.add(TextEdit::singleline(&mut self.draft.api_key).password(true));
                            ui.end_row();
                            ui.label("MAC Address");
                            ui.add(TextEdit::singleline(&mut self.draft.mac_address).hint_text("AA:BB:CC:DD:EE:FF"));
                            ui.end_row();
                        });
                    }
                    Mode::Custom => {
                        Grid::new("custom_settings").num_columns(2).show(ui, |ui| {
                            ui.label("Image URL");
                            ui.add(TextEdit::singleline(&mut self.draft.custom_url).hint_text("https://"));
                            ui.end_row();
                            ui.label("Refresh (seconds)");
                            ui.add(DragValue::new(&mut self.draft.custom_refresh_seconds).clamp_range(1..=MAX_REFRESH_SECONDS));
                            ui.end_row();
                        });
                    }
                }

                if let Some(status) = &self.status {
                    ui.colored_label(Color32::RED, status);
                }
                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        action = FormAction::Save(self.finished());
                    }
                    if ui.button("Cancel").clicked() {
                        action = FormAction::Cancel;
                    }
                });
            });
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finished_trims_and_clamps() {
        let mut form = SettingsForm::new(Settings::default());
        form.draft.api_key = "  key \n".into();
        form.draft.mac_address = " AA:BB ".into();
        form.draft.custom_refresh_seconds = 0;
        let saved = form.finished();
        assert_eq!(saved.api_key, "key");
        assert_eq!(saved.mac_address, "AA:BB");
        assert_eq!(saved.custom_refresh_seconds, 1);
        assert_eq!(saved.mode, Mode::Managed);
    }

    #[test]
    fn mode_switch_keeps_other_fields() {
        let mut form = SettingsForm::new(Settings::managed("key", "AA:BB"));
        form.draft.mode = Mode::Custom;
        form.draft.custom_url = "http://h/i.png".into();
        let saved = form.finished();
        assert_eq!(saved.mode, Mode::Custom);
        assert_eq!(saved.api_key, "key");
        assert_eq!(saved.custom_url, "http://h/i.png");
    }
}
