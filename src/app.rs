use std::sync::Arc;

use anyhow::{Context as _, Result};
use eframe::egui::{self, RichText};

use crate::backend::{Backend, PlotImage};
use crate::config::Config;
use crate::retry::RetryPolicy;
use crate::state::{MessageState, PlotState, StateEvent, Tab, TodosState, UiState};
use crate::ui::theme::Theme;
use crate::ui::{
    render_about_dialog, render_messages_tab, render_plot_tab, render_settings_tab, render_tab,
    render_todos_tab,
};

/// Main application state
pub struct PlotdoApp {
    /// Application configuration, as stored on disk
    pub config: Config,
    /// Backend in use this session, after command-line overrides
    pub backend_label: String,
    /// UI state (tabs, theme, status bar, plot texture)
    pub ui: UiState,
    /// Plot screen
    pub plot: PlotState,
    /// To-do screen
    pub todos: TodosState,
    /// Messages screen
    pub messages: MessageState,
}

impl PlotdoApp {
    /// Create a new application instance.
    ///
    /// Kicks off the backend status check and the first to-do fetch.
    pub fn new(_cc: &eframe::CreationContext<'_>, config: Config, backend: Arc<dyn Backend>) -> Self {
        let retry = RetryPolicy::from_config(&config.retry);
        let todo_retry = if config.retry.apply_to_todos {
            retry
        } else {
            RetryPolicy::single_attempt()
        };

        let mut app = Self {
            backend_label: backend.describe(),
            ui: UiState::new(Theme::for_mode(config.ui.dark_theme)),
            plot: PlotState::new(backend.clone(), retry, config.plot.default_amplitude),
            todos: TodosState::new(backend.clone(), todo_retry),
            messages: MessageState::new(backend, retry),
            config,
        };

        let startup: Vec<StateEvent> = app
            .messages
            .spawn_check_status()
            .into_iter()
            .chain(app.todos.spawn_refresh())
            .collect();
        for event in startup {
            if let StateEvent::StatusMessage(msg) = event {
                app.ui.status_message = msg;
            }
        }

        app
    }

    /// Apply events returned by the screen states
    pub fn handle_events(
        &mut self,
        ctx: &egui::Context,
        events: impl IntoIterator<Item = StateEvent>,
    ) {
        for event in events {
            match event {
                StateEvent::StatusMessage(msg) => self.ui.status_message = msg,
                StateEvent::LogError(msg) => tracing::error!("{}", msg),
                StateEvent::LogInfo(msg) => tracing::info!("{}", msg),
                StateEvent::PlotReady => self.load_plot_texture(ctx),
            }
        }
    }

    fn load_plot_texture(&mut self, ctx: &egui::Context) {
        let Some(plot) = self.plot.request.state().payload() else {
            return;
        };

        match decode_plot_image(plot) {
            Ok(image) => {
                self.ui.plot_texture =
                    Some(ctx.load_texture("plot", image, egui::TextureOptions::LINEAR));
            }
            Err(e) => {
                tracing::error!("Failed to decode plot image: {:#}", e);
                self.ui.plot_texture = None;
                self.ui.status_message = format!("Error: could not display plot ({})", e);
            }
        }
    }

    /// Whether any screen has a request in flight
    fn any_pending(&self) -> bool {
        self.plot.request.is_pending()
            || self.todos.list.is_pending()
            || self.todos.add.is_pending()
            || self.messages.status.is_pending()
            || self.messages.echo.is_pending()
    }

    /// Ask for a file name and write the current plot PNG there
    pub fn save_plot(&mut self) {
        let Some(plot) = self.plot.request.state().payload() else {
            self.ui.status_message = "No plot to save".to_string();
            return;
        };

        let Some(path) = rfd::FileDialog::new()
            .set_title("Save Plot")
            .set_file_name("plot.png")
            .add_filter("PNG image", &["png"])
            .save_file()
        else {
            return;
        };

        let result = plot
            .decode_png()
            .map_err(anyhow::Error::from)
            .and_then(|bytes| {
                std::fs::write(&path, bytes)
                    .with_context(|| format!("Failed to write {}", path.display()))
            });

        match result {
            Ok(()) => {
                tracing::info!("Saved plot to {:?}", path);
                self.ui.status_message = format!("Saved plot to {}", path.display());
            }
            Err(e) => {
                tracing::error!("{:#}", e);
                self.ui.status_message = format!("Error: {}", e);
            }
        }
    }

    /// Save configuration to disk
    pub fn save_config(&mut self) {
        if let Err(e) = self.config.save() {
            tracing::error!("Failed to save config: {}", e);
            self.ui.status_message = format!("Error: failed to save config: {}", e);
        }
    }
}

/// Decode a backend plot into pixels egui can upload
fn decode_plot_image(plot: &PlotImage) -> Result<egui::ColorImage> {
    let bytes = plot.decode_png()?;
    let image = image::load_from_memory_with_format(&bytes, image::ImageFormat::Png)
        .context("Plot is not a valid PNG")?
        .into_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw()))
}

impl eframe::App for PlotdoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.ui.theme_dirty {
            self.ui.current_theme.apply(ctx);
            self.ui.theme_dirty = false;
        }

        // Poll async tasks
        let mut events = self.plot.poll(ctx);
        events.extend(self.todos.poll(ctx));
        events.extend(self.messages.poll(ctx));
        self.handle_events(ctx, events);

        let theme = self.ui.current_theme.clone();

        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    let has_plot = self.plot.request.state().payload().is_some();
                    if ui.add_enabled(has_plot, egui::Button::new("Save Plot...")).clicked() {
                        self.save_plot();
                    }
                    if ui.button("Exit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.menu_button("Help", |ui| {
                    if ui.button("About").clicked() {
                        self.ui.show_about_dialog = true;
                    }
                });
            });
        });

        // Status bar at bottom
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.any_pending() {
                    ui.spinner();
                }
                ui.label(RichText::new(&self.ui.status_message).color(theme.text_secondary));
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                render_tab(self, ui, Tab::Plot, "Plot");
                render_tab(self, ui, Tab::Todos, "To-Do");
                render_tab(self, ui, Tab::Messages, "Messages");
                render_tab(self, ui, Tab::Settings, "Settings");
            });

            ui.separator();
            ui.add_space(8.0);

            match self.ui.active_tab {
                Tab::Plot => render_plot_tab(self, ui),
                Tab::Todos => render_todos_tab(self, ui),
                Tab::Messages => render_messages_tab(self, ui),
                Tab::Settings => render_settings_tab(self, ui),
            }
        });

        render_about_dialog(self, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MOCK_PLOT_IMAGE;

    #[test]
    fn test_decode_mock_plot() {
        let image = decode_plot_image(&PlotImage::new(MOCK_PLOT_IMAGE)).unwrap();
        assert_eq!(image.size, [1, 1]);
    }

    #[test]
    fn test_decode_rejects_non_png() {
        // "hello" in base64
        assert!(decode_plot_image(&PlotImage::new("aGVsbG8=")).is_err());
    }
}
