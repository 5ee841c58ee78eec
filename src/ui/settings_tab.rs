//! Settings tab UI rendering

use eframe::egui::{self, RichText};

use crate::app::PlotdoApp;
use crate::config::Config;
use crate::retry::RetryPolicy;
use crate::ui::components::section;
use crate::ui::theme::Theme;

/// Render the settings tab
pub fn render_settings_tab(app: &mut PlotdoApp, ui: &mut egui::Ui) {
    let theme = app.ui.current_theme.clone();

    egui::ScrollArea::vertical()
        .id_salt("settings_scroll")
        .show(ui, |ui| {
            ui.label(
                RichText::new("Settings")
                    .color(theme.text_primary)
                    .size(20.0)
                    .strong(),
            );
            ui.add_space(16.0);

            if app.ui.restart_required {
                ui.colored_label(
                    theme.warning,
                    "Backend and retry changes take effect after a restart",
                );
                ui.add_space(8.0);
            }

            // Appearance section
            section(&theme, ui, "Appearance", |ui| {
                if ui
                    .checkbox(&mut app.config.ui.dark_theme, "Dark theme")
                    .changed()
                {
                    app.ui.current_theme = Theme::for_mode(app.config.ui.dark_theme);
                    app.ui.theme_dirty = true;
                    app.save_config();
                }
            });

            ui.add_space(12.0);

            // Backend section
            section(&theme, ui, "Backend", |ui| {
                let mut changed = false;

                ui.horizontal(|ui| {
                    ui.label(RichText::new("Base URL:").color(theme.text_muted));
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut app.config.backend.base_url)
                            .desired_width(260.0),
                    );
                    changed |= response.lost_focus();
                });

                ui.horizontal(|ui| {
                    ui.label(RichText::new("Timeout (s):").color(theme.text_muted));
                    changed |= ui
                        .add(egui::DragValue::new(&mut app.config.backend.timeout_secs).range(1..=120))
                        .changed();
                });

                changed |= ui
                    .checkbox(&mut app.config.backend.mock, "Use simulated backend")
                    .changed();
                ui.label(
                    RichText::new("  Answers every request in-process; plots are a 1x1 placeholder")
                        .color(theme.text_muted)
                        .size(11.0),
                );

                if changed {
                    let trimmed = app.config.backend.base_url.trim_end_matches('/').to_string();
                    app.config.backend.base_url = trimmed;
                    app.ui.restart_required = true;
                    app.save_config();
                }
            });

            ui.add_space(12.0);

            // Retry section
            section(&theme, ui, "Retry", |ui| {
                let mut changed = false;

                egui::Grid::new("retry_grid")
                    .num_columns(2)
                    .spacing([12.0, 6.0])
                    .show(ui, |ui| {
                        ui.label(RichText::new("Attempts:").color(theme.text_muted));
                        changed |= ui
                            .add(egui::DragValue::new(&mut app.config.retry.max_attempts).range(1..=10))
                            .changed();
                        ui.end_row();

                        ui.label(RichText::new("Base delay (ms):").color(theme.text_muted));
                        changed |= ui
                            .add(
                                egui::DragValue::new(&mut app.config.retry.base_delay_ms)
                                    .range(0..=60_000)
                                    .speed(50),
                            )
                            .changed();
                        ui.end_row();
                    });

                changed |= ui
                    .checkbox(&mut app.config.retry.apply_to_todos, "Retry to-do requests")
                    .changed();

                let policy = RetryPolicy::from_config(&app.config.retry);
                ui.label(
                    RichText::new(format!(
                        "  {} attempts, waits start at {} ms; worst case adds {:.1}s before giving up",
                        policy.max_attempts(),
                        policy.base_delay().as_millis(),
                        policy.total_backoff().as_secs_f32()
                    ))
                    .color(theme.text_muted)
                    .size(11.0),
                );

                if changed {
                    app.ui.restart_required = true;
                    app.save_config();
                }
            });

            ui.add_space(12.0);

            // Plot section
            section(&theme, ui, "Plot", |ui| {
                let mut changed = false;

                egui::Grid::new("plot_grid")
                    .num_columns(2)
                    .spacing([12.0, 6.0])
                    .show(ui, |ui| {
                        ui.label(RichText::new("Default amplitude:").color(theme.text_muted));
                        changed |= ui
                            .add(
                                egui::DragValue::new(&mut app.config.plot.default_amplitude)
                                    .speed(0.1)
                                    .range(0.001..=f64::MAX),
                            )
                            .changed();
                        ui.end_row();

                        ui.label(RichText::new("Simulated delay (ms):").color(theme.text_muted));
                        changed |= ui
                            .add(
                                egui::DragValue::new(&mut app.config.plot.mock_delay_ms)
                                    .range(0..=10_000)
                                    .speed(50),
                            )
                            .changed();
                        ui.end_row();
                    });

                if changed {
                    app.save_config();
                }
            });

            ui.add_space(12.0);

            if let Ok(path) = Config::config_path() {
                ui.label(
                    RichText::new(format!("Config file: {}", path.display()))
                        .color(theme.text_muted)
                        .size(11.0),
                );
            }
        });
}
