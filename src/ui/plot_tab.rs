//! Plot tab UI rendering

use eframe::egui::{self, RichText};

use crate::app::PlotdoApp;
use crate::lifecycle::RequestState;
use crate::ui::components::{render_request_status, section};

/// Render the plot tab
pub fn render_plot_tab(app: &mut PlotdoApp, ui: &mut egui::Ui) {
    let theme = app.ui.current_theme.clone();

    egui::ScrollArea::vertical()
        .id_salt("plot_scroll")
        .show(ui, |ui| {
            section(&theme, ui, "Sine Wave", |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new("Amplitude:").color(theme.text_muted));
                    ui.add_enabled(
                        app.plot.can_submit(),
                        egui::DragValue::new(&mut app.plot.amplitude)
                            .speed(0.1)
                            .max_decimals(3),
                    );

                    let button = egui::Button::new("Generate Plot");
                    if ui.add_enabled(app.plot.can_submit(), button).clicked() {
                        let event = app.plot.spawn_submit();
                        app.handle_events(ui.ctx(), event);
                    }

                    let settled = app.plot.can_submit()
                        && !matches!(app.plot.request.state(), RequestState::Idle);
                    if ui.add_enabled(settled, egui::Button::new("Clear")).clicked() {
                        app.plot.request.reset();
                        app.ui.plot_texture = None;
                    }
                });

                ui.add_space(8.0);
                render_request_status(&theme, ui, &app.plot.request, "Generating plot...");
            });

            ui.add_space(12.0);

            // The texture is only shown while it matches a successful result
            let has_result = app.plot.request.state().payload().is_some();
            let Some(texture) = app.ui.plot_texture.clone().filter(|_| has_result) else {
                if !app.plot.request.is_pending() {
                    ui.label(
                        RichText::new("No plot yet - enter a positive amplitude and click Generate")
                            .color(theme.text_muted),
                    );
                }
                return;
            };

            section(&theme, ui, "Result", |ui| {
                let max_width = ui.available_width();
                ui.add(
                    egui::Image::from_texture(egui::load::SizedTexture::from_handle(&texture))
                        .max_width(max_width)
                        .maintain_aspect_ratio(true),
                );

                ui.add_space(8.0);
                if ui.button("Save PNG...").clicked() {
                    app.save_plot();
                }
            });
        });
}
