//! Shared UI components

use eframe::egui::{self, Color32, CornerRadius, RichText, Vec2};

use crate::app::PlotdoApp;
use crate::lifecycle::{RequestController, RequestState};
use crate::state::Tab;
use crate::ui::theme::Theme;

/// Render a tab button
pub fn render_tab(app: &mut PlotdoApp, ui: &mut egui::Ui, tab: Tab, label: &str) {
    let theme = &app.ui.current_theme;
    let is_active = app.ui.active_tab == tab;

    let (bg, text_color) = if is_active {
        (theme.bg_medium, theme.accent)
    } else {
        (Color32::TRANSPARENT, theme.text_secondary)
    };

    let button = egui::Button::new(RichText::new(label).color(text_color))
        .fill(bg)
        .corner_radius(CornerRadius {
            nw: 6,
            ne: 6,
            sw: 0,
            se: 0,
        })
        .min_size(Vec2::new(80.0, 32.0));

    if ui.add(button).clicked() {
        let previous_tab = app.ui.active_tab;
        app.ui.active_tab = tab;

        // Load the list on first visit if the startup fetch never ran
        if tab == Tab::Todos
            && previous_tab != Tab::Todos
            && matches!(app.todos.list.state(), RequestState::Idle)
        {
            let events = app.todos.spawn_refresh();
            app.handle_events(ui.ctx(), events);
        }
    }
}

/// Render a titled, framed section
pub fn section<R>(
    theme: &Theme,
    ui: &mut egui::Ui,
    title: &str,
    add_contents: impl FnOnce(&mut egui::Ui) -> R,
) -> R {
    let available_width = ui.available_width();

    egui::Frame::NONE
        .fill(theme.bg_medium)
        .corner_radius(8.0)
        .inner_margin(16.0)
        .stroke(egui::Stroke::new(1.0, theme.border))
        .show(ui, |ui| {
            ui.set_width(available_width - 32.0); // Account for frame margins
            ui.label(RichText::new(title).color(theme.accent).size(13.0).strong());
            ui.add_space(12.0);
            add_contents(ui)
        })
        .inner
}

/// Spinner while pending, error text once failed, nothing otherwise
pub fn render_request_status<T>(
    theme: &Theme,
    ui: &mut egui::Ui,
    request: &RequestController<T>,
    busy: &str,
) {
    match request.state() {
        RequestState::Pending => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(RichText::new(busy).color(theme.text_muted));
            });
        }
        RequestState::Failed(msg) => {
            ui.colored_label(theme.error, format!("Could not {}: {}", request.operation(), msg));
        }
        RequestState::Idle | RequestState::Succeeded(_) => {}
    }
}

/// Render the About dialog
pub fn render_about_dialog(app: &mut PlotdoApp, ctx: &egui::Context) {
    if !app.ui.show_about_dialog {
        return;
    }

    let theme = app.ui.current_theme.clone();

    egui::Window::new("About Plotdo")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .fixed_size([300.0, 200.0])
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(8.0);

                ui.label(RichText::new("Plotdo").size(24.0).strong().color(theme.accent));

                ui.add_space(4.0);
                ui.label(
                    RichText::new("Plots, to-dos and messages")
                        .size(14.0)
                        .color(theme.text_secondary),
                );

                ui.add_space(12.0);
                ui.label(
                    RichText::new(format!("Version {}", env!("CARGO_PKG_VERSION")))
                        .color(theme.text_muted),
                );

                ui.add_space(12.0);
                ui.label(
                    RichText::new(format!("Backend: {}", app.backend_label)).color(theme.text_muted),
                );

                ui.add_space(12.0);
                ui.label(
                    RichText::new("Built with Rust + egui")
                        .size(11.0)
                        .color(theme.text_muted),
                );

                ui.add_space(12.0);
                if ui.button("Close").clicked() {
                    app.ui.show_about_dialog = false;
                }

                ui.add_space(8.0);
            });
        });
}
