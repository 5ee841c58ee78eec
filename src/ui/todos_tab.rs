//! To-do tab UI rendering

use eframe::egui::{self, RichText};

use crate::app::PlotdoApp;
use crate::backend::TodoItem;
use crate::ui::components::{render_request_status, section};
use crate::ui::theme::Theme;

/// Render the to-do tab
pub fn render_todos_tab(app: &mut PlotdoApp, ui: &mut egui::Ui) {
    let theme = app.ui.current_theme.clone();

    section(&theme, ui, "New To-Do", |ui| {
        ui.horizontal(|ui| {
            let input = ui.add_enabled(
                app.todos.can_add(),
                egui::TextEdit::singleline(&mut app.todos.draft)
                    .hint_text("What needs doing?")
                    .desired_width(320.0),
            );
            let submitted = input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

            let clicked = ui
                .add_enabled(app.todos.can_add(), egui::Button::new("Add"))
                .clicked();

            if clicked || submitted {
                let event = app.todos.spawn_add();
                app.handle_events(ui.ctx(), event);
            }
        });

        ui.add_space(8.0);
        render_request_status(&theme, ui, &app.todos.add, "Adding...");
    });

    ui.add_space(12.0);

    section(&theme, ui, "To-Do List", |ui| {
        ui.horizontal(|ui| {
            let refresh = egui::Button::new("↻ Refresh");
            if ui.add_enabled(!app.todos.list.is_pending(), refresh).clicked() {
                let event = app.todos.spawn_refresh();
                app.handle_events(ui.ctx(), event);
            }
            ui.label(
                RichText::new(format!("{} items", app.todos.items().len()))
                    .color(theme.text_muted),
            );
        });

        ui.add_space(4.0);
        render_request_status(&theme, ui, &app.todos.list, "Loading...");
        ui.add_space(8.0);

        if app.todos.items().is_empty() {
            ui.label(RichText::new("Nothing to do").color(theme.text_muted));
            return;
        }

        egui::ScrollArea::vertical()
            .id_salt("todo_list_scroll")
            .max_height(ui.available_height())
            .show(ui, |ui| {
                for item in app.todos.items() {
                    render_todo_row(&theme, ui, item);
                }
            });
    });
}

fn render_todo_row(theme: &Theme, ui: &mut egui::Ui, item: &TodoItem) {
    ui.horizontal(|ui| {
        ui.label(RichText::new(item.id.to_string()).color(theme.text_muted).monospace());
        ui.label(RichText::new(&item.text).color(theme.text_primary));

        if let Some(created) = item.created() {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(
                    RichText::new(created.format("%b %d, %H:%M").to_string())
                        .color(theme.text_muted)
                        .size(11.0),
                );
            });
        }
    });
    ui.separator();
}
