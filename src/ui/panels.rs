use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;
use pandemic_dashboard::data::model::Metric;

use crate::state::{AppState, Tab};

/// Selection change requested from the entity list; applied after the
/// panel has finished borrowing the state.
enum EntityAction {
    Toggle(String),
    All,
    None,
}

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filter Options");
    ui.separator();

    let (Some(table), Some(mut params)) = (state.table.clone(), state.params.clone()) else {
        ui.label("No dataset loaded.");
        return;
    };
    let mut changed = false;
    let mut action: Option<EntityAction> = None;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Date range ----
            ui.strong("Date range");
            ui.horizontal(|ui: &mut Ui| {
                ui.label("From");
                changed |= ui
                    .add(DatePickerButton::new(&mut params.date_from).id_salt("date_from"))
                    .changed();
            });
            ui.horizontal(|ui: &mut Ui| {
                ui.label("To");
                changed |= ui
                    .add(DatePickerButton::new(&mut params.date_to).id_salt("date_to"))
                    .changed();
            });
            if params.date_from > params.date_to {
                ui.label(
                    RichText::new("Start is after end: nothing matches.").color(Color32::YELLOW),
                );
            }
            ui.separator();

            // ---- Region group ----
            ui.strong("Continent");
            let current = params.region_group.clone().unwrap_or_else(|| "All".to_string());
            egui::ComboBox::from_id_salt("region_group")
                .selected_text(&current)
                .show_ui(ui, |ui: &mut Ui| {
                    if ui.selectable_label(params.region_group.is_none(), "All").clicked() {
                        params.region_group = None;
                        changed = true;
                    }
                    for group in table.region_groups() {
                        let selected = params.region_group.as_deref() == Some(group.as_str());
                        if ui.selectable_label(selected, &group).clicked() {
                            params.region_group = Some(group);
                            changed = true;
                        }
                    }
                });
            ui.separator();

            // ---- Metric ----
            ui.strong("Metric");
            egui::ComboBox::from_id_salt("metric")
                .selected_text(params.metric.label())
                .show_ui(ui, |ui: &mut Ui| {
                    for metric in Metric::ALL {
                        if ui
                            .selectable_label(params.metric == metric, metric.label())
                            .clicked()
                        {
                            params.metric = metric;
                            changed = true;
                        }
                    }
                });

            changed |= ui
                .checkbox(&mut params.per_million, "Per million people")
                .changed();
            ui.checkbox(&mut state.log_scale, "Log scale");

            let mut smoothing = params.rolling_window > 1;
            if ui
                .checkbox(&mut smoothing, format!("{}-day average", state.config.rolling_window))
                .changed()
            {
                params.rolling_window = if smoothing { state.config.rolling_window } else { 0 };
                changed = true;
            }

            ui.horizontal(|ui: &mut Ui| {
                ui.label("Top N");
                changed |= ui
                    .add(egui::DragValue::new(&mut params.top_n).range(1..=100))
                    .changed();
            });
            ui.horizontal(|ui: &mut Ui| {
                ui.label("Compare with days before");
                changed |= ui
                    .add(egui::DragValue::new(&mut params.delta_days).range(0..=365))
                    .changed();
            });
            ui.separator();

            // ---- Entities (collapsible) ----
            let candidates: Vec<String> = match &params.region_group {
                Some(group) => table
                    .iter()
                    .filter(|r| r.region_group.as_ref() == Some(group))
                    .map(|r| r.entity.clone())
                    .collect::<std::collections::BTreeSet<_>>()
                    .into_iter()
                    .collect(),
                None => table.entities().into_iter().collect(),
            };
            let header_text = format!(
                "Countries  ({}/{})",
                params.entities.len(),
                candidates.len()
            );

            egui::CollapsingHeader::new(RichText::new(header_text).strong())
                .id_salt("entities")
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    ui.horizontal(|ui: &mut Ui| {
                        if ui.small_button("All").clicked() {
                            action = Some(EntityAction::All);
                        }
                        if ui.small_button("None").clicked() {
                            action = Some(EntityAction::None);
                        }
                    });
                    if params.entities.is_empty() {
                        ui.label(
                            RichText::new(format!("Showing top {} by metric", params.top_n))
                                .italics(),
                        );
                    }

                    for entity in &candidates {
                        let mut text = RichText::new(entity);
                        if let Some(cm) = &state.entity_colors {
                            text = text.color(cm.color_for(entity));
                        }
                        let mut checked = params.entities.contains(entity);
                        if ui.checkbox(&mut checked, text).changed() {
                            action = Some(EntityAction::Toggle(entity.clone()));
                        }
                    }
                });
        });

    if changed {
        state.params = Some(params);
        state.refresh();
    }
    match action {
        Some(EntityAction::Toggle(entity)) => state.toggle_entity(&entity),
        Some(EntityAction::All) => state.select_all(),
        Some(EntityAction::None) => state.select_none(),
        None => {}
    }
}

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

pub fn tab_bar(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        for tab in Tab::ALL {
            ui.selectable_value(&mut state.tab, tab, tab.title());
        }
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.source.is_some(), egui::Button::new("Reload"))
                .clicked()
            {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(table) = &state.table {
            ui.label(format!(
                "{} rows, {} countries, {} in view",
                table.len(),
                table.entity_count(),
                state.view.entities.len()
            ));
        }

        if let (Some(delta), Some(params)) = (state.view.delta, &state.params) {
            ui.separator();
            let color = if delta >= 0.0 { Color32::LIGHT_RED } else { Color32::LIGHT_GREEN };
            ui.label(
                RichText::new(format!(
                    "{}: {delta:+.1}% vs {} days earlier",
                    params.metric.label(),
                    params.delta_days
                ))
                .color(color),
            );
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open pandemic data")
        .add_filter("Supported files", &["csv", "tsv", "txt", "parquet", "pq"])
        .add_filter("CSV", &["csv", "txt"])
        .add_filter("TSV", &["tsv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open(&path);
    }
}
