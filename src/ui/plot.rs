use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate};
use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, Legend, Line, Plot, PlotPoints,
    Points,
};

use crate::color;
use crate::state::{AppState, Tab};

// ---------------------------------------------------------------------------
// Central panel dispatch
// ---------------------------------------------------------------------------

/// Render the chart for the active tab.
pub fn central_view(ui: &mut Ui, state: &mut AppState) {
    if state.params.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a dataset to begin  (File → Open…)");
        });
        return;
    }

    match state.tab {
        Tab::Trends => trends_plot(ui, state),
        Tab::GlobalView => global_view(ui, state),
        Tab::Vaccination => vaccination_scatter(ui, state),
        Tab::Distribution => distribution_plots(ui, state),
        Tab::Correlation => correlation_heatmap(ui, state),
        Tab::Rankings => rankings(ui, state),
    }
}

// -- axis helpers --

fn date_to_x(d: NaiveDate) -> f64 {
    d.num_days_from_ce() as f64
}

fn x_to_label(x: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Apply the log toggle: non-positive values cannot be shown and are dropped.
fn scale_y(v: f64, log: bool) -> Option<f64> {
    if !log {
        return Some(v);
    }
    (v > 0.0).then(|| v.log10())
}

/// Axis formatter that labels integer ticks with category names.
fn category_axis(names: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark: GridMark, _range: &RangeInclusive<f64>| {
        let i = mark.value.round();
        if (mark.value - i).abs() > f64::EPSILON || i < 0.0 {
            return String::new();
        }
        names.get(i as usize).cloned().unwrap_or_default()
    }
}

fn y_label(metric_label: &str, per_million: bool, log: bool) -> String {
    let mut label = metric_label.to_string();
    if per_million {
        label.push_str(" per million");
    }
    if log {
        label.push_str(" (log10)");
    }
    label
}

// ---------------------------------------------------------------------------
// Trends: one line per entity
// ---------------------------------------------------------------------------

fn trends_plot(ui: &mut Ui, state: &AppState) {
    let Some(params) = &state.params else { return };
    let view = &state.view;

    ui.label(RichText::new(format!("{} Over Time", params.metric.label())).strong());
    if view.trends.is_empty() {
        ui.label("No data for the current selection.");
        return;
    }

    Plot::new("trends_plot")
        .legend(Legend::default())
        .x_axis_label("Date")
        .y_axis_label(y_label(&params.metric.label(), params.per_million, state.log_scale))
        .x_axis_formatter(|mark, _range| x_to_label(mark.value))
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (entity, series) in &view.trends {
                let color = state
                    .entity_colors
                    .as_ref()
                    .map(|cm| cm.color_for(entity))
                    .unwrap_or(Color32::LIGHT_BLUE);

                let points: PlotPoints = series
                    .iter()
                    .filter_map(|&(d, v)| Some([date_to_x(d), scale_y(v, state.log_scale)?]))
                    .collect();

                plot_ui.line(Line::new(points).name(entity).color(color).width(1.5));
            }
        });
}

// ---------------------------------------------------------------------------
// Global view: per-country values on one day, coloured by magnitude
// ---------------------------------------------------------------------------

fn global_view(ui: &mut Ui, state: &mut AppState) {
    let Some(params) = &mut state.params else { return };

    let mut changed = false;
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Date for global view");
        changed = ui
            .add(DatePickerButton::new(&mut params.map_date).id_salt("map_date"))
            .changed();
    });
    let title = format!("Global {} on {}", params.metric.label(), params.map_date);
    if changed {
        state.refresh();
    }
    ui.label(RichText::new(title).strong());

    let mut rows: Vec<_> = state
        .view
        .map_rows
        .iter()
        .filter_map(|r| Some((r, r.value?)))
        .collect();
    if rows.is_empty() {
        ui.label("No observations on this date.");
        return;
    }
    rows.sort_by(|a, b| b.1.total_cmp(&a.1));

    let max = rows.first().map(|(_, v)| *v).unwrap_or(0.0);
    let min = rows.last().map(|(_, v)| *v).unwrap_or(0.0);
    let span = if max > min { max - min } else { 1.0 };

    ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui: &mut Ui| {
        egui::Grid::new("global_grid")
            .striped(true)
            .num_columns(3)
            .show(ui, |ui: &mut Ui| {
                ui.strong("ISO");
                ui.strong("Country");
                ui.strong("Value");
                ui.end_row();
                for (row, value) in rows {
                    let fill = color::sequential((value - min) / span);
                    ui.label(&row.iso_code);
                    ui.label(&row.entity);
                    ui.label(
                        RichText::new(format_value(value))
                            .background_color(fill)
                            .color(Color32::WHITE),
                    );
                    ui.end_row();
                }
            });
    });
}

fn format_value(v: f64) -> String {
    if v.abs() >= 1_000_000.0 {
        format!("{:.2}M", v / 1_000_000.0)
    } else if v.abs() >= 1_000.0 {
        format!("{:.1}k", v / 1_000.0)
    } else {
        format!("{v:.2}")
    }
}

// ---------------------------------------------------------------------------
// Cases vs vaccinations scatter
// ---------------------------------------------------------------------------

fn vaccination_scatter(ui: &mut Ui, state: &AppState) {
    let view = &state.view;
    let Some(day) = view.scatter_date else {
        ui.label("No data loaded.");
        return;
    };
    ui.label(
        RichText::new(format!(
            "Total Cases vs Vaccination Rate (Log Scale Y) on {day}"
        ))
        .strong(),
    );

    let max_pop = view
        .scatter
        .iter()
        .filter_map(|p| p.population)
        .fold(0.0_f64, f64::max);

    Plot::new("vaccination_scatter")
        .legend(Legend::default())
        .x_axis_label("Vaccination Rate (%)")
        .y_axis_label("Total Cases (log10)")
        .show(ui, |plot_ui| {
            for p in &view.scatter {
                let Some(y) = scale_y(p.total_cases, true) else {
                    continue;
                };
                let group = p.region_group.as_deref().unwrap_or("Other");
                let color = state
                    .region_colors
                    .as_ref()
                    .map(|cm| cm.color_for(group))
                    .unwrap_or(Color32::LIGHT_BLUE);
                let radius = match p.population {
                    Some(pop) if max_pop > 0.0 => 2.0 + 14.0 * (pop / max_pop).sqrt() as f32,
                    _ => 2.0,
                };
                plot_ui.points(
                    Points::new(vec![[p.vaccination_rate, y]])
                        .name(group)
                        .color(color)
                        .radius(radius)
                        .filled(true),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Distribution: histogram + per-continent box plot
// ---------------------------------------------------------------------------

fn distribution_plots(ui: &mut Ui, state: &AppState) {
    let Some(params) = &state.params else { return };
    let view = &state.view;
    let label = y_label(&params.metric.label(), params.per_million, false);

    ui.label(RichText::new(format!("Distribution of latest {label}")).strong());
    let half = ui.available_height() / 2.0 - 10.0;

    let bars: Vec<Bar> = view
        .histogram
        .iter()
        .map(|b| {
            Bar::new((b.lower + b.upper) / 2.0, b.count as f64)
                .width((b.upper - b.lower).max(f64::EPSILON))
                .name(format!("{:.1} – {:.1}", b.lower, b.upper))
        })
        .collect();
    Plot::new("histogram")
        .height(half)
        .x_axis_label(label.clone())
        .y_axis_label("Countries")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(Color32::LIGHT_BLUE).name("count"));
        });

    let boxes: Vec<BoxElem> = view
        .boxes
        .iter()
        .enumerate()
        .map(|(i, (group, s))| {
            let color = state
                .region_colors
                .as_ref()
                .map(|cm| cm.color_for(group))
                .unwrap_or(Color32::LIGHT_BLUE);
            BoxElem::new(
                i as f64,
                BoxSpread::new(s.lower_whisker, s.q1, s.median, s.q3, s.upper_whisker),
            )
            .name(group)
            .box_width(0.6)
            .fill(color.linear_multiply(0.4))
            .stroke(egui::Stroke::new(1.5, color))
        })
        .collect();
    let names: Vec<String> = view.boxes.iter().map(|(g, _)| g.clone()).collect();
    Plot::new("box_plot")
        .height(half)
        .y_axis_label(label)
        .x_axis_formatter(category_axis(names))
        .show(ui, |plot_ui| {
            plot_ui.box_plot(BoxPlot::new(boxes).name("by continent"));
        });
}

// ---------------------------------------------------------------------------
// Correlation heatmap
// ---------------------------------------------------------------------------

fn correlation_heatmap(ui: &mut Ui, state: &AppState) {
    for warning in &state.view.warnings {
        ui.label(RichText::new(warning).color(Color32::YELLOW));
    }
    let Some(matrix) = &state.view.correlation else {
        ui.label("Correlation matrix unavailable for this selection.");
        return;
    };
    ui.label(RichText::new("Correlation of latest values (Pearson, pairwise)").strong());

    ScrollArea::both().auto_shrink([false, false]).show(ui, |ui: &mut Ui| {
        egui::Grid::new("correlation_grid")
            .num_columns(matrix.size() + 1)
            .spacing([4.0, 4.0])
            .show(ui, |ui: &mut Ui| {
                ui.label("");
                for m in &matrix.metrics {
                    ui.label(RichText::new(m.label()).small());
                }
                ui.end_row();

                for (i, row_metric) in matrix.metrics.iter().enumerate() {
                    ui.label(RichText::new(row_metric.label()).small());
                    for j in 0..matrix.size() {
                        let cell = match matrix.get(i, j) {
                            Some(r) => RichText::new(format!("{r:+.2}"))
                                .background_color(color::diverging(r))
                                .color(Color32::BLACK),
                            None => RichText::new("  n/a  ").color(Color32::GRAY),
                        };
                        ui.label(cell.monospace());
                    }
                    ui.end_row();
                }
            });
    });
}

// ---------------------------------------------------------------------------
// Rankings: top-N bar chart, continent summary, monthly totals
// ---------------------------------------------------------------------------

fn rankings(ui: &mut Ui, state: &AppState) {
    let Some(params) = &state.params else { return };
    let view = &state.view;
    let metric = params.metric;

    let label = y_label(&metric.label(), params.per_million, false);
    ui.label(RichText::new(format!("Top {} by {label}", params.top_n)).strong());
    let third = ui.available_height() / 3.0 - 10.0;

    let names: Vec<String> = view.ranking.iter().map(|r| r.entity.clone()).collect();
    let bars: Vec<Bar> = view
        .ranking
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let color = state
                .entity_colors
                .as_ref()
                .map(|cm| cm.color_for(&r.entity))
                .unwrap_or(Color32::LIGHT_BLUE);
            Bar::new(i as f64, params.plotted_value(r).unwrap_or(0.0))
                .name(&r.entity)
                .fill(color)
                .width(0.7)
        })
        .collect();
    Plot::new("ranking_plot")
        .height(third)
        .x_axis_formatter(category_axis(names))
        .show(ui, |plot_ui| plot_ui.bar_chart(BarChart::new(bars)));

    ui.separator();
    ui.strong(format!("{} by continent (latest values)", metric.label()));
    egui::Grid::new("region_summary").striped(true).num_columns(3).show(ui, |ui: &mut Ui| {
        ui.strong("Continent");
        ui.strong("Sum");
        ui.strong("Mean");
        ui.end_row();
        for row in &view.by_region {
            ui.label(&row.key);
            for cell in &row.values {
                ui.label(cell.map(format_value).unwrap_or_else(|| "n/a".to_string()));
            }
            ui.end_row();
        }
    });

    ui.separator();
    ui.strong("Monthly new cases and deaths (selected countries)");
    let month_names: Vec<String> = view.monthly.iter().map(|r| r.key.clone()).collect();
    let series = |col: usize, offset: f64| -> Vec<Bar> {
        view.monthly
            .iter()
            .enumerate()
            .filter_map(|(i, row)| {
                let v = row.values.get(col).copied().flatten()?;
                Some(Bar::new(i as f64 + offset, v).width(0.35).name(&row.key))
            })
            .collect()
    };
    let cases = BarChart::new(series(0, -0.2)).name("new cases").color(Color32::LIGHT_BLUE);
    let deaths = BarChart::new(series(1, 0.2)).name("new deaths").color(Color32::LIGHT_RED);
    Plot::new("monthly_plot")
        .legend(Legend::default())
        .x_axis_formatter(category_axis(month_names))
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(cases);
            plot_ui.bar_chart(deaths);
        });
}
