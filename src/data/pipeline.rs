//! One full recomputation pass: filter → aggregate → derive → correlate.
//!
//! The GUI calls [`run`] after every interaction and renders the returned
//! [`DashboardView`]; nothing here holds state between calls.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::aggregate::{
    box_summary, group_aggregate, histogram, latest_per_entity, period_delta, rolling_mean,
    time_series_by, top_n, BoxSummary, GroupKey, GroupRow, HistogramBin, Reduction, Series,
    SortOrder,
};
use super::correlation::{correlate, CorrelationMatrix};
use super::derived;
use super::filter::{filter, FilterSpec};
use super::model::{Metric, Record, Table};
use crate::config::DashboardConfig;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Everything the side panel controls.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardParams {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub region_group: Option<String>,
    /// Empty → fall back to the top-N entities by `metric`.
    pub entities: BTreeSet<String>,
    pub metric: Metric,
    /// Day shown in the global view.
    pub map_date: NaiveDate,
    pub top_n: usize,
    /// Offset of the comparison window for the period delta; 0 disables it.
    pub delta_days: u64,
    /// Normalise absolute counters by population (per million).
    pub per_million: bool,
    /// Trailing window for trend smoothing; 0 or 1 disables it.
    pub rolling_window: usize,
    pub histogram_bins: usize,
    pub correlation_metrics: Vec<Metric>,
    pub min_correlation_rows: usize,
}

impl DashboardParams {
    /// Initial selection for a freshly loaded table: full date range, map on
    /// the last day, configured entities that actually exist.
    pub fn defaults_for(table: &Table, config: &DashboardConfig) -> Option<Self> {
        let (first, last) = table.date_range()?;
        let known = table.entities();
        let entities = config
            .default_entities
            .iter()
            .filter(|e| known.contains(*e))
            .cloned()
            .collect();

        Some(DashboardParams {
            date_from: first,
            date_to: last,
            region_group: None,
            entities,
            metric: config.default_metric,
            map_date: last,
            top_n: config.top_n,
            delta_days: config.delta_days,
            per_million: false,
            rolling_window: 0,
            histogram_bins: config.histogram_bins,
            correlation_metrics: config.correlation_metrics.clone(),
            min_correlation_rows: config.min_correlation_rows,
        })
    }

    /// Date window plus region, without the entity selection.
    pub fn window_spec(&self) -> FilterSpec {
        FilterSpec::window(self.date_from, self.date_to)
            .with_region_group(self.region_group.clone())
    }

    /// The metric as plotted, honouring the per-million toggle.
    pub fn plotted_value(&self, r: &Record) -> Option<f64> {
        if self.per_million && !self.metric.is_relative() {
            derived::per_million(self.metric.value(r), r.population)
        } else {
            self.metric.value(r)
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// One cell of the global view.
#[derive(Debug, Clone, PartialEq)]
pub struct MapRow {
    pub iso_code: String,
    pub entity: String,
    pub value: Option<f64>,
}

/// One bubble of the cases-vs-vaccination scatter.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub entity: String,
    pub region_group: Option<String>,
    pub vaccination_rate: f64,
    pub total_cases: f64,
    pub population: Option<f64>,
}

/// Every chart's input for one interaction.
#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    /// Entities actually plotted (the selection or the fallback).
    pub entities: Vec<String>,
    pub used_fallback: bool,
    /// Rows matching date range, region and entities.
    pub filtered: Table,
    pub trends: BTreeMap<String, Series>,
    /// Latest row per entity within the date window and region.
    pub snapshot: Table,
    pub ranking: Table,
    /// `[sum, mean]` of the metric per region over the snapshot.
    pub by_region: Vec<GroupRow>,
    /// `[new_cases, new_deaths]` monthly sums over the filtered rows.
    pub monthly: Vec<GroupRow>,
    /// Percent change of the summed metric against the shifted window.
    pub delta: Option<f64>,
    pub map_rows: Vec<MapRow>,
    pub scatter_date: Option<NaiveDate>,
    pub scatter: Vec<ScatterPoint>,
    pub histogram: Vec<HistogramBin>,
    pub boxes: Vec<(String, BoxSummary)>,
    pub correlation: Option<CorrelationMatrix>,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// The pass
// ---------------------------------------------------------------------------

pub fn run(table: &Table, params: &DashboardParams) -> DashboardView {
    let mut view = DashboardView::default();
    let window = filter(table, &params.window_spec());

    // Entities: explicit selection, else the caller-side top-N fallback.
    view.entities = if params.entities.is_empty() {
        view.used_fallback = true;
        top_n(&window, params.metric, params.top_n, SortOrder::Descending)
            .iter()
            .map(|r| r.entity.clone())
            .collect()
    } else {
        params.entities.iter().cloned().collect()
    };

    // An empty entity set on a FilterSpec means "no constraint"; a top-0
    // fallback must select nothing instead.
    let selection = params.window_spec().with_entities(view.entities.iter().cloned());
    if !view.entities.is_empty() {
        view.filtered = filter(table, &selection);
    }
    log::debug!(
        "window: {} rows, selection: {} rows for {} entities",
        window.len(),
        view.filtered.len(),
        view.entities.len()
    );

    view.trends = time_series_by(&view.filtered, |r| params.plotted_value(r));
    if params.rolling_window > 1 {
        for series in view.trends.values_mut() {
            *series = rolling_mean(series, params.rolling_window);
        }
    }

    view.snapshot = latest_per_entity(&window);
    view.ranking = top_n(&window, params.metric, params.top_n, SortOrder::Descending);
    view.by_region = group_aggregate(
        &view.snapshot,
        GroupKey::RegionGroup,
        &[(params.metric, Reduction::Sum), (params.metric, Reduction::Mean)],
    );
    view.monthly = group_aggregate(
        &view.filtered,
        GroupKey::Month,
        &[(Metric::NewCases, Reduction::Sum), (Metric::NewDeaths, Reduction::Sum)],
    );

    if params.delta_days > 0 && !view.entities.is_empty() {
        let past = filter(table, &selection.shifted(params.delta_days));
        view.delta = period_delta(
            &latest_per_entity(&view.filtered),
            &latest_per_entity(&past),
            params.metric,
            Reduction::Sum,
        );
    }

    view.map_rows = table
        .on_date(params.map_date)
        .iter()
        .map(|r| MapRow {
            iso_code: r.iso_code.clone(),
            entity: r.entity.clone(),
            value: params.plotted_value(r),
        })
        .collect();

    view.scatter_date = table.date_range().map(|(_, last)| last);
    if let Some(day) = view.scatter_date {
        view.scatter = table
            .on_date(day)
            .iter()
            .filter_map(|r| {
                Some(ScatterPoint {
                    entity: r.entity.clone(),
                    region_group: r.region_group.clone(),
                    vaccination_rate: derived::vaccination_rate(r)?,
                    total_cases: r.total_cases?,
                    population: r.population,
                })
            })
            .collect();
    }

    let values: Vec<f64> = view
        .snapshot
        .iter()
        .filter_map(|r| params.plotted_value(r))
        .collect();
    view.histogram = histogram(&values, params.histogram_bins);

    let mut per_region: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in &view.snapshot {
        if let (Some(group), Some(v)) = (&r.region_group, params.plotted_value(r)) {
            per_region.entry(group.clone()).or_default().push(v);
        }
    }
    view.boxes = per_region
        .into_iter()
        .filter_map(|(group, vals)| Some((group, box_summary(&vals)?)))
        .collect();

    match correlate(
        &view.snapshot,
        &params.correlation_metrics,
        params.min_correlation_rows,
    ) {
        Ok(matrix) => view.correlation = Some(matrix),
        Err(e) => {
            log::warn!("Correlation skipped: {e}");
            view.warnings.push(format!("Correlation unavailable: {e}"));
        }
    }

    log::debug!(
        "snapshot: {} entities, map: {} rows, scatter: {} points",
        view.snapshot.len(),
        view.map_rows.len(),
        view.scatter.len()
    );
    view
}
