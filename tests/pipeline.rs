use std::collections::BTreeSet;

use chrono::NaiveDate;
use pandemic_dashboard::data::aggregate::{latest_per_entity, top_n, SortOrder};
use pandemic_dashboard::data::derived::vaccination_rate;
use pandemic_dashboard::data::filter::{filter, FilterSpec};
use pandemic_dashboard::data::model::{Metric, Record, Table};
use pandemic_dashboard::data::pipeline::{run, DashboardParams};
use pandemic_dashboard::DashboardConfig;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A on 2021-01-01 (cases 10, pop 1000) and 2021-02-01 (cases 20);
/// B on 2021-01-01 (cases 5, pop 500).
fn scenario_table() -> Table {
    vec![
        Record {
            entity: "A".into(),
            region_group: Some("Europe".into()),
            iso_code: "AAA".into(),
            date: day(2021, 1, 1),
            total_cases: Some(10.0),
            population: Some(1000.0),
            ..Default::default()
        },
        Record {
            entity: "B".into(),
            region_group: Some("Asia".into()),
            iso_code: "BBB".into(),
            date: day(2021, 1, 1),
            total_cases: Some(5.0),
            population: Some(500.0),
            ..Default::default()
        },
        Record {
            entity: "A".into(),
            region_group: Some("Europe".into()),
            iso_code: "AAA".into(),
            date: day(2021, 2, 1),
            total_cases: Some(20.0),
            ..Default::default()
        },
    ]
    .into_iter()
    .collect()
}

#[test]
fn january_window_keeps_first_a_row_and_b() {
    let table = scenario_table();
    let out = filter(&table, &FilterSpec::window(day(2021, 1, 1), day(2021, 1, 31)));
    let got: Vec<_> = out.iter().map(|r| (r.entity.as_str(), r.date)).collect();
    assert_eq!(got, vec![("A", day(2021, 1, 1)), ("B", day(2021, 1, 1))]);
}

#[test]
fn latest_per_entity_on_full_table() {
    let snap = latest_per_entity(&scenario_table());
    let got: Vec<_> = snap.iter().map(|r| (r.entity.as_str(), r.total_cases)).collect();
    assert_eq!(got, vec![("A", Some(20.0)), ("B", Some(5.0))]);
}

#[test]
fn vaccination_rate_scenario() {
    let mut r = Record {
        people_vaccinated: Some(600.0),
        population: Some(1000.0),
        ..Default::default()
    };
    assert_eq!(vaccination_rate(&r), Some(60.0));
    r.people_vaccinated = Some(1200.0);
    assert_eq!(vaccination_rate(&r), Some(100.0));
}

#[test]
fn top_n_size_is_bounded_by_entities() {
    let table = scenario_table();
    for n in 0..4 {
        let out = top_n(&table, Metric::TotalCases, n, SortOrder::Descending);
        assert_eq!(out.len(), n.min(2));
        let names: BTreeSet<_> = out.iter().map(|r| r.entity.clone()).collect();
        assert_eq!(names.len(), out.len());
    }
}

/// Twelve countries over two months, enough for a correlation matrix.
fn wide_table() -> Table {
    let regions = ["Europe", "Asia", "Africa"];
    let mut rows = Vec::new();
    for i in 0..12 {
        for (d, scale) in [(day(2021, 1, 1), 1.0), (day(2021, 2, 1), 2.0)] {
            rows.push(Record {
                entity: format!("C{i:02}"),
                region_group: Some(regions[i % 3].to_string()),
                iso_code: format!("C{i:02}"),
                date: d,
                population: Some(1_000.0 * (i + 1) as f64),
                total_cases: Some(scale * 100.0 * (i + 1) as f64),
                new_cases: Some(10.0),
                total_deaths: Some(scale * (i + 1) as f64),
                people_vaccinated: Some(scale * 50.0 * (i + 1) as f64),
                gdp_per_capita: Some(1_000.0 + (i * 37 % 11) as f64),
                median_age: Some(30.0 + (i % 5) as f64),
                ..Default::default()
            });
        }
    }
    rows.into_iter().collect()
}

fn params_for(table: &Table) -> DashboardParams {
    let config = DashboardConfig {
        default_entities: vec!["C00".into(), "C01".into(), "Nowhere".into()],
        delta_days: 31,
        top_n: 3,
        correlation_metrics: vec![
            Metric::TotalCases,
            Metric::TotalDeaths,
            Metric::GdpPerCapita,
            Metric::MedianAge,
        ],
        ..DashboardConfig::default()
    };
    DashboardParams::defaults_for(table, &config).unwrap()
}

#[test]
fn defaults_cover_table_and_drop_unknown_entities() {
    let table = wide_table();
    let params = params_for(&table);
    assert_eq!(params.date_from, day(2021, 1, 1));
    assert_eq!(params.date_to, day(2021, 2, 1));
    assert_eq!(params.map_date, day(2021, 2, 1));
    assert_eq!(
        params.entities,
        ["C00", "C01"].iter().map(|s| s.to_string()).collect::<BTreeSet<_>>()
    );
}

#[test]
fn full_pass_produces_every_view() {
    let table = wide_table();
    let params = params_for(&table);
    let view = run(&table, &params);

    assert!(!view.used_fallback);
    assert_eq!(view.entities, vec!["C00".to_string(), "C01".to_string()]);
    assert_eq!(view.filtered.len(), 4);
    assert_eq!(view.trends.len(), 2);
    assert_eq!(view.snapshot.len(), 12);
    assert_eq!(view.ranking.len(), 3);
    assert_eq!(view.ranking.records()[0].entity, "C11");

    let regions: Vec<_> = view.by_region.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(regions, vec!["Africa", "Asia", "Europe"]);
    assert_eq!(view.monthly.len(), 2);
    assert_eq!(view.monthly[0].values, vec![Some(20.0), None]);

    // Feb totals (600) against the window shifted 31 days (Jan: 300).
    assert_eq!(view.delta, Some(100.0));

    assert_eq!(view.map_rows.len(), 12);
    assert_eq!(view.scatter_date, Some(day(2021, 2, 1)));
    assert_eq!(view.scatter.len(), 12);
    assert!(view.scatter.iter().all(|p| (p.vaccination_rate - 10.0).abs() < 1e-9));

    assert_eq!(view.histogram.iter().map(|b| b.count).sum::<usize>(), 12);
    assert_eq!(view.boxes.len(), 3);

    let matrix = view.correlation.expect("twelve rows is enough");
    assert_eq!(matrix.size(), 4);
    assert!((matrix.get(0, 1).unwrap() - 1.0).abs() < 1e-9);
    assert!(view.warnings.is_empty());
}

#[test]
fn empty_selection_falls_back_to_top_n() {
    let table = wide_table();
    let mut params = params_for(&table);
    params.entities.clear();
    let view = run(&table, &params);

    assert!(view.used_fallback);
    assert_eq!(view.entities, vec!["C11", "C10", "C09"]);
    assert_eq!(view.trends.len(), 3);
}

#[test]
fn small_region_degrades_correlation_to_a_warning() {
    let table = wide_table();
    let mut params = params_for(&table);
    params.region_group = Some("Asia".into());
    let view = run(&table, &params);

    assert!(view.correlation.is_none());
    assert_eq!(view.warnings.len(), 1);
    assert!(view.warnings[0].contains("insufficient data"));
    // Entities outside Asia are filtered away, not an error.
    assert!(view.filtered.iter().all(|r| r.region_group.as_deref() == Some("Asia")));
}

#[test]
fn region_absent_from_window_is_not_a_silent_zero() {
    let table = wide_table();
    let mut params = params_for(&table);
    params.region_group = Some("Europe".into());
    let view = run(&table, &params);
    assert!(view.by_region.iter().all(|row| row.key == "Europe"));
    assert!(view.by_region.iter().all(|row| row.values.iter().all(Option::is_some)));
}

#[test]
fn per_million_rescales_trends() {
    let table = wide_table();
    let mut params = params_for(&table);
    params.per_million = true;
    let view = run(&table, &params);
    // C00: 100 cases / 1000 people → 100 000 per million.
    assert!((view.trends["C00"][0].1 - 100_000.0).abs() < 1e-6);
}

#[test]
fn zero_delta_days_disables_comparison() {
    let table = wide_table();
    let mut params = params_for(&table);
    params.delta_days = 0;
    assert_eq!(run(&table, &params).delta, None);
}

#[test]
fn top_zero_fallback_selects_nothing() {
    let table = wide_table();
    let mut params = params_for(&table);
    params.entities.clear();
    params.top_n = 0;
    let view = run(&table, &params);

    assert!(view.used_fallback);
    assert!(view.entities.is_empty());
    assert!(view.filtered.is_empty());
    assert!(view.trends.is_empty());
    assert!(view.monthly.is_empty());
    assert_eq!(view.delta, None);
    // Window-level views are unaffected.
    assert_eq!(view.snapshot.len(), 12);
}

#[test]
fn scatter_uses_latest_date_of_whole_table() {
    let table = wide_table();
    let mut params = params_for(&table);
    params.date_to = day(2021, 1, 31);
    params.region_group = Some("Asia".into());
    let view = run(&table, &params);

    assert_eq!(view.scatter_date, Some(day(2021, 2, 1)));
    assert_eq!(view.scatter.len(), 12);
    // The window itself still stops in January.
    assert!(view.snapshot.iter().all(|r| r.date == day(2021, 1, 1)));
}

#[test]
fn ranking_values_follow_per_million_toggle() {
    let table = wide_table();
    let mut params = params_for(&table);
    params.per_million = true;
    let view = run(&table, &params);

    // C11: 2400 cases / 12 000 people in February → 200 000 per million.
    let top = &view.ranking.records()[0];
    assert_eq!(top.entity, "C11");
    let shown = params.plotted_value(top).unwrap();
    assert!((shown - 200_000.0).abs() < 1e-6);
}
