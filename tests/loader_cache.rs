use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::NaiveDate;
use pandemic_dashboard::data::cache::DatasetCache;
use pandemic_dashboard::data::loader::load_file;
use pandemic_dashboard::data::model::Metric;
use pandemic_dashboard::DashboardError;

const HEADER: &str = "iso_code,continent,location,date,total_cases,new_cases,population,people_vaccinated,extra_column\n";

fn write(path: &Path, body: &str) {
    std::fs::write(path, format!("{HEADER}{body}")).unwrap();
}

#[test]
fn csv_loads_with_blanks_and_unknown_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("covid.csv");
    write(
        &path,
        "USA,North America,United States,2021-01-01,100,10,331000000,,x\n\
         OWID_WRL,,World,2021-01-01 00:00:00,1000.0,,7800000000,n/a,y\n",
    );

    let table = load_file(&path).unwrap();
    assert_eq!(table.len(), 2);

    let usa = &table.records()[0];
    assert_eq!(usa.entity, "United States");
    assert_eq!(usa.region_group.as_deref(), Some("North America"));
    assert_eq!(usa.date, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
    assert_eq!(usa.people_vaccinated, None);
    assert_eq!(Metric::NewCases.value(usa), Some(10.0));

    let world = &table.records()[1];
    assert_eq!(world.region_group, None);
    assert_eq!(world.new_cases, None);
    assert_eq!(world.people_vaccinated, None);
    assert_eq!(world.total_cases, Some(1000.0));
}

#[test]
fn tsv_is_read_with_tab_delimiter() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("covid.tsv");
    std::fs::write(
        &path,
        "location\tiso_code\tdate\ttotal_cases\nIndia\tIND\t2021-03-01\t42\n",
    )
    .unwrap();
    let table = load_file(&path).unwrap();
    assert_eq!(table.records()[0].total_cases, Some(42.0));
}

#[test]
fn negative_and_decreasing_counters_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("covid.csv");
    write(
        &path,
        "USA,North America,United States,2021-01-01,100,-5,331000000,,\n\
         USA,North America,United States,2021-01-02,90,-10,331000000,,\n",
    );
    let table = load_file(&path).unwrap();
    assert_eq!(table.records()[1].total_cases, Some(90.0));
    assert_eq!(table.records()[1].new_cases, Some(-10.0));
}

#[test]
fn missing_file_is_data_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_file(&dir.path().join("nope.csv")).unwrap_err();
    assert!(matches!(err, DashboardError::DataUnavailable { .. }));
}

#[test]
fn bad_date_is_data_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("covid.csv");
    write(&path, "USA,North America,United States,01/02/2021,1,1,1,,\n");
    let err = load_file(&path).unwrap_err();
    match err {
        DashboardError::DataUnavailable { reason, .. } => {
            assert!(reason.contains("line 2"), "{reason}");
            assert!(reason.contains("01/02/2021"), "{reason}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn missing_date_column_is_data_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("covid.csv");
    std::fs::write(&path, "location,iso_code\nIndia,IND\n").unwrap();
    let err = load_file(&path).unwrap_err();
    assert!(err.to_string().contains("missing 'date' column"));
}

#[test]
fn cache_returns_same_table_until_source_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("covid.csv");
    write(&path, "USA,North America,United States,2021-01-01,100,10,331000000,,\n");

    let cache = DatasetCache::new();
    assert!(cache.current().is_none());

    let first = cache.get_or_load(&path).unwrap();
    let again = cache.get_or_load(&path).unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    // Replacing the file (different size) invalidates the entry.
    write(
        &path,
        "USA,North America,United States,2021-01-01,100,10,331000000,,\n\
         USA,North America,United States,2021-01-02,120,20,331000000,,\n",
    );
    let replaced = cache.get_or_load(&path).unwrap();
    assert!(!Arc::ptr_eq(&first, &replaced));
    assert_eq!(replaced.len(), 2);
    // Tables handed out earlier are untouched.
    assert_eq!(first.len(), 1);
}

#[test]
fn explicit_invalidation_forces_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("covid.csv");
    write(&path, "USA,North America,United States,2021-01-01,100,10,331000000,,\n");

    let cache = DatasetCache::new();
    let first = cache.get_or_load(&path).unwrap();
    cache.invalidate();
    assert!(cache.current().is_none());

    let second = cache.get_or_load(&path).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(*first, *second);
}

#[test]
fn cache_reports_missing_source() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DatasetCache::new();
    let err = cache.get_or_load(&dir.path().join("gone.csv")).unwrap_err();
    assert!(matches!(err, DashboardError::DataUnavailable { .. }));
}

#[test]
fn cache_reloads_when_only_mtime_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("covid.csv");
    write(&path, "USA,North America,United States,2021-01-01,100,10,331000000,,\n");

    let cache = DatasetCache::new();
    let first = cache.get_or_load(&path).unwrap();

    // Same byte length, different content, pinned to another timestamp.
    write(&path, "USA,North America,United States,2021-01-01,200,10,331000000,,\n");
    let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000);
    std::fs::OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(stamp)
        .unwrap();

    let second = cache.get_or_load(&path).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first.len(), second.len());
    assert_eq!(second.records()[0].total_cases, Some(200.0));
}
