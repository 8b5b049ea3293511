use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use super::model::{Metric, Record, Table};

// ---------------------------------------------------------------------------
// Latest-per-entity snapshot
// ---------------------------------------------------------------------------

/// One row per entity: the record with the latest date.
///
/// When several rows share the latest date the one encountered last wins.
/// Output order is the order in which entities first appear.
pub fn latest_per_entity(table: &Table) -> Table {
    let mut slot_of: HashMap<&str, usize> = HashMap::new();
    let mut latest: Vec<&Record> = Vec::new();

    for r in table {
        match slot_of.get(r.entity.as_str()) {
            Some(&slot) => {
                if r.date >= latest[slot].date {
                    latest[slot] = r;
                }
            }
            None => {
                slot_of.insert(&r.entity, latest.len());
                latest.push(r);
            }
        }
    }

    latest.into_iter().cloned().collect()
}

// ---------------------------------------------------------------------------
// Group aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Sum,
    Mean,
    Max,
}

impl Reduction {
    /// Reduce the present values; `None` when there are none.
    pub fn reduce<I: IntoIterator<Item = f64>>(self, values: I) -> Option<f64> {
        let mut iter = values.into_iter();
        let first = iter.next()?;
        let (acc, n) = iter.fold((first, 1usize), |(acc, n), v| match self {
            Reduction::Sum | Reduction::Mean => (acc + v, n + 1),
            Reduction::Max => (acc.max(v), n + 1),
        });
        Some(match self {
            Reduction::Mean => acc / n as f64,
            Reduction::Sum | Reduction::Max => acc,
        })
    }
}

/// Partition key for [`group_aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    RegionGroup,
    /// Calendar month, rendered `YYYY-MM` so keys sort chronologically.
    Month,
    Entity,
    Date,
}

impl GroupKey {
    fn key_of(self, r: &Record) -> Option<String> {
        match self {
            GroupKey::RegionGroup => r.region_group.clone(),
            GroupKey::Month => Some(r.date.format("%Y-%m").to_string()),
            GroupKey::Entity => Some(r.entity.clone()),
            GroupKey::Date => Some(r.date.format("%Y-%m-%d").to_string()),
        }
    }
}

/// One output row of a group aggregate; `values[i]` matches the i-th
/// requested `(metric, reduction)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub key: String,
    pub values: Vec<Option<f64>>,
}

/// Reduce each requested column over every partition of `table`.
///
/// Rows without a key (no region group) are dropped. A cell whose partition
/// has no present value stays `None` rather than collapsing to zero.
pub fn group_aggregate(
    table: &Table,
    key: GroupKey,
    columns: &[(Metric, Reduction)],
) -> Vec<GroupRow> {
    let mut partitions: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
    for r in table {
        if let Some(k) = key.key_of(r) {
            partitions.entry(k).or_default().push(r);
        }
    }

    partitions
        .into_iter()
        .map(|(key, rows)| GroupRow {
            key,
            values: columns
                .iter()
                .map(|&(metric, reduction)| {
                    reduction.reduce(rows.iter().filter_map(|r| metric.value(r)))
                })
                .collect(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Top-N ranking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// The `n` entities with the largest `metric` in their latest record.
///
/// Entities with a missing value rank below every present value, so the
/// result always holds `min(n, entities)` rows. Ties keep encounter order.
pub fn top_n(table: &Table, metric: Metric, n: usize, order: SortOrder) -> Table {
    let snapshot = latest_per_entity(table);
    let mut ranked: Vec<(Option<f64>, &Record)> =
        snapshot.iter().map(|r| (metric.value(r), r)).collect();

    // Stable sort: equal keys keep encounter order.
    ranked.sort_by(|(a, _), (b, _)| descending(*a, *b));
    ranked.truncate(n);

    if order == SortOrder::Ascending {
        ranked.sort_by(|(a, _), (b, _)| descending(*b, *a));
    }

    ranked.into_iter().map(|(_, r)| r.clone()).collect()
}

/// Present values before missing ones, larger before smaller.
fn descending(a: Option<f64>, b: Option<f64>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ---------------------------------------------------------------------------
// Scalar aggregate and period delta
// ---------------------------------------------------------------------------

pub fn scalar_aggregate(table: &Table, metric: Metric, reduction: Reduction) -> Option<f64> {
    reduction.reduce(table.iter().filter_map(|r| metric.value(r)))
}

/// Percentage change of a scalar aggregate between two windows.
///
/// `None` ("no delta") when the past window is empty, its aggregate is
/// missing or zero, or the current aggregate is missing.
pub fn period_delta(
    current: &Table,
    past: &Table,
    metric: Metric,
    reduction: Reduction,
) -> Option<f64> {
    if past.is_empty() {
        return None;
    }
    let before = scalar_aggregate(past, metric, reduction)?;
    if before == 0.0 {
        return None;
    }
    let now = scalar_aggregate(current, metric, reduction)?;
    Some((now - before) / before * 100.0).filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Time series helpers for line charts
// ---------------------------------------------------------------------------

pub type Series = Vec<(NaiveDate, f64)>;

/// Per-entity `(date, value)` series, date-ordered; missing cells skipped.
pub fn time_series(table: &Table, metric: Metric) -> BTreeMap<String, Series> {
    time_series_by(table, |r| metric.value(r))
}

/// Like [`time_series`] with an arbitrary per-record value (e.g. a metric
/// normalised by population).
pub fn time_series_by<F>(table: &Table, value: F) -> BTreeMap<String, Series>
where
    F: Fn(&Record) -> Option<f64>,
{
    let mut out: BTreeMap<String, Series> = BTreeMap::new();
    for r in table {
        if let Some(v) = value(r) {
            out.entry(r.entity.clone()).or_default().push((r.date, v));
        }
    }
    for series in out.values_mut() {
        series.sort_by_key(|(d, _)| *d);
    }
    out
}

/// Trailing mean over the last `window` points (fewer at the start).
pub fn rolling_mean(series: &[(NaiveDate, f64)], window: usize) -> Series {
    if window <= 1 {
        return series.to_vec();
    }
    let mut sum = 0.0;
    series
        .iter()
        .enumerate()
        .map(|(i, &(date, v))| {
            sum += v;
            if i >= window {
                sum -= series[i - window].1;
            }
            let n = (i + 1).min(window);
            (date, sum / n as f64)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Distribution summaries (histogram, box plot)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram. The maximum lands in the last bin.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let (Some(min), Some(max)) = (
        finite.iter().copied().reduce(f64::min),
        finite.iter().copied().reduce(f64::max),
    ) else {
        return Vec::new();
    };

    if bins == 0 {
        return Vec::new();
    }
    if max == min {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: finite.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();

    for v in finite {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

/// Five-number summary plus Tukey whiskers.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub count: usize,
}

pub fn box_summary(values: &[f64]) -> Option<BoxSummary> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile(&sorted, 0.25);
    let median = quantile(&sorted, 0.5);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

    let lower_whisker = sorted.iter().copied().find(|v| *v >= lo_fence).unwrap_or(q1);
    let upper_whisker = sorted
        .iter()
        .rev()
        .copied()
        .find(|v| *v <= hi_fence)
        .unwrap_or(q3);

    Some(BoxSummary {
        min: sorted[0],
        q1,
        median,
        q3,
        max: sorted[sorted.len() - 1],
        lower_whisker,
        upper_whisker,
        count: sorted.len(),
    })
}

/// Linear-interpolated quantile of sorted data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(entity: &str, region: Option<&str>, date: NaiveDate, cases: Option<f64>) -> Record {
        Record {
            entity: entity.into(),
            region_group: region.map(Into::into),
            date,
            total_cases: cases,
            ..Default::default()
        }
    }

    #[test]
    fn latest_per_entity_keeps_max_date_and_encounter_order() {
        let t: Table = vec![
            row("A", None, day(2021, 1, 1), Some(10.0)),
            row("B", None, day(2021, 1, 1), Some(5.0)),
            row("A", None, day(2021, 2, 1), Some(20.0)),
            row("A", None, day(2021, 1, 15), Some(15.0)),
        ]
        .into_iter()
        .collect();

        let snap = latest_per_entity(&t);
        let got: Vec<_> = snap.iter().map(|r| (r.entity.as_str(), r.total_cases)).collect();
        assert_eq!(got, vec![("A", Some(20.0)), ("B", Some(5.0))]);
    }

    #[test]
    fn latest_per_entity_ties_resolve_to_last_row() {
        let t: Table = vec![
            row("A", None, day(2021, 1, 1), Some(1.0)),
            row("A", None, day(2021, 1, 1), Some(2.0)),
        ]
        .into_iter()
        .collect();
        assert_eq!(latest_per_entity(&t).records()[0].total_cases, Some(2.0));
    }

    #[test]
    fn group_aggregate_leaves_empty_cells_undefined() {
        let t: Table = vec![
            row("A", Some("Europe"), day(2021, 1, 1), Some(10.0)),
            row("B", Some("Europe"), day(2021, 1, 1), Some(30.0)),
            row("C", Some("Asia"), day(2021, 1, 1), None),
            row("D", None, day(2021, 1, 1), Some(99.0)),
        ]
        .into_iter()
        .collect();

        let rows = group_aggregate(
            &t,
            GroupKey::RegionGroup,
            &[
                (Metric::TotalCases, Reduction::Sum),
                (Metric::TotalCases, Reduction::Mean),
                (Metric::TotalCases, Reduction::Max),
            ],
        );
        assert_eq!(
            rows,
            vec![
                GroupRow {
                    key: "Asia".into(),
                    values: vec![None, None, None],
                },
                GroupRow {
                    key: "Europe".into(),
                    values: vec![Some(40.0), Some(20.0), Some(30.0)],
                },
            ]
        );
    }

    #[test]
    fn group_by_month_sorts_chronologically() {
        let t: Table = vec![
            row("A", None, day(2021, 2, 3), Some(1.0)),
            row("A", None, day(2021, 1, 9), Some(2.0)),
            row("B", None, day(2021, 1, 10), Some(3.0)),
        ]
        .into_iter()
        .collect();
        let rows = group_aggregate(&t, GroupKey::Month, &[(Metric::TotalCases, Reduction::Sum)]);
        let keys: Vec<_> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["2021-01", "2021-02"]);
        assert_eq!(rows[0].values, vec![Some(5.0)]);
    }

    #[test]
    fn top_n_ranks_snapshot_and_honours_order() {
        let t: Table = vec![
            row("A", None, day(2021, 1, 1), Some(10.0)),
            row("B", None, day(2021, 1, 1), Some(50.0)),
            row("C", None, day(2021, 1, 1), Some(30.0)),
            row("A", None, day(2021, 2, 1), Some(40.0)),
            row("D", None, day(2021, 1, 1), None),
        ]
        .into_iter()
        .collect();

        let names = |t: &Table| t.iter().map(|r| r.entity.clone()).collect::<Vec<_>>();

        let desc = top_n(&t, Metric::TotalCases, 2, SortOrder::Descending);
        assert_eq!(names(&desc), vec!["B", "A"]);

        let asc = top_n(&t, Metric::TotalCases, 3, SortOrder::Ascending);
        assert_eq!(names(&asc), vec!["C", "A", "B"]);

        let all = top_n(&t, Metric::TotalCases, 10, SortOrder::Descending);
        assert_eq!(all.len(), 4);
        assert_eq!(names(&all).last().map(String::as_str), Some("D"));
    }

    #[test]
    fn top_n_ties_keep_encounter_order() {
        let t: Table = vec![
            row("X", None, day(2021, 1, 1), Some(7.0)),
            row("Y", None, day(2021, 1, 1), Some(7.0)),
            row("Z", None, day(2021, 1, 1), Some(7.0)),
        ]
        .into_iter()
        .collect();
        let out = top_n(&t, Metric::TotalCases, 2, SortOrder::Descending);
        let names: Vec<_> = out.iter().map(|r| r.entity.as_str()).collect();
        assert_eq!(names, vec!["X", "Y"]);
    }

    #[test]
    fn period_delta_handles_zero_and_empty_past() {
        let cur: Table = vec![row("A", None, day(2021, 2, 1), Some(150.0))]
            .into_iter()
            .collect();
        let past: Table = vec![row("A", None, day(2021, 1, 1), Some(100.0))]
            .into_iter()
            .collect();
        let zero: Table = vec![row("A", None, day(2021, 1, 1), Some(0.0))]
            .into_iter()
            .collect();
        let blank: Table = vec![row("A", None, day(2021, 1, 1), None)].into_iter().collect();

        assert_eq!(
            period_delta(&cur, &past, Metric::TotalCases, Reduction::Sum),
            Some(50.0)
        );
        assert_eq!(period_delta(&cur, &zero, Metric::TotalCases, Reduction::Sum), None);
        assert_eq!(
            period_delta(&cur, &Table::default(), Metric::TotalCases, Reduction::Sum),
            None
        );
        assert_eq!(period_delta(&cur, &blank, Metric::TotalCases, Reduction::Sum), None);
    }

    #[test]
    fn rolling_mean_is_trailing() {
        let s: Series = (1..=4).map(|i| (day(2021, 1, i), i as f64)).collect();
        let r = rolling_mean(&s, 2);
        let vals: Vec<f64> = r.iter().map(|(_, v)| *v).collect();
        assert_eq!(vals, vec![1.0, 1.5, 2.5, 3.5]);
        assert_eq!(rolling_mean(&s, 1), s);
    }

    #[test]
    fn time_series_is_date_ordered_per_entity() {
        let t: Table = vec![
            row("A", None, day(2021, 1, 3), Some(3.0)),
            row("A", None, day(2021, 1, 1), Some(1.0)),
            row("A", None, day(2021, 1, 2), None),
        ]
        .into_iter()
        .collect();
        let series = time_series(&t, Metric::TotalCases);
        assert_eq!(
            series["A"],
            vec![(day(2021, 1, 1), 1.0), (day(2021, 1, 3), 3.0)]
        );
    }

    #[test]
    fn histogram_puts_max_in_last_bin() {
        let bins = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 4);
        let counts: Vec<usize> = bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1, 1, 2]);
        assert_eq!(bins[3].upper, 4.0);

        assert!(histogram(&[], 5).is_empty());
        assert_eq!(histogram(&[2.0, 2.0], 5).len(), 1);
    }

    #[test]
    fn box_summary_interpolates_quartiles() {
        let s = box_summary(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(s.q1, 2.0);
        assert_eq!(s.median, 3.0);
        assert_eq!(s.q3, 4.0);
        assert_eq!(s.upper_whisker, 4.0);
        assert_eq!(s.lower_whisker, 1.0);
        assert_eq!(s.max, 100.0);
        assert!(box_summary(&[]).is_none());
    }
}
