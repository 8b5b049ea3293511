//! Metrics computed from other columns of a record.
//!
//! All functions are total: a missing or zero denominator yields `None`
//! instead of an error or an infinity.

use super::model::Record;

const PER_MILLION: f64 = 1_000_000.0;

/// `numerator / denominator`, or `None` when the ratio is undefined.
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    if d == 0.0 {
        return None;
    }
    Some(n / d).filter(|v| v.is_finite())
}

/// Share of the population with at least one dose, in percent, capped at 100.
pub fn vaccination_rate(r: &Record) -> Option<f64> {
    ratio(r.people_vaccinated, r.population).map(|share| share.min(1.0) * 100.0)
}

/// Deaths per confirmed case, in percent. Undefined until the first case.
pub fn mortality_rate(r: &Record) -> Option<f64> {
    match r.total_cases {
        Some(cases) if cases > 0.0 => ratio(r.total_deaths, Some(cases)).map(|v| v * 100.0),
        _ => None,
    }
}

pub fn cases_per_million(r: &Record) -> Option<f64> {
    per_million(r.total_cases, r.population)
}

pub fn deaths_per_million(r: &Record) -> Option<f64> {
    per_million(r.total_deaths, r.population)
}

/// Normalise any counter by population (per-capita toggle).
pub fn per_million(value: Option<f64>, population: Option<f64>) -> Option<f64> {
    ratio(value, population).map(|v| v * PER_MILLION)
}
