use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::correlation::MIN_CORRELATION_ROWS;
use crate::data::model::Metric;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "PANDEMIC_DASH_CONFIG";
/// Environment variable overriding `data_path`.
pub const DATA_ENV: &str = "PANDEMIC_DASH_DATA";
/// Looked up in the working directory when `CONFIG_ENV` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "dashboard.json";

/// Dashboard settings. Every field has a default, so a config file only
/// needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    pub default_entities: Vec<String>,
    pub default_metric: Metric,
    pub top_n: usize,
    pub delta_days: u64,
    pub rolling_window: usize,
    pub histogram_bins: usize,
    pub min_correlation_rows: usize,
    pub correlation_metrics: Vec<Metric>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("cleaned_covid_data.csv"),
            default_entities: ["United States", "United Kingdom", "India", "Germany", "Brazil"]
                .into_iter()
                .map(String::from)
                .collect(),
            default_metric: Metric::TotalCases,
            top_n: 10,
            delta_days: 30,
            rolling_window: 7,
            histogram_bins: 20,
            min_correlation_rows: MIN_CORRELATION_ROWS,
            correlation_metrics: vec![
                Metric::TotalCases,
                Metric::TotalDeaths,
                Metric::PeopleVaccinated,
                Metric::GdpPerCapita,
                Metric::PopulationDensity,
                Metric::MedianAge,
                Metric::HospitalBedsPerThousand,
                Metric::LifeExpectancy,
                Metric::HumanDevelopmentIndex,
            ],
        }
    }
}

impl DashboardConfig {
    /// Parse a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Resolve the effective configuration from the environment.
    ///
    /// A config file that is named but unreadable is logged and replaced by
    /// the defaults; the data-path override applies either way.
    pub fn from_env() -> Self {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let candidate = explicit.or_else(|| {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            local.exists().then_some(local)
        });

        let mut config = match candidate {
            Some(path) => Self::from_file(&path).unwrap_or_else(|e| {
                log::warn!("Falling back to default config: {e:#}");
                Self::default()
            }),
            None => Self::default(),
        };

        if let Some(data) = std::env::var_os(DATA_ENV) {
            config.data_path = PathBuf::from(data);
        }
        log::debug!("Effective config: {config:?}");
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        std::fs::write(
            &path,
            r#"{ "top_n": 3, "default_metric": "vaccination_rate", "correlation_metrics": ["total_cases", "median_age"] }"#,
        )
        .unwrap();

        let cfg = DashboardConfig::from_file(&path).unwrap();
        assert_eq!(cfg.top_n, 3);
        assert_eq!(cfg.default_metric, Metric::VaccinationRate);
        assert_eq!(cfg.correlation_metrics, vec![Metric::TotalCases, Metric::MedianAge]);
        assert_eq!(cfg.delta_days, 30);
        assert_eq!(cfg.data_path, PathBuf::from("cleaned_covid_data.csv"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        std::fs::write(&path, r#"{ "topn": 3 }"#).unwrap();
        assert!(DashboardConfig::from_file(&path).is_err());
    }
}
