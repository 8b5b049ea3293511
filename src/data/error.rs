use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the data layer.
///
/// Undefined derived metrics (zero or missing denominators) are not errors:
/// they come back as `None` cells and are skipped by every consumer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DashboardError {
    /// The source file is missing, unreadable or not a pandemic table.
    #[error("data unavailable from {}: {reason}", path.display())]
    DataUnavailable { path: PathBuf, reason: String },

    /// Too few rows for a statistic to be meaningful.
    #[error("insufficient data: need at least {required} rows, got {available}")]
    InsufficientData { required: usize, available: usize },
}

impl DashboardError {
    pub fn data_unavailable(path: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        DashboardError::DataUnavailable {
            path: path.into(),
            reason: format!("{err:#}"),
        }
    }
}
