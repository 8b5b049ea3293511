use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};

use super::model::{Record, Table};

// ---------------------------------------------------------------------------
// Filter predicate: date window, region group, entity selection
// ---------------------------------------------------------------------------

/// The row predicate driven by the side-panel controls.
///
/// * `date_from..=date_to` is inclusive on both ends; an inverted range
///   matches nothing.
/// * `region_group == None` → no region constraint.
/// * `entities == None` or an empty set → no entity constraint. Callers that
///   want a default selection (e.g. the top-N) must supply it themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub region_group: Option<String>,
    pub entities: Option<BTreeSet<String>>,
}

impl FilterSpec {
    /// Date window only.
    pub fn window(date_from: NaiveDate, date_to: NaiveDate) -> Self {
        FilterSpec {
            date_from,
            date_to,
            region_group: None,
            entities: None,
        }
    }

    pub fn with_region_group(mut self, region_group: Option<String>) -> Self {
        self.region_group = region_group;
        self
    }

    pub fn with_entities<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities = Some(entities.into_iter().map(Into::into).collect());
        self
    }

    /// The comparison window ending `days` earlier (both bounds shift).
    pub fn shifted(&self, days: u64) -> Self {
        let back = |d: NaiveDate| d.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
        FilterSpec {
            date_from: back(self.date_from),
            date_to: back(self.date_to),
            ..self.clone()
        }
    }

    /// Whether a record satisfies every active predicate.
    pub fn matches(&self, record: &Record) -> bool {
        if record.date < self.date_from || record.date > self.date_to {
            return false;
        }
        if let Some(group) = &self.region_group {
            if record.region_group.as_deref() != Some(group.as_str()) {
                return false;
            }
        }
        match &self.entities {
            Some(selected) if !selected.is_empty() => selected.contains(&record.entity),
            _ => true,
        }
    }
}

/// Return indices of rows that pass the filter, in table order.
pub fn filtered_indices(table: &Table, spec: &FilterSpec) -> Vec<usize> {
    table
        .iter()
        .enumerate()
        .filter(|(_, r)| spec.matches(r))
        .map(|(i, _)| i)
        .collect()
}

/// Build the sub-table of rows that pass the filter. Row order is preserved.
pub fn filter(table: &Table, spec: &FilterSpec) -> Table {
    if spec.date_from > spec.date_to {
        return Table::default();
    }
    table.iter().filter(|r| spec.matches(r)).cloned().collect()
}
