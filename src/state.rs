use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pandemic_dashboard::data::cache::DatasetCache;
use pandemic_dashboard::data::model::Table;
use pandemic_dashboard::data::pipeline::{self, DashboardParams, DashboardView};
use pandemic_dashboard::DashboardConfig;

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Which chart fills the central panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Trends,
    GlobalView,
    Vaccination,
    Distribution,
    Correlation,
    Rankings,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Trends,
        Tab::GlobalView,
        Tab::Vaccination,
        Tab::Distribution,
        Tab::Correlation,
        Tab::Rankings,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Trends => "Trends",
            Tab::GlobalView => "Global View",
            Tab::Vaccination => "Cases vs Vaccinations",
            Tab::Distribution => "Distribution",
            Tab::Correlation => "Correlation",
            Tab::Rankings => "Rankings",
        }
    }
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,
    pub cache: DatasetCache,
    /// Path of the table currently shown.
    pub source: Option<PathBuf>,
    /// Loaded table (None until a file loads successfully).
    pub table: Option<Arc<Table>>,

    /// Current control values.
    pub params: Option<DashboardParams>,
    /// Result of the last pipeline pass.
    pub view: DashboardView,

    pub tab: Tab,
    pub log_scale: bool,

    /// Entity colours, stable across filter changes.
    pub entity_colors: Option<ColorMap>,
    /// Region colours for the scatter and box plots.
    pub region_colors: Option<ColorMap>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            cache: DatasetCache::new(),
            source: None,
            table: None,
            params: None,
            view: DashboardView::default(),
            tab: Tab::Trends,
            log_scale: false,
            entity_colors: None,
            region_colors: None,
            status_message: None,
        }
    }

    /// Load (or fetch from cache) the table at `path` and reset controls.
    pub fn open(&mut self, path: &Path) {
        match self.cache.get_or_load(path) {
            Ok(table) => {
                self.source = Some(path.to_path_buf());
                self.set_table(table);
            }
            Err(e) => {
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Drop the cache and re-read the current file, keeping the controls
    /// when the new table still covers them.
    pub fn reload(&mut self) {
        let Some(path) = self.source.clone() else {
            return;
        };
        self.cache.invalidate();
        let previous = self.params.clone();
        self.open(&path);
        if let (Some(prev), Some(table)) = (previous, &self.table) {
            if table.date_range().is_some() {
                self.params = Some(prev);
                self.refresh();
            }
        }
    }

    /// Ingest a newly loaded table, initialise controls and colours.
    pub fn set_table(&mut self, table: Arc<Table>) {
        self.params = DashboardParams::defaults_for(&table, &self.config);
        self.entity_colors = Some(ColorMap::new(&table.entities()));
        self.region_colors = Some(ColorMap::new(&table.region_groups()));
        self.status_message = if self.params.is_none() {
            Some("The dataset has no rows.".to_string())
        } else {
            None
        };
        self.table = Some(table);
        self.refresh();
    }

    /// Recompute every chart input from the current controls.
    pub fn refresh(&mut self) {
        if let (Some(table), Some(params)) = (&self.table, &self.params) {
            self.view = pipeline::run(table, params);
        }
    }

    /// Toggle a single entity in the selection.
    pub fn toggle_entity(&mut self, entity: &str) {
        if let Some(params) = &mut self.params {
            if !params.entities.remove(entity) {
                params.entities.insert(entity.to_string());
            }
        }
        self.refresh();
    }

    /// Select every entity of the current region (or all).
    pub fn select_all(&mut self) {
        if let (Some(table), Some(params)) = (&self.table, &mut self.params) {
            params.entities = table
                .iter()
                .filter(|r| {
                    params.region_group.is_none() || r.region_group == params.region_group
                })
                .map(|r| r.entity.clone())
                .collect::<BTreeSet<_>>();
        }
        self.refresh();
    }

    /// Clear the selection; the pipeline falls back to the top-N.
    pub fn select_none(&mut self) {
        if let Some(params) = &mut self.params {
            params.entities.clear();
        }
        self.refresh();
    }
}
