use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDate;

use crate::color::ColorMap;
use crate::config::{ColumnMapping, PanelConfig};
use crate::data::export::{export_table, table_order};
use crate::data::filter::{filtered_indices, FilterState};
use crate::data::join::join;
use crate::data::loader::{load_orders, load_suppliers};
use crate::data::metrics::{compute, PanelMetrics};
use crate::data::model::{OrderRecord, SupplierDataset, SupplierRecord};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    /// Registry as loaded (kept so a new order file can be re-joined).
    pub suppliers: Vec<SupplierRecord>,
    /// Order history as loaded.
    pub orders: Vec<OrderRecord>,
    pub suppliers_path: Option<PathBuf>,
    pub orders_path: Option<PathBuf>,

    /// Joined dataset (None until a registry is loaded).
    pub dataset: Option<SupplierDataset>,

    /// Current filter selections.
    pub filters: FilterState,

    /// Indices of rows passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// `visible_indices` in detail-table order (cached).
    pub table_rows: Vec<usize>,

    /// Metrics over `visible_indices` (cached).
    pub metrics: PanelMetrics,

    /// Bar colours of the geographic and category charts.
    pub state_colors: ColorMap,
    pub category_colors: ColorMap,

    pub columns: ColumnMapping,
    /// Reference date for every windowed metric.
    pub today: NaiveDate,

    /// Which central view is shown.
    pub view: PanelView,

    /// Error message shown in the top bar.
    pub status_message: Option<String>,
    /// Confirmation shown in the top bar (e.g. after an export).
    pub info_message: Option<String>,
}

/// Central panel tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PanelView {
    #[default]
    Table,
    Charts,
}

impl AppState {
    /// Build from startup config, loading any files it names.
    pub fn from_config(config: &PanelConfig) -> Self {
        let mut state = Self {
            columns: config.columns.clone(),
            today: config.today(),
            ..Default::default()
        };
        if let Some(path) = &config.suppliers_file {
            state.open_suppliers(path);
        }
        if let Some(path) = &config.orders_file {
            state.open_orders(path);
        }
        state
    }

    /// Load the supplier registry; on failure the previous data stays.
    pub fn open_suppliers(&mut self, path: &Path) {
        match load_suppliers(path, &self.columns) {
            Ok(suppliers) => {
                log::info!("Loaded {} suppliers from {}", suppliers.len(), path.display());
                self.suppliers = suppliers;
                self.suppliers_path = Some(path.to_path_buf());
                self.status_message = None;
                self.rebuild();
            }
            Err(e) => self.report_error("Failed to load suppliers", &e),
        }
    }

    /// Load the order history; on failure the previous data stays.
    pub fn open_orders(&mut self, path: &Path) {
        match load_orders(path, &self.columns) {
            Ok(orders) => {
                log::info!("Loaded {} orders from {}", orders.len(), path.display());
                self.orders = orders;
                self.orders_path = Some(path.to_path_buf());
                self.status_message = None;
                self.rebuild();
            }
            Err(e) => self.report_error("Failed to load orders", &e),
        }
    }

    /// Re-join sources. Filters are reset since the selectable values change.
    pub fn rebuild(&mut self) {
        if self.suppliers_path.is_none() {
            return;
        }
        let dataset = join(self.suppliers.clone(), self.orders.clone());
        self.state_colors = ColorMap::new(&dataset.states);
        self.category_colors = ColorMap::new(&dataset.categories);
        self.dataset = Some(dataset);
        self.filters = FilterState::default();
        self.refilter();
    }

    /// Recompute `visible_indices` and metrics after a filter change.
    pub fn refilter(&mut self) {
        if let Some(ds) = &self.dataset {
            self.visible_indices = filtered_indices(ds, &self.filters);
            self.table_rows = table_order(ds, &self.visible_indices);
            self.metrics = compute(ds, &self.visible_indices, self.today);
            log::debug!(
                "filters {:?} → {} of {} suppliers",
                self.filters,
                self.visible_indices.len(),
                ds.len()
            );
        }
    }

    /// Toggle a UF in the state filter.
    pub fn toggle_state(&mut self, state: &str) {
        self.filters.toggle_state(state);
        self.refilter();
    }

    /// Toggle a tag in the category filter.
    pub fn toggle_category(&mut self, category: &str) {
        self.filters.toggle_category(category);
        self.refilter();
    }

    /// Set or clear the registration-date range.
    pub fn set_registration_range(&mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) {
        if self.filters.registered_from == from && self.filters.registered_to == to {
            return;
        }
        self.filters.registered_from = from;
        self.filters.registered_to = to;
        self.refilter();
    }

    /// Drop every filter selection.
    pub fn clear_filters(&mut self) {
        self.filters = FilterState::default();
        self.refilter();
    }

    /// Message shown in place of the table when nothing matches.
    pub fn empty_view_message(&self) -> Option<&'static str> {
        let ds = self.dataset.as_ref()?;
        if ds.is_empty() {
            Some("A planilha de fornecedores não tem linhas.")
        } else if self.visible_indices.is_empty() {
            Some("Nenhum fornecedor corresponde aos filtros selecionados.")
        } else {
            None
        }
    }

    /// Export the filtered table; returns the number of rows written.
    pub fn export(&self, path: &Path) -> Result<usize> {
        let Some(ds) = &self.dataset else {
            anyhow::bail!("nenhuma planilha de fornecedores carregada");
        };
        export_table(path, ds, &self.visible_indices, self.today)
    }

    fn report_error(&mut self, what: &str, e: &anyhow::Error) {
        log::error!("{what}: {e:#}");
        self.status_message = Some(format!("Erro: {e:#}"));
    }
}
