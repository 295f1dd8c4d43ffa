use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Column names of the two source files
// ---------------------------------------------------------------------------

/// Header names expected in the supplier registry and order history.
/// Any subset can be overridden from a JSON file (`--columns`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub tax_id: String,
    pub legal_name: String,
    pub trade_name: String,
    pub state: String,
    pub registered_on: String,
    pub categories: String,
    pub order_supplier: String,
    pub order_date: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            tax_id: "FORN_CNPJ".into(),
            legal_name: "FORN_RAZAO".into(),
            trade_name: "FORN_FANTASIA".into(),
            state: "FORN_UF".into(),
            registered_on: "FORN_DTCADASTRO".into(),
            categories: "CATEGORIAS".into(),
            order_supplier: "PED_FORNECEDOR".into(),
            order_date: "PED_DT".into(),
        }
    }
}

impl ColumnMapping {
    /// Read overrides from a JSON object; missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading column mapping {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing column mapping {}", path.display()))
    }
}

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Supplier activity panel.
#[derive(Parser, Debug, Clone, Default, PartialEq)]
#[command(version, about = "Painel de fornecedores ativos: cadastro + histórico de pedidos")]
pub struct Cli {
    /// Supplier registry (.csv, .xlsx, .xls, .ods, .parquet or .json).
    #[arg(env = "PANEL_SUPPLIERS_FILE")]
    pub suppliers_file: Option<PathBuf>,

    /// Purchase-order history, same formats as the registry.
    #[arg(env = "PANEL_ORDERS_FILE")]
    pub orders_file: Option<PathBuf>,

    /// JSON file overriding any subset of the expected column names.
    #[arg(long, env = "PANEL_COLUMNS")]
    pub columns: Option<PathBuf>,

    /// Reference date (YYYY-MM-DD) for every windowed metric; defaults to today.
    #[arg(long, env = "PANEL_TODAY", value_parser = parse_iso_date)]
    pub today: Option<NaiveDate>,
}

/// `YYYY-MM-DD`, the only form accepted for `--today`.
pub fn parse_iso_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

// ---------------------------------------------------------------------------
// Startup configuration
// ---------------------------------------------------------------------------

/// Everything resolved before the window opens.
#[derive(Debug, Clone, Default)]
pub struct PanelConfig {
    pub suppliers_file: Option<PathBuf>,
    pub orders_file: Option<PathBuf>,
    pub columns: ColumnMapping,
    /// Pinned reference date; `None` means "today" in local time.
    pub today: Option<NaiveDate>,
}

impl PanelConfig {
    /// Parse the process arguments (and `PANEL_*` env vars). Exits with usage
    /// on `--help` or invalid arguments.
    pub fn from_env() -> Self {
        Self::from_cli(Cli::parse())
    }

    /// Load the column mapping the CLI points to. An unreadable mapping falls
    /// back to the default column names.
    pub fn from_cli(cli: Cli) -> Self {
        let columns = match &cli.columns {
            Some(path) => ColumnMapping::from_json_file(path).unwrap_or_else(|e| {
                log::warn!("ignoring column mapping: {e:#}");
                ColumnMapping::default()
            }),
            None => ColumnMapping::default(),
        };

        Self {
            suppliers_file: cli.suppliers_file,
            orders_file: cli.orders_file,
            columns,
            today: cli.today,
        }
    }

    /// Reference date for every windowed metric.
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("supplier-panel").chain(args.iter().copied()))
    }

    #[test]
    fn positional_sources() {
        let cli = parse(&["forn.xlsx", "ped.csv"]).unwrap();
        assert_eq!(cli.suppliers_file, Some(PathBuf::from("forn.xlsx")));
        assert_eq!(cli.orders_file, Some(PathBuf::from("ped.csv")));
    }

    #[test]
    fn flags_are_not_taken_as_paths() {
        let err = parse(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);

        assert!(parse(&["-v", "extra.csv"]).is_err());
        assert!(parse(&["a.csv", "b.csv", "extra.csv"]).is_err());
    }

    #[test]
    fn today_flag_is_validated() {
        let cli = parse(&["--today", "2024-06-30"]).unwrap();
        let cfg = PanelConfig::from_cli(cli);
        assert_eq!(cfg.today(), NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());

        assert!(parse(&["--today", "30/06/2024"]).is_err());
    }

    #[test]
    fn partial_column_mapping_keeps_defaults() {
        let path = std::env::temp_dir().join("supplier_panel_columns_test.json");
        std::fs::write(&path, r#"{ "tax_id": "CNPJ", "order_date": "DATA" }"#).unwrap();

        let cli = parse(&["--columns", path.to_str().unwrap()]).unwrap();
        let cfg = PanelConfig::from_cli(cli);
        assert_eq!(cfg.columns.tax_id, "CNPJ");
        assert_eq!(cfg.columns.order_date, "DATA");
        assert_eq!(cfg.columns.state, "FORN_UF");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn unreadable_column_mapping_falls_back() {
        let cli = Cli {
            columns: Some(PathBuf::from("/nonexistent/columns.json")),
            ..Default::default()
        };
        let cfg = PanelConfig::from_cli(cli);
        assert_eq!(cfg.columns, ColumnMapping::default());
    }
}
