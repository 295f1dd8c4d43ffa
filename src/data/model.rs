use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chrono::NaiveDate;

// ---------------------------------------------------------------------------
// CellValue – a single raw cell read from a source file
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a spreadsheet export carries.
/// Kept raw until the normalizer turns it into keys, codes and dates.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Native date column (Parquet `Date32`/`Date64`/`Timestamp`).
    Date(NaiveDate),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    /// Text content of the cell, `None` for nulls and blank strings.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Text(s) if s.trim().is_empty() => None,
            other => Some(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// RawTable – header + rows, before normalization
// ---------------------------------------------------------------------------

/// A loaded source file: header names and rows of raw cells in header order.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Position of a column by trimmed header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Cell at `(row, col)`, or `Null` when the row is short.
    pub fn cell(&self, row: usize, col: Option<usize>) -> &CellValue {
        const NULL: &CellValue = &CellValue::Null;
        col.and_then(|c| self.rows.get(row).and_then(|r| r.get(c)))
            .unwrap_or(NULL)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One row of the supplier registry, normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplierRecord {
    /// 14-digit zero-padded CNPJ.
    pub tax_id: String,
    pub legal_name: String,
    pub trade_name: String,
    /// Upper-cased UF code, empty when missing.
    pub state: String,
    pub registered_on: Option<NaiveDate>,
    /// Upper-cased, deduplicated category tags.
    pub categories: Vec<String>,
}

impl SupplierRecord {
    /// Name shown in charts: trade name, then legal name, then formatted CNPJ.
    pub fn display_name(&self) -> String {
        if !self.trade_name.is_empty() {
            self.trade_name.clone()
        } else if !self.legal_name.is_empty() {
            self.legal_name.clone()
        } else {
            super::normalize::format_tax_id(&self.tax_id)
        }
    }
}

/// One purchase order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub supplier_tax_id: String,
    pub ordered_on: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// SupplierRow / SupplierDataset – the joined view
// ---------------------------------------------------------------------------

/// A supplier joined with its last order date.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplierRow {
    pub supplier: SupplierRecord,
    /// Max order date over the whole (unfiltered) order history.
    pub last_order: Option<NaiveDate>,
}

impl SupplierRow {
    /// Whole days between the last order and `today`; `None` without orders.
    pub fn days_since_last_order(&self, today: NaiveDate) -> Option<i64> {
        self.last_order.map(|d| (today - d).num_days())
    }

    /// Whether the last order falls on or after `since`.
    pub fn ordered_since(&self, since: NaiveDate) -> bool {
        self.last_order.is_some_and(|d| d >= since)
    }
}

/// The joined dataset with pre-computed filter indices.
#[derive(Debug, Clone, Default)]
pub struct SupplierDataset {
    /// Registry rows joined with last order (registry order preserved).
    pub rows: Vec<SupplierRow>,
    /// Full, unfiltered order history (dates already normalized).
    pub orders: Vec<OrderRecord>,
    /// Sorted unique UF codes.
    pub states: BTreeSet<String>,
    /// Sorted unique category tags.
    pub categories: BTreeSet<String>,
    /// Earliest and latest registration dates, if any are known.
    pub registration_bounds: Option<(NaiveDate, NaiveDate)>,
    /// Row positions by tax ID (first occurrence wins on duplicates).
    pub index_by_tax_id: HashMap<String, usize>,
}

impl SupplierDataset {
    /// Build filter indices from the joined rows.
    pub fn from_rows(rows: Vec<SupplierRow>, orders: Vec<OrderRecord>) -> Self {
        let mut states = BTreeSet::new();
        let mut categories = BTreeSet::new();
        let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
        let mut index_by_tax_id = HashMap::with_capacity(rows.len());

        for (i, row) in rows.iter().enumerate() {
            let sup = &row.supplier;
            if !sup.state.is_empty() {
                states.insert(sup.state.clone());
            }
            categories.extend(sup.categories.iter().cloned());
            if let Some(d) = sup.registered_on {
                bounds = Some(match bounds {
                    Some((lo, hi)) => (lo.min(d), hi.max(d)),
                    None => (d, d),
                });
            }
            index_by_tax_id.entry(sup.tax_id.clone()).or_insert(i);
        }

        SupplierDataset {
            rows,
            orders,
            states,
            categories,
            registration_bounds: bounds,
            index_by_tax_id,
        }
    }

    /// Number of supplier rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
