use std::cmp::Reverse;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use rust_xlsxwriter::{Format, Workbook};

use super::error::DataError;
use super::model::{SupplierDataset, SupplierRow};
use super::normalize::{format_date, format_tax_id};

/// Suggested file name for the export dialog.
pub const DEFAULT_EXPORT_NAME: &str = "fornecedores_filtrados.xlsx";

/// Worksheet name of the `.xlsx` export.
pub const EXPORT_SHEET_NAME: &str = "Fornecedores";

/// Column headers of the detail table, in display order.
pub const TABLE_COLUMNS: [&str; 8] = [
    "CNPJ",
    "Razão Social",
    "Nome Fantasia",
    "UF",
    "Categorias",
    "Data de Cadastro",
    "Último Pedido",
    "Dias sem Pedido",
];

/// Indices of the view sorted like the detail table: most recent
/// registration first, undated suppliers last.
pub fn table_order(dataset: &SupplierDataset, indices: &[usize]) -> Vec<usize> {
    let mut sorted = indices.to_vec();
    sorted.sort_by_key(|&i| {
        let reg: Option<NaiveDate> = dataset.rows.get(i).and_then(|r| r.supplier.registered_on);
        (reg.is_none(), Reverse(reg))
    });
    sorted
}

/// One detail-table row as display strings, aligned with [`TABLE_COLUMNS`].
pub fn table_cells(row: &SupplierRow, today: NaiveDate) -> [String; 8] {
    let sup = &row.supplier;
    [
        format_tax_id(&sup.tax_id),
        sup.legal_name.clone(),
        sup.trade_name.clone(),
        sup.state.clone(),
        sup.categories.join(", "),
        format_date(sup.registered_on),
        format_date(row.last_order),
        row.days_since_last_order(today)
            .map(|d| d.to_string())
            .unwrap_or_default(),
    ]
}

/// Write the filtered table to `path`.  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx`    – one `Fornecedores` sheet, bold header, day counts as numbers
/// * `.csv`     – UTF-8, comma separated, header row
/// * `.parquet` – every column as UTF-8 text
///
/// Returns the number of data rows written.
pub fn export_table(
    path: &Path,
    dataset: &SupplierDataset,
    indices: &[usize],
    today: NaiveDate,
) -> Result<usize> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let rows: Vec<[String; 8]> = table_order(dataset, indices)
        .into_iter()
        .filter_map(|i| dataset.rows.get(i))
        .map(|r| table_cells(r, today))
        .collect();

    let written = match ext.as_str() {
        "xlsx" => write_xlsx(path, &rows),
        "csv" => write_csv(path, &rows),
        "parquet" | "pq" => write_parquet(path, &rows),
        other => Err(DataError::UnsupportedExtension(other.to_string()).into()),
    };
    written.with_context(|| format!("exporting to {}", path.display()))?;

    log::info!("exported {} suppliers to {}", rows.len(), path.display());
    Ok(rows.len())
}

fn write_xlsx(path: &Path, rows: &[[String; 8]]) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(EXPORT_SHEET_NAME)?;

    let header = Format::new().set_bold();
    for (col, name) in TABLE_COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }

    for (r, row) in rows.iter().enumerate() {
        let r = r as u32 + 1;
        for (col, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            match value.parse::<i64>() {
                Ok(days) if col == TABLE_COLUMNS.len() - 1 => {
                    sheet.write_number(r, col as u16, days as f64)?
                }
                _ => sheet.write_string(r, col as u16, value)?,
            };
        }
    }

    workbook.save(path).context("saving workbook")?;
    Ok(())
}

fn write_csv(path: &Path, rows: &[[String; 8]]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    writer.write_record(TABLE_COLUMNS).context("writing CSV header")?;
    for row in rows {
        writer.write_record(row).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV file")?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[[String; 8]]) -> Result<()> {
    let schema = Arc::new(Schema::new(
        TABLE_COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Utf8, false))
            .collect::<Vec<_>>(),
    ));

    let columns: Vec<ArrayRef> = (0..TABLE_COLUMNS.len())
        .map(|c| {
            Arc::new(StringArray::from(
                rows.iter().map(|r| r[c].as_str()).collect::<Vec<_>>(),
            )) as ArrayRef
        })
        .collect();

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    let file = File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}
