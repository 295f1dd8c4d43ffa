use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Float32Type, Float64Type, Int32Type, Int64Type, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType,
};
use calamine::{open_workbook_auto, Data, Reader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::DataError;
use super::model::{CellValue, OrderRecord, RawTable, SupplierRecord};
use super::normalize::{
    normalize_code, normalize_name, normalize_tax_id, parse_date, parse_date_str,
    split_categories,
};
use crate::config::ColumnMapping;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load and normalize the supplier registry.
pub fn load_suppliers(path: &Path, columns: &ColumnMapping) -> Result<Vec<SupplierRecord>> {
    let table = read_table(path).with_context(|| format!("loading {}", path.display()))?;
    suppliers_from_table(&table, columns)
}

/// Load and normalize the purchase-order history.
pub fn load_orders(path: &Path, columns: &ColumnMapping) -> Result<Vec<OrderRecord>> {
    let table = read_table(path).with_context(|| format!("loading {}", path.display()))?;
    orders_from_table(&table, columns)
}

/// Read a tabular file into raw cells.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row; `,` or `;` delimited (sniffed from the header)
/// * `.xlsx` / `.xls` / `.ods` – first worksheet, header in the first row
/// * `.parquet` – any flat schema written by Pandas or Polars
/// * `.json`    – `[{ "FORN_CNPJ": "...", ... }, ...]` (records-oriented)
pub fn read_table(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => read_parquet(path),
        "json" => read_json(path),
        "csv" | "txt" => read_csv(path),
        "xlsx" | "xlsm" | "xls" | "ods" => read_spreadsheet(path),
        other => Err(DataError::UnsupportedExtension(other.to_string()).into()),
    }
}

// ---------------------------------------------------------------------------
// Raw table → records
// ---------------------------------------------------------------------------

/// Map registry rows to [`SupplierRecord`]s. Rows whose tax ID has no digits
/// are dropped with a warning.
pub fn suppliers_from_table(table: &RawTable, columns: &ColumnMapping) -> Result<Vec<SupplierRecord>> {
    let tax_idx = table
        .column_index(&columns.tax_id)
        .ok_or_else(|| DataError::MissingColumn {
            table: "supplier registry",
            column: columns.tax_id.clone(),
        })?;
    let legal_idx = table.column_index(&columns.legal_name);
    let trade_idx = table.column_index(&columns.trade_name);
    let state_idx = table.column_index(&columns.state);
    let reg_idx = table.column_index(&columns.registered_on);
    let cat_idx = table.column_index(&columns.categories);

    let mut suppliers = Vec::with_capacity(table.rows.len());
    let mut seen = HashSet::new();

    for row in 0..table.rows.len() {
        let Some(tax_id) = normalize_tax_id(table.cell(row, Some(tax_idx))) else {
            log::warn!("supplier row {row}: no digits in tax ID, skipping");
            continue;
        };
        if !seen.insert(tax_id.clone()) {
            log::warn!("supplier row {row}: duplicate tax ID {tax_id}");
        }

        suppliers.push(SupplierRecord {
            tax_id,
            legal_name: normalize_name(table.cell(row, legal_idx)),
            trade_name: normalize_name(table.cell(row, trade_idx)),
            state: table
                .cell(row, state_idx)
                .as_text()
                .map(|s| normalize_code(&s))
                .unwrap_or_default(),
            registered_on: parse_date(table.cell(row, reg_idx)),
            categories: table
                .cell(row, cat_idx)
                .as_text()
                .map(|s| split_categories(&s))
                .unwrap_or_default(),
        });
    }

    Ok(suppliers)
}

/// Map order rows to [`OrderRecord`]s. Rows without a usable supplier key are
/// dropped; unparseable dates are kept as `None`.
pub fn orders_from_table(table: &RawTable, columns: &ColumnMapping) -> Result<Vec<OrderRecord>> {
    let missing = |column: &String| DataError::MissingColumn {
        table: "order history",
        column: column.clone(),
    };
    let key_idx = table
        .column_index(&columns.order_supplier)
        .ok_or_else(|| missing(&columns.order_supplier))?;
    let date_idx = table
        .column_index(&columns.order_date)
        .ok_or_else(|| missing(&columns.order_date))?;

    let mut dropped = 0usize;
    let orders: Vec<OrderRecord> = (0..table.rows.len())
        .filter_map(|row| {
            let key = normalize_tax_id(table.cell(row, Some(key_idx)));
            if key.is_none() {
                dropped += 1;
            }
            Some(OrderRecord {
                supplier_tax_id: key?,
                ordered_on: parse_date(table.cell(row, Some(date_idx))),
            })
        })
        .collect();

    if dropped > 0 {
        log::warn!("{dropped} order rows without a supplier tax ID were skipped");
    }
    Ok(orders)
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

/// Every CSV cell is read as text (tax IDs keep their leading zeros); empty
/// cells become `Null`.
fn read_csv(path: &Path) -> Result<RawTable> {
    let delimiter = sniff_delimiter(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(
            record
                .iter()
                .map(|v| {
                    if v.trim().is_empty() {
                        CellValue::Null
                    } else {
                        CellValue::Text(v.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(RawTable { headers, rows })
}

/// Spreadsheet exports in pt-BR locales use `;`. Pick whichever separator the
/// header line uses more.
fn sniff_delimiter(path: &Path) -> Result<u8> {
    let file = File::open(path).context("opening CSV")?;
    let mut first_line = String::new();
    BufReader::new(file)
        .read_line(&mut first_line)
        .context("reading CSV header line")?;
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    Ok(if semicolons > commas { b';' } else { b',' })
}

// ---------------------------------------------------------------------------
// Spreadsheet reader
// ---------------------------------------------------------------------------

/// First worksheet of an Excel/ODS workbook. The first row is the header;
/// date-formatted cells arrive as `CellValue::Date`.
fn read_spreadsheet(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path).context("opening spreadsheet")?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DataError::EmptyWorkbook)?
        .context("reading first worksheet")?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|header| header.iter().map(|c| c.to_string().trim().to_string()).collect())
        .unwrap_or_default();
    let rows = rows
        .map(|row| row.iter().map(spreadsheet_to_cell).collect())
        .collect();

    Ok(RawTable { headers, rows })
}

fn spreadsheet_to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) | Data::DurationIso(_) => CellValue::Null,
        Data::String(s) if s.trim().is_empty() => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => date_cell(dt.as_datetime().map(|dt| dt.date())),
        Data::DateTimeIso(s) => date_cell(parse_date_str(s)),
    }
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`). The header is the
/// union of keys in first-seen order.
fn read_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;
    let records = root.as_array().ok_or(DataError::NotJsonRecords)?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec.as_object().ok_or(DataError::NotJsonObject(i))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_to_cell).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    Ok(RawTable { headers, rows })
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Flat Parquet file, one cell per column. Works with files written by both
/// **Pandas** (`df.to_parquet()`) and **Polars** (`df.write_parquet()`).
fn read_parquet(path: &Path) -> Result<RawTable> {
    let file = File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            rows.push(
                batch
                    .columns()
                    .iter()
                    .map(|col| extract_cell(col, row))
                    .collect(),
            );
        }
    }

    Ok(RawTable { headers, rows })
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    match col.data_type() {
        DataType::Utf8 => CellValue::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => CellValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => CellValue::Float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => CellValue::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        DataType::Date32 => date_cell(col.as_primitive::<Date32Type>().value_as_date(row)),
        DataType::Date64 => date_cell(col.as_primitive::<Date64Type>().value_as_date(row)),
        DataType::Timestamp(unit, _) => {
            let dt = match unit {
                TimeUnit::Second => col.as_primitive::<TimestampSecondType>().value_as_datetime(row),
                TimeUnit::Millisecond => col
                    .as_primitive::<TimestampMillisecondType>()
                    .value_as_datetime(row),
                TimeUnit::Microsecond => col
                    .as_primitive::<TimestampMicrosecondType>()
                    .value_as_datetime(row),
                TimeUnit::Nanosecond => col
                    .as_primitive::<TimestampNanosecondType>()
                    .value_as_datetime(row),
            };
            date_cell(dt.map(|dt| dt.date()))
        }
        other => {
            log::debug!("unsupported parquet column type {other:?}, reading as null");
            CellValue::Null
        }
    }
}

fn date_cell(date: Option<chrono::NaiveDate>) -> CellValue {
    date.map(CellValue::Date).unwrap_or(CellValue::Null)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use arrow::array::{Date32Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use chrono::NaiveDate;
    use parquet::arrow::ArrowWriter;

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("supplier_panel_loader_{name}"))
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn csv_registry_with_semicolons() {
        let path = temp_path("forn.csv");
        std::fs::write(
            &path,
            "FORN_CNPJ;FORN_RAZAO;FORN_FANTASIA;FORN_UF;FORN_DTCADASTRO;CATEGORIAS\n\
             12.345.678/0001-95;ACME LTDA;Acme; sp ;05/03/2024;limpeza, ti\n\
             191;Banco;;RJ;data ruim;\n\
             ---;Sem CNPJ;;MG;2024-01-01;TI\n",
        )
        .unwrap();

        let suppliers = load_suppliers(&path, &ColumnMapping::default()).unwrap();
        assert_eq!(suppliers.len(), 2);

        let acme = &suppliers[0];
        assert_eq!(acme.tax_id, "12345678000195");
        assert_eq!(acme.state, "SP");
        assert_eq!(acme.registered_on, Some(ymd(2024, 3, 5)));
        assert_eq!(acme.categories, vec!["LIMPEZA", "TI"]);

        let banco = &suppliers[1];
        assert_eq!(banco.tax_id, "00000000000191");
        assert_eq!(banco.trade_name, "");
        assert_eq!(banco.registered_on, None);
        assert!(banco.categories.is_empty());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn csv_with_quoted_comma_categories() {
        let path = temp_path("forn_comma.csv");
        std::fs::write(
            &path,
            "FORN_CNPJ,FORN_UF,CATEGORIAS\n\"00000000000191\",PR,\"Obras, Elétrica\"\n",
        )
        .unwrap();

        let suppliers = load_suppliers(&path, &ColumnMapping::default()).unwrap();
        assert_eq!(suppliers[0].categories, vec!["OBRAS", "ELÉTRICA"]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn json_orders_with_numeric_keys() {
        let path = temp_path("ped.json");
        std::fs::write(
            &path,
            r#"[
                {"PED_FORNECEDOR": 191, "PED_DT": "2024-05-01"},
                {"PED_FORNECEDOR": "00.000.000/0001-91", "PED_DT": null},
                {"PED_FORNECEDOR": null, "PED_DT": "2024-05-02"}
            ]"#,
        )
        .unwrap();

        let orders = load_orders(&path, &ColumnMapping::default()).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].supplier_tax_id, "00000000000191");
        assert_eq!(orders[0].ordered_on, Some(ymd(2024, 5, 1)));
        assert_eq!(orders[1].supplier_tax_id, "00000000000191");
        assert_eq!(orders[1].ordered_on, None);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn parquet_orders_with_native_dates() {
        let path = temp_path("ped.parquet");
        let schema = Arc::new(Schema::new(vec![
            Field::new("PED_FORNECEDOR", DataType::Int64, true),
            Field::new("PED_DT", DataType::Date32, true),
            Field::new("OBS", DataType::Utf8, true),
        ]));
        let epoch = ymd(1970, 1, 1);
        let days = (ymd(2024, 5, 1) - epoch).num_days() as i32;
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![Some(191), Some(12_345_678_000_195)])),
                Arc::new(Date32Array::from(vec![Some(days), None])),
                Arc::new(StringArray::from(vec![Some("x"), None])),
            ],
        )
        .unwrap();
        let file = File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let orders = load_orders(&path, &ColumnMapping::default()).unwrap();
        assert_eq!(
            orders,
            vec![
                OrderRecord {
                    supplier_tax_id: "00000000000191".into(),
                    ordered_on: Some(ymd(2024, 5, 1)),
                },
                OrderRecord {
                    supplier_tax_id: "12345678000195".into(),
                    ordered_on: None,
                },
            ]
        );

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let table = RawTable {
            headers: vec!["PED_FORNECEDOR".into()],
            rows: vec![vec![CellValue::Text("191".into())]],
        };
        let err = orders_from_table(&table, &ColumnMapping::default()).unwrap_err();
        assert!(err.to_string().contains("PED_DT"));
    }

    #[test]
    fn optional_columns_may_be_absent() {
        let table = RawTable {
            headers: vec!["FORN_CNPJ".into()],
            rows: vec![vec![CellValue::Text("191".into())]],
        };
        let suppliers = suppliers_from_table(&table, &ColumnMapping::default()).unwrap();
        assert_eq!(suppliers.len(), 1);
        assert_eq!(suppliers[0].state, "");
        assert_eq!(suppliers[0].registered_on, None);
    }

    #[test]
    fn xlsx_registry_with_numeric_keys_and_date_cells() {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let path = temp_path("forn.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let headers = ["FORN_CNPJ", "FORN_RAZAO", "FORN_UF", "FORN_DTCADASTRO", "CATEGORIAS"];
        for (c, h) in headers.iter().enumerate() {
            sheet.write_string(0, c as u16, *h).unwrap();
        }
        let date_format = Format::new().set_num_format("dd/mm/yyyy");
        let registered = ExcelDateTime::from_ymd(2024, 3, 5).unwrap();
        sheet.write_number(1, 0, 4_252_011_000_110.0).unwrap();
        sheet.write_string(1, 1, "ACME LTDA").unwrap();
        sheet.write_string(1, 2, "sp").unwrap();
        sheet
            .write_datetime_with_format(1, 3, &registered, &date_format)
            .unwrap();
        sheet.write_string(1, 4, "TI, Obras").unwrap();
        sheet.write_string(2, 0, "12.345.678/0001-95").unwrap();
        sheet.write_string(2, 3, "10/01/2023").unwrap();
        workbook.save(&path).unwrap();

        let suppliers = load_suppliers(&path, &ColumnMapping::default()).unwrap();
        assert_eq!(suppliers.len(), 2);
        assert_eq!(suppliers[0].tax_id, "04252011000110");
        assert_eq!(suppliers[0].state, "SP");
        assert_eq!(suppliers[0].registered_on, Some(ymd(2024, 3, 5)));
        assert_eq!(suppliers[0].categories, vec!["TI", "OBRAS"]);
        assert_eq!(suppliers[1].tax_id, "12345678000195");
        assert_eq!(suppliers[1].registered_on, Some(ymd(2023, 1, 10)));
        assert_eq!(suppliers[1].legal_name, "");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn unsupported_extension() {
        let err = read_table(Path::new("fornecedores.docx")).unwrap_err();
        assert!(err.to_string().contains("docx"));
    }
}
