use chrono::{NaiveDate, NaiveDateTime};

use super::model::CellValue;

/// Canonical CNPJ width.
pub const TAX_ID_WIDTH: usize = 14;

// ---------------------------------------------------------------------------
// Tax IDs
// ---------------------------------------------------------------------------

/// Canonicalize a tax ID cell: keep digits only, left-pad with zeros to
/// [`TAX_ID_WIDTH`]. Returns `None` when the cell holds no digits at all.
///
/// Numeric cells are rendered in decimal first, so a CNPJ that a spreadsheet
/// stored as a number gets its leading zeros back.
pub fn normalize_tax_id(cell: &CellValue) -> Option<String> {
    let raw = match cell {
        CellValue::Integer(i) => i.to_string(),
        CellValue::Float(f) if f.is_finite() && f.fract() == 0.0 => format!("{f:.0}"),
        CellValue::Null | CellValue::Bool(_) | CellValue::Date(_) => return None,
        other => other.to_string(),
    };
    normalize_tax_id_str(&raw)
}

/// String form of [`normalize_tax_id`].
pub fn normalize_tax_id_str(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    Some(format!("{digits:0>width$}", width = TAX_ID_WIDTH))
}

/// Render a 14-digit key as `XX.XXX.XXX/XXXX-XX`. Other widths pass through.
pub fn format_tax_id(tax_id: &str) -> String {
    if tax_id.len() != TAX_ID_WIDTH || !tax_id.bytes().all(|b| b.is_ascii_digit()) {
        return tax_id.to_string();
    }
    format!(
        "{}.{}.{}/{}-{}",
        &tax_id[0..2],
        &tax_id[2..5],
        &tax_id[5..8],
        &tax_id[8..12],
        &tax_id[12..14]
    )
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Trim and upper-case (state codes, category tags, filter selections).
pub fn normalize_code(s: &str) -> String {
    s.trim().to_uppercase()
}

/// Trimmed text of a cell, empty for nulls.
pub fn normalize_name(cell: &CellValue) -> String {
    cell.as_text().map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Split a comma-separated category list into normalized, deduplicated tags.
pub fn split_categories(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for token in raw.split(',') {
        let tag = normalize_code(token);
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
];

/// Coerce a cell into a date. Unparseable values become `None`.
pub fn parse_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Date(d) => Some(*d),
        CellValue::Text(s) => parse_date_str(s),
        _ => None,
    }
}

/// String form of [`parse_date`].
pub fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// `DD/MM/YYYY`, the display format of the detail table and export.
pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn tax_id_strips_punctuation_and_pads() {
        assert_eq!(
            normalize_tax_id(&CellValue::Text("12.345.678/0001-95".into())).as_deref(),
            Some("12345678000195")
        );
        assert_eq!(
            normalize_tax_id(&CellValue::Text(" 1234 ".into())).as_deref(),
            Some("00000000001234")
        );
    }

    #[test]
    fn numeric_tax_id_gets_leading_zeros_back() {
        assert_eq!(
            normalize_tax_id(&CellValue::Integer(4_252_011_000_110)).as_deref(),
            Some("04252011000110")
        );
        assert_eq!(
            normalize_tax_id(&CellValue::Float(4_252_011_000_110.0)).as_deref(),
            Some("04252011000110")
        );
    }

    #[test]
    fn tax_id_without_digits_is_dropped() {
        assert_eq!(normalize_tax_id(&CellValue::Text("n/a".into())), None);
        assert_eq!(normalize_tax_id(&CellValue::Null), None);
    }

    #[test]
    fn tax_id_formatting() {
        assert_eq!(format_tax_id("12345678000195"), "12.345.678/0001-95");
        assert_eq!(format_tax_id("123"), "123");
    }

    #[test]
    fn categories_are_trimmed_upper_cased_and_deduplicated() {
        assert_eq!(
            split_categories(" limpeza, Escritório ,,LIMPEZA , ti"),
            vec!["LIMPEZA", "ESCRITÓRIO", "TI"]
        );
        assert!(split_categories("  ").is_empty());
    }

    #[test]
    fn dates_in_supported_forms() {
        assert_eq!(parse_date_str("2024-03-05"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date_str("05/03/2024"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date_str("2024-03-05 13:45:00"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date_str("2024-03-05T13:45:00.250"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date(&CellValue::Date(ymd(2020, 1, 1))), Some(ymd(2020, 1, 1)));
    }

    #[test]
    fn invalid_dates_become_none() {
        assert_eq!(parse_date_str("2024-02-30"), None);
        assert_eq!(parse_date_str("ontem"), None);
        assert_eq!(parse_date(&CellValue::Integer(45000)), None);
        assert_eq!(parse_date(&CellValue::Null), None);
    }

    #[test]
    fn display_date() {
        assert_eq!(format_date(Some(ymd(2024, 3, 5))), "05/03/2024");
        assert_eq!(format_date(None), "");
    }
}
