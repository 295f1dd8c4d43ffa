use thiserror::Error;

/// Structural problems with a source or target file.
///
/// Cell-level problems (bad dates, malformed tax IDs) are never errors; the
/// normalizer coerces them to null instead.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("required column '{column}' not found in {table}")]
    MissingColumn { table: &'static str, column: String },

    #[error("expected a top-level JSON array of records")]
    NotJsonRecords,

    #[error("workbook has no worksheet")]
    EmptyWorkbook,

    #[error("row {0} is not a JSON object")]
    NotJsonObject(usize),
}
