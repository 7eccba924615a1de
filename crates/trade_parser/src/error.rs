use thiserror::Error;

/// Fatal, structural parse failures. Row-level anomalies never surface
/// here: those degrade to defaults and get logged instead, because one bad
/// row must not abort a multi-thousand-row import.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unsupported file format '.{0}': please use CSV, XLSX, or XLS")]
    UnsupportedFormat(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel parsing error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("workbook contains no sheets")]
    EmptyWorkbook,
}
