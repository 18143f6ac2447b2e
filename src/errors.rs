use thiserror::Error;

/// Fatal ingestion-class failures: nothing downstream may proceed on a
/// workbook we could not meaningfully read.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read workbook '{path}': {message}")]
    Unreadable { path: String, message: String },
    #[error("workbook has no sheets")]
    NoSheets,
    #[error("workbook has no non-blank sheet")]
    AllSheetsBlank,
}
