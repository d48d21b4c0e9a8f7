//! Error types for streaming conversion and generation

use std::path::PathBuf;
use thiserror::Error;

/// Error type returned by row sinks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for sheetstream operations
pub type Result<T> = std::result::Result<T, SheetError>;

/// Errors that abort a conversion or generation run
#[derive(Error, Debug)]
pub enum SheetError {
    /// Input file does not exist
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// ZIP container or XML part is structurally invalid or missing
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// The row sink failed while handling a row
    #[error("Error processing row {row}: {source}")]
    RowProcessing {
        /// 1-based row number as supplied by the sheet
        row: u32,
        #[source]
        source: BoxError,
    },

    /// I/O failure on the output side
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid generator or writer configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Coarse classification of [`SheetError`] so callers can branch without
/// inspecting messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    MalformedDocument,
    RowProcessingFailure,
    Io,
    Config,
}

impl SheetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SheetError::NotFound(_) => ErrorKind::NotFound,
            SheetError::MalformedDocument(_) => ErrorKind::MalformedDocument,
            SheetError::RowProcessing { .. } => ErrorKind::RowProcessingFailure,
            SheetError::Io(_) => ErrorKind::Io,
            SheetError::Config(_) => ErrorKind::Config,
        }
    }

    /// Row number attached to a [`SheetError::RowProcessing`] failure
    pub fn row(&self) -> Option<u32> {
        match self {
            SheetError::RowProcessing { row, .. } => Some(*row),
            _ => None,
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        SheetError::MalformedDocument(msg.into())
    }
}

impl From<zip::result::ZipError> for SheetError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => SheetError::Io(e),
            other => SheetError::MalformedDocument(format!("ZIP archive error: {}", other)),
        }
    }
}

impl From<quick_xml::Error> for SheetError {
    fn from(err: quick_xml::Error) -> Self {
        SheetError::MalformedDocument(format!("XML parse error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let err = SheetError::NotFound(PathBuf::from("missing.xlsx"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("missing.xlsx"));

        let err = SheetError::RowProcessing {
            row: 42,
            source: "disk full".into(),
        };
        assert_eq!(err.kind(), ErrorKind::RowProcessingFailure);
        assert_eq!(err.row(), Some(42));
        assert_eq!(err.to_string(), "Error processing row 42: disk full");
    }

    #[test]
    fn test_zip_error_is_malformed() {
        let err: SheetError = zip::result::ZipError::FileNotFound.into();
        assert_eq!(err.kind(), ErrorKind::MalformedDocument);
    }
}
