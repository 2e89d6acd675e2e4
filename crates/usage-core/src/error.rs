use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the usage report crates.
#[derive(Error, Debug)]
pub enum UsageError {
    /// A discovered file vanished before it could be read.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tabular parser rejected the contents of a file.
    #[error("Failed to parse CSV {path}: {source}")]
    CsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A file's columns match none of the known export layouts.
    #[error("Unrecognized schema in {path}: columns [{}]", .columns.join(", "))]
    UnrecognizedSchema { path: PathBuf, columns: Vec<String> },

    /// A cell could not be read as a number.
    #[error("Cannot parse number from {0:?}")]
    NumericCoercion(String),

    /// A derived-column function failed for at least one record.
    #[error("Cannot derive column {column} at row {row}: {reason}")]
    InvalidDerivation {
        column: String,
        row: usize,
        reason: String,
    },

    /// A filter operator token is not one of the supported operators.
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// A filter expression is not of the form `COLUMN:OPERATOR:VALUE`.
    #[error("Invalid filter expression: {0}")]
    InvalidFilter(String),

    /// The input directory does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// A JSON document could not be produced.
    #[error("Failed to serialize JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UsageError {
    /// Map an I/O failure on `path` to [`UsageError::FileNotFound`] or
    /// [`UsageError::FileRead`] depending on its kind.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            UsageError::FileNotFound(path)
        } else {
            UsageError::FileRead { path, source }
        }
    }
}

/// Convenience alias used throughout the usage crates.
pub type Result<T> = std::result::Result<T, UsageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_not_found() {
        let err = UsageError::FileNotFound(PathBuf::from("/data/2023.csv"));
        assert_eq!(err.to_string(), "File not found: /data/2023.csv");
    }

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = UsageError::FileRead {
            path: PathBuf::from("/some/export.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/some/export.csv"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_error_display_unrecognized_schema() {
        let err = UsageError::UnrecognizedSchema {
            path: PathBuf::from("odd.csv"),
            columns: vec!["TYPE".to_string(), "DATE".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unrecognized schema in odd.csv: columns [TYPE, DATE]"
        );
    }

    #[test]
    fn test_error_display_invalid_derivation() {
        let err = UsageError::InvalidDerivation {
            column: "YEAR".to_string(),
            row: 3,
            reason: "DATE is not a date".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot derive column YEAR at row 3: DATE is not a date"
        );
    }

    #[test]
    fn test_error_display_unsupported_operator() {
        let err = UsageError::UnsupportedOperator("between".to_string());
        assert_eq!(err.to_string(), "Unsupported operator: between");
    }

    #[test]
    fn test_error_display_data_path_not_found() {
        let err = UsageError::DataPathNotFound(PathBuf::from("/missing/dir"));
        assert_eq!(err.to_string(), "Data path not found: /missing/dir");
    }

    #[test]
    fn test_from_io_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = UsageError::from_io("vanished.csv", io_err);
        assert!(matches!(err, UsageError::FileNotFound(p) if p == PathBuf::from("vanished.csv")));
    }

    #[test]
    fn test_from_io_other_kind() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = UsageError::from_io("locked.csv", io_err);
        assert!(matches!(err, UsageError::FileRead { .. }));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: UsageError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: UsageError = json_err.into();
        assert!(err.to_string().contains("Failed to serialize JSON"));
    }
}
