//! Error types for the catalog relay pipeline.
//!
//! Each pipeline stage owns its error enum:
//!
//! - [`CsvError`] - the upload could not be decoded or tokenized
//! - [`SchemaError`] - required columns are missing
//! - [`CoercionError`] - a cell could not be cast to its declared type
//! - [`DispatchError`] - per-shop or per-record failures toward the upstream API
//! - [`ConfigError`] - invalid or missing environment configuration
//! - [`PipelineError`] - request-level failures that abort an upload
//!
//! Request-level errors convert into [`PipelineError`] via `From`, so `?`
//! works across stage boundaries. [`DispatchError`] never aborts a request;
//! it is folded into the failure map instead.

use thiserror::Error;

use crate::table::ColumnType;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors while turning the uploaded bytes into a table.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read the file from disk.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Bytes are not valid text in the detected encoding.
    #[error("Content is not valid {0}")]
    Encoding(&'static str),

    /// No header row.
    #[error("CSV file has no header row")]
    NoHeaders,

    /// The delimited text could not be tokenized.
    #[error("Invalid CSV format: {0}")]
    Malformed(#[from] csv::Error),
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors from the column presence check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Sorted list of required columns absent from the header.
    #[error("Missing columns: {}.", .0.join(", "))]
    MissingColumns(Vec<String>),
}

// =============================================================================
// Coercion Errors
// =============================================================================

/// Errors while casting raw cells to their target types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    /// A cell could not be parsed as the column's type.
    #[error("Column '{column}' (row {row}): cannot convert '{value}' to {expected}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
        expected: ColumnType,
    },

    /// A boolean cell was empty; booleans are never defaulted.
    #[error("Column '{column}' (row {row}): missing {expected} value")]
    MissingValue {
        column: String,
        row: usize,
        expected: ColumnType,
    },

    /// A cell violates a column constraint (e.g. negative price).
    #[error("Column '{column}' (row {row}): {message}")]
    OutOfRange {
        column: String,
        row: usize,
        message: String,
    },

    /// A normalized cell does not have the shape the record expects.
    #[error("Column '{0}' has an unexpected shape after normalization")]
    UnexpectedShape(String),
}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Failures while relaying records to the upstream catalog API.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// `{KEY}_POA` or `{KEY}_API_KEY` is not configured for the shop.
    #[error("Missing credentials for shop '{shop}'")]
    MissingCredentials { shop: String },

    /// The upstream API answered with a non-2xx status.
    #[error("Upstream rejected record with status {status}")]
    UpstreamRejected { status: u16, body: String },

    /// The request never produced a response (connect error, timeout, ...).
    #[error("Upstream request failed: {0}")]
    Transport(String),

    /// The HTTP client for a shop could not be built.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading [`crate::config::Settings`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Request-level errors: any of these aborts the whole upload.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The file could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Required columns are missing.
    #[error("{0}")]
    Schema(#[from] SchemaError),

    /// A cell could not be cast.
    #[error("Type coercion error: {0}")]
    Coercion(#[from] CoercionError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for coercion operations.
pub type CoercionResult<T> = Result<T, CoercionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message() {
        let err = SchemaError::MissingColumns(vec!["ean".into(), "stock".into()]);
        assert_eq!(err.to_string(), "Missing columns: ean, stock.");
    }

    #[test]
    fn test_error_conversion_chain() {
        let pipeline_err: PipelineError = CsvError::NoHeaders.into();
        assert!(matches!(pipeline_err, PipelineError::Csv(CsvError::NoHeaders)));

        let schema_err = SchemaError::MissingColumns(vec!["shop".into()]);
        let pipeline_err: PipelineError = schema_err.into();
        assert_eq!(pipeline_err.to_string(), "Missing columns: shop.");
    }

    #[test]
    fn test_coercion_error_names_column_and_value() {
        let err = CoercionError::InvalidValue {
            column: "priceGross".into(),
            row: 3,
            value: "abc".into(),
            expected: ColumnType::Decimal,
        };
        let msg = err.to_string();
        assert!(msg.contains("priceGross"));
        assert!(msg.contains("'abc'"));
        assert!(msg.contains("decimal"));
    }
}
