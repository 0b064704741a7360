use thiserror::Error;

/// Convenience result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error type returned by every stage of the pipeline.
///
/// This is a single error enum shared across ingestion, processing, output and plotting. No stage
/// catches or retries; errors propagate to the caller and abort the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Underlying I/O error (e.g. file not found, permission denied, unwritable output path).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Excel ingestion error.
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// Excel output error.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// CSV ingestion or output error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The configuration file could not be decoded.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Chart rendering failed.
    #[error("plot error: {message}")]
    Plot { message: String },

    /// The input format tag is not one of `xlsx` / `csv`.
    #[error("unsupported file format '{tag}' (expected 'xlsx' or 'csv')")]
    UnsupportedFormat { tag: String },

    /// A referenced column does not exist in the table.
    #[error("column '{column}' not found")]
    ColumnNotFound { column: String },

    /// A filter expression could not be parsed or does not fit the table schema.
    #[error("invalid expression: {message}")]
    InvalidExpression { message: String },

    /// The fill strategy tag is not one of `mean` / `median` / `mode` / `drop`.
    #[error("unsupported fill strategy '{tag}' (expected 'mean', 'median', 'mode' or 'drop')")]
    UnsupportedStrategy { tag: String },

    /// The reduction name in an aggregation specification is unknown.
    #[error("unsupported aggregation '{name}'")]
    UnsupportedAggregation { name: String },

    /// The join kind tag is not one of `inner` / `left` / `right` / `outer`.
    #[error("unsupported join kind '{tag}' (expected 'inner', 'left', 'right' or 'outer')")]
    UnsupportedJoinKind { tag: String },

    /// The input does not conform to the provided schema (missing required columns, etc.).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the required [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// An operation was applied to a column of an incompatible type.
    #[error("type mismatch on column '{column}': {message}")]
    TypeMismatch { column: String, message: String },
}

impl PipelineError {
    pub(crate) fn column_not_found(column: &str) -> Self {
        Self::ColumnNotFound {
            column: column.to_owned(),
        }
    }

    pub(crate) fn type_mismatch(column: &str, message: impl Into<String>) -> Self {
        Self::TypeMismatch {
            column: column.to_owned(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_expression(message: impl Into<String>) -> Self {
        Self::InvalidExpression {
            message: message.into(),
        }
    }
}
