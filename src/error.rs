use thiserror::Error;

/// Convenience result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error type returned by loading, configuration and aggregation functions.
///
/// Only contract violations and infrastructure failures end up here. Bad data (sentinel codes,
/// unparsable dates, empty filter results) is represented in-band with
/// [`crate::types::Checked`] and [`crate::processing::Filtered`] instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The configuration file is not valid TOML or does not match [`crate::config::PipelineConfig`].
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Report serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration value is out of range.
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    /// The input does not carry the required columns.
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A name is neither a canonical field identifier nor a localized one.
    #[error("unknown field '{name}'")]
    UnknownField { name: String },

    /// No column-name table exists for the requested language code.
    #[error("unsupported language '{code}'")]
    UnsupportedLanguage { code: String },

    /// A column-name table is not a total bijection for some language.
    #[error("incomplete column table for language '{language}': {message}")]
    IncompleteColumnTable { language: String, message: String },

    /// A timestamp sequence handed to the delta computation is not ascending.
    #[error("timestamps are not sorted: entry {index} is earlier than its predecessor")]
    UnsortedInput { index: usize },

    /// Grouping was requested on a continuous column.
    #[error("column '{column}' cannot be used as a group key")]
    NotGroupable { column: String },

    /// A histogram was requested with zero bins.
    #[error("bin count must be > 0 (got {bins})")]
    InvalidBinCount { bins: usize },
}
