//! Structured error types shared across the ETL core.

use thiserror::Error;

/// Errors raised by the normalizer, merge engine, and store accessor.
///
/// `MissingColumns` and `KeyIntegrity` are contract errors: they abort the
/// current batch before any store mutation. Everything else is an I/O or
/// engine fault surfaced to the caller.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("missing required columns for {class}: {columns:?}")]
    MissingColumns {
        class: &'static str,
        columns: Vec<String>,
    },

    #[error("key column '{column}' has {nulls} value(s) that do not coerce to its declared type")]
    KeyIntegrity { column: String, nulls: usize },

    #[error("store error: {0}")]
    Store(String),

    #[error("raw read error: {0}")]
    RawRead(String),

    #[error("dataframe operation failed: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
