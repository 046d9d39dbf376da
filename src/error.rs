// src/error.rs

use thiserror::Error;

/// Failures raised inside the processing core.
///
/// The fail-soft entry points on [`crate::process::BondDataProcessor`] log these
/// and hand back an empty or error-shaped value; the `try_*` variants return
/// them directly so callers can tell "empty but valid" from "failed".
#[derive(Debug, Error)]
pub enum ProcessError {
    /// A yield pattern matched but its numeral could not be parsed.
    #[error("extraction failed for {tenor}: could not parse {raw:?} as a yield")]
    Extraction { tenor: &'static str, raw: String },

    /// The raw result did not have the shape the normalizer expects.
    #[error("normalization failed: {0}")]
    Normalization(String),

    /// Trend analysis was requested before any rows were processed.
    #[error("No data available for analysis")]
    NoData,

    /// Statistics could not be computed over the current table.
    #[error("analysis failed: {0}")]
    Analysis(String),

    /// Export was requested for an empty table.
    #[error("nothing to export: table is empty")]
    EmptyExport,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

pub type Result<T, E = ProcessError> = std::result::Result<T, E>;
