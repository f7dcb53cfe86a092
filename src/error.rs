//! The [`RbpMapsError`] `enum` definition and error messages.
//!
use std::num::ParseFloatError;
use thiserror::Error;

/// The [`RbpMapsError`] defines the standard set of errors that should
/// be passed to the user.
#[derive(Debug, Error)]
pub enum RbpMapsError {
    // IO related errors
    #[error("File reading error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("TSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    // File parsing related errors
    #[error("Float parsing error: {0}")]
    ParseFloatError(#[from] ParseFloatError),
    #[error("Density matrix file is invalid: {0}")]
    InvalidMatrixFile(String),

    // Matrix construction errors
    #[error("Matrix shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),
    #[error("Matrix has {found} values in a row, but {expected} positions")]
    RaggedMatrix { expected: usize, found: usize },
    #[error("Matrix has {rows} rows but {events} event identifiers")]
    EventCountMismatch { events: usize, rows: usize },
    #[error("Event '{0}' occurs more than once in the matrix")]
    DuplicateEvent(String),

    // Numerical errors
    #[error("No strictly positive density survives the threshold; the pseudocount is undefined")]
    DegenerateInput,
    #[error("Density of event '{event}' at position '{position}' is negative ({value}); only -1 marks a missing value")]
    NegativeDensity {
        event: String,
        position: String,
        value: f64,
    },
    #[error("Position axes differ: {left} positions vs {right} positions, or labels out of order")]
    PositionMismatch { left: usize, right: usize },
    #[error("Confidence fraction must be in (0, 1], got {0}")]
    InvalidConfidence(f64),
    #[error("Undefined statistic: {0}")]
    UndefinedStatistic(#[from] UndefinedStatistic),
}

/// A per-position statistic that could not be computed.
///
/// Unlike [`RbpMapsError`] this is [`Clone`], so it can be stored
/// alongside the successfully computed positions of a series.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum UndefinedStatistic {
    #[error("background standard deviation is zero at position '{0}'")]
    ZeroBackgroundDeviation(String),
    #[error("mean or standard deviation is missing at position '{0}'")]
    MissingValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_message() {
        let error = RbpMapsError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "density.tsv",
        ));
        assert_eq!(error.to_string(), "File reading error: density.tsv");
    }
}
