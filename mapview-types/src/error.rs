//! Error type used by the crate.

use thiserror::Error;

/// Error enum.
#[derive(Debug, Error, PartialEq)]
pub enum MapViewTypesError {
    /// A coordinate was not a finite number.
    #[error("coordinate is not a finite number: {0}")]
    NonFinite(f64),
    /// A coordinate pair had too few elements.
    #[error("a coordinate pair must contain latitude and longitude, got {0} value(s)")]
    IncompletePair(usize),
}
