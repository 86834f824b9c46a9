use self::Error::*;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A sample with no observations was passed where at least one is needed.
    EmptySample,
    /// Two arrays that must be paired element by element differ in length.
    ShapeMismatch(usize, usize),
    /// The log-rank estimator tag is neither `mantel` nor `pike`.
    UnknownEstimator(String),
    /// A value at the given index is NaN and cannot be ordered.
    NotANumber(usize),
    /// A lower or upper uncertainty at the given index is negative or not finite.
    InvalidUncertainty(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            EmptySample => write!(f, "Sample must contain at least one observation"),
            ShapeMismatch(expected, actual) => write!(
                f,
                "Paired arrays differ in length: expected {} elements, found {}",
                expected, actual
            ),
            UnknownEstimator(name) => write!(
                f,
                "Estimator '{}' not recognized, options are 'mantel' or 'pike'",
                name
            ),
            NotANumber(index) => write!(f, "Value at index {} is NaN", index),
            InvalidUncertainty(index) => {
                write!(f, "Uncertainty at index {} is negative or not finite", index)
            }
        }
    }
}

impl std::error::Error for Error {}

/// Checks that two paired arrays have the same length.
pub(crate) fn ensure_same_len(expected: usize, actual: usize) -> Result<(), Error> {
    if expected == actual {
        Ok(())
    } else {
        Err(ShapeMismatch(expected, actual))
    }
}
