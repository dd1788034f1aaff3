//! Aggregation error types.

use thiserror::Error;

/// Result type alias for aggregation operations.
pub type Result<T> = std::result::Result<T, AggregateError>;

/// Errors raised by the aggregation primitives.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    /// Input rows are not ordered by `(timestamp, nanoseconds)`.
    #[error("trades are not sorted at row {index}")]
    Unsorted {
        /// Index of the first out-of-order row.
        index: usize,
    },

    /// A summed quantity differs between input and output.
    #[error("{quantity} not conserved: expected {expected}, got {actual}")]
    ConservationViolated {
        /// Name of the quantity.
        quantity: &'static str,
        /// Input total.
        expected: f64,
        /// Output total.
        actual: f64,
    },

    /// A threshold is negative or not a number.
    #[error("invalid threshold: {0}")]
    InvalidThreshold(f64),

    /// A requested attribute does not exist on the rows.
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),
}

impl AggregateError {
    /// Returns true for data-integrity faults.
    #[must_use]
    pub const fn is_integrity_fault(&self) -> bool {
        matches!(self, Self::ConservationViolated { .. })
    }
}

/// Verifies that `actual` matches `expected` within floating tolerance.
pub(crate) fn check_conserved(quantity: &'static str, expected: f64, actual: f64) -> Result<()> {
    if approx::relative_eq!(expected, actual, epsilon = 1e-9, max_relative = 1e-9) {
        Ok(())
    } else {
        tracing::warn!(quantity, expected, actual, "conservation violated");
        Err(AggregateError::ConservationViolated {
            quantity,
            expected,
            actual,
        })
    }
}
