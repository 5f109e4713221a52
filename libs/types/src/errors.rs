//! Error taxonomy for the simulation engine
//!
//! Validation errors surface synchronously to `place_order` callers.
//! Cancellation misses and persistence failures are deliberately not in
//! this taxonomy: the former is a boolean outcome, the latter is
//! swallowed at the engine boundary.

use crate::numeric::Quantity;
use thiserror::Error;

/// Errors returned by order placement validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaceOrderError {
    #[error("unknown trading pair: {0}")]
    InvalidPair(String),

    #[error("amount {amount} below pair minimum {min}")]
    BelowMinimumAmount { amount: Quantity, min: Quantity },

    #[error("limit price must be positive")]
    InvalidPrice,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pair_display() {
        let err = PlaceOrderError::InvalidPair("FOO/BAR".to_string());
        assert_eq!(err.to_string(), "unknown trading pair: FOO/BAR");
    }

    #[test]
    fn test_below_minimum_display() {
        let err = PlaceOrderError::BelowMinimumAmount {
            amount: Quantity::from_str("0.0001").unwrap(),
            min: Quantity::from_str("0.001").unwrap(),
        };
        assert!(err.to_string().contains("0.0001"));
        assert!(err.to_string().contains("0.001"));
    }
}
