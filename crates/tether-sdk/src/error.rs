//! Error types for numeric conversion

/// Result type for numeric conversions
pub type NumericResult<T> = Result<T, NumericError>;

/// Numeric conversion error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NumericError {
    /// Magnitude does not fit the target subtype
    #[error("Overflow: {value} does not fit in {target}")]
    Overflow {
        /// Offending value, rendered as text
        value: String,
        /// Target subtype name
        target: &'static str,
    },

    /// Non-integral value for an integer subtype
    #[error("Inexact conversion: {value} is not representable as {target}")]
    Inexact {
        /// Offending value, rendered as text
        value: String,
        /// Target subtype name
        target: &'static str,
    },

    /// Constructor called with a subtype of the wrong family
    #[error("Kind mismatch: expected {expected}, got {got}")]
    KindMismatch {
        /// Expected family
        expected: &'static str,
        /// Actual subtype name
        got: &'static str,
    },
}
