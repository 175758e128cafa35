//! Error types for the bridge

use tether_sdk::NumericError;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Bridge error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    /// The foreign runtime reported an error, or a call failed without one
    #[error("{operation}: {message}")]
    ForeignRuntime {
        /// Host operation that triggered the foreign call
        operation: String,
        /// Foreign diagnostic text
        message: String,
    },

    /// A value has no representation on the other side
    #[error("Type conversion error: {0}")]
    TypeConversion(String),

    /// A numeric magnitude does not fit the target subtype
    #[error("Overflow error: {value} does not fit in {target}")]
    Overflow {
        /// Offending value
        value: String,
        /// Target subtype name
        target: String,
    },

    /// The operation is not supported on the target
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// No foreign runtime is compiled in or configured
    #[error("Foreign runtime not available: {0}")]
    RuntimeNotAvailable(String),
}

impl BridgeError {
    /// Build a `ForeignRuntime` error
    pub fn foreign(operation: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::ForeignRuntime {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Build a `TypeConversion` error
    pub fn conversion(message: impl Into<String>) -> Self {
        BridgeError::TypeConversion(message.into())
    }

    /// Build an `UnsupportedOperation` error
    pub fn unsupported(message: impl Into<String>) -> Self {
        BridgeError::UnsupportedOperation(message.into())
    }
}

impl From<NumericError> for BridgeError {
    fn from(err: NumericError) -> Self {
        match err {
            NumericError::Overflow { value, target } => BridgeError::Overflow {
                value,
                target: target.to_string(),
            },
            other => BridgeError::TypeConversion(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_error_display() {
        let err = BridgeError::foreign("get_field", "AttributeError: no attribute 'x'");
        assert_eq!(err.to_string(), "get_field: AttributeError: no attribute 'x'");
    }

    #[test]
    fn test_numeric_overflow_converts() {
        let err: BridgeError = NumericError::Overflow {
            value: "300".to_string(),
            target: "uint8",
        }
        .into();
        assert_eq!(
            err,
            BridgeError::Overflow {
                value: "300".to_string(),
                target: "uint8".to_string()
            }
        );
    }

    #[test]
    fn test_numeric_mismatch_converts_to_type_conversion() {
        let err: BridgeError = NumericError::KindMismatch {
            expected: "int8",
            got: "double",
        }
        .into();
        assert!(matches!(err, BridgeError::TypeConversion(_)));
    }
}
