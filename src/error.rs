use thiserror::Error;

/// Result type for colav operations
pub type Result<T> = std::result::Result<T, ColavError>;

/// Main error type for the colav library
#[derive(Debug, Error)]
pub enum ColavError {
    /// Invalid dimensions for operations
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// Upstream state is corrupted; the current computation must abort
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// Configuration variant that exists in name only
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Invalid discrete action
    #[error("Invalid action {action}: must be less than {max_actions}")]
    InvalidAction {
        action: usize,
        max_actions: usize,
    },

    /// Numerical computation errors
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// IO errors (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Helper functions for common error patterns
impl ColavError {
    pub fn dimension_mismatch<E: Into<String>, A: Into<String>>(expected: E, actual: A) -> Self {
        ColavError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        ColavError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invariant<S: Into<String>>(msg: S) -> Self {
        ColavError::InvariantViolation(msg.into())
    }

    pub fn not_implemented<S: Into<String>>(what: S) -> Self {
        ColavError::NotImplemented(what.into())
    }
}
