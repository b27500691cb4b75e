//! Aggregate error type for the runtime.
//!
//! Subsystems define their own error enums next to their code; this module
//! folds them into one type for host-level call sites. Registry lookups
//! stay `Option`-based by design: a missing interface is expected traffic,
//! not an error.

use crate::extension::ExtensionError;
use crate::library::LibraryError;

/// Main error type for the runtime.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Extension(#[from] ExtensionError),

    #[error("invalid config: {field} = {value} ({reason})")]
    InvalidConfig {
        field: String,
        value: String,
        reason: String,
    },

    #[error("io error for {path}: {error}")]
    Io { path: String, error: String },

    #[error("allocation failed for {size} bytes")]
    AllocationFailed { size: usize },

    #[error("initialization error: {0}")]
    Initialization(String),
}

/// Type alias for results in the runtime.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

impl From<std::io::Error> for RuntimeError {
    fn from(error: std::io::Error) -> Self {
        RuntimeError::Io {
            path: String::new(),
            error: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RuntimeError::InvalidConfig {
            field: "simulation_frame_rate".to_string(),
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config: simulation_frame_rate = 0 (must be positive)"
        );
    }
}
