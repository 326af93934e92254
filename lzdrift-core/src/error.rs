//! Error types for drift computations
//!
//! Every failure in the pipeline surfaces as a [`DriftError`]. Variants carry
//! a stable error code and a coarse category so that front ends can report
//! failures without matching on message text.
//!
//! # Example
//!
//! ```rust
//! use lzdrift_core::error::{DriftError, ErrorCategory};
//!
//! let err = DriftError::invalid_input("time_span", "must be finite");
//! assert_eq!(err.category(), ErrorCategory::Validation);
//! assert_eq!(err.error_code(), "INVALID_INPUT");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for drift operations
pub type Result<T> = std::result::Result<T, DriftError>;

/// Error category for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Caller supplied malformed input or configuration
    Validation,
    /// The numeric solver could not produce a result
    Numeric,
    /// Serialization or I/O outside the numeric core
    External,
}

/// Errors that can occur while computing radii, fields or trajectories
#[derive(Error, Debug)]
pub enum DriftError {
    // ═══════════════════════════════════════════════════════════════════════
    // Validation errors
    // ═══════════════════════════════════════════════════════════════════════

    /// An argument is non-finite or outside its domain
    #[error("Invalid input '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    /// A configuration value failed validation
    #[error("Invalid configuration '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },

    // ═══════════════════════════════════════════════════════════════════════
    // Numeric errors
    // ═══════════════════════════════════════════════════════════════════════

    /// The integrator gave up on a particle
    #[error("Integration failed for particle {particle} at t={time}: {reason}")]
    IntegrationFailure {
        particle: usize,
        time: f64,
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Infrastructure errors
    // ═══════════════════════════════════════════════════════════════════════

    /// JSON serialization or deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading a configuration file failed
    #[error("IO error: {message}")]
    Io { message: String },
}

impl DriftError {
    /// Shorthand for [`DriftError::InvalidInput`]
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DriftError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`DriftError::InvalidConfig`]
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DriftError::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the error category for grouping
    pub fn category(&self) -> ErrorCategory {
        match self {
            DriftError::InvalidInput { .. } | DriftError::InvalidConfig { .. } => {
                ErrorCategory::Validation
            }
            DriftError::IntegrationFailure { .. } => ErrorCategory::Numeric,
            DriftError::Json(_) | DriftError::Io { .. } => ErrorCategory::External,
        }
    }

    /// Returns the stable error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            DriftError::InvalidInput { .. } => "INVALID_INPUT",
            DriftError::InvalidConfig { .. } => "INVALID_CONFIG",
            DriftError::IntegrationFailure { .. } => "INTEGRATION_FAILURE",
            DriftError::Json(_) => "JSON_ERROR",
            DriftError::Io { .. } => "IO_ERROR",
        }
    }

    /// Returns true if the caller can fix this error by changing its input
    pub fn is_client_error(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }

    /// Structured representation for machine-readable output
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.error_code(),
                "category": self.category(),
                "message": self.to_string(),
            }
        })
    }
}

impl From<std::io::Error> for DriftError {
    fn from(err: std::io::Error) -> Self {
        DriftError::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_and_categories() {
        let err = DriftError::IntegrationFailure {
            particle: 2,
            time: 12.5,
            reason: "step size underflow".to_string(),
        };
        assert_eq!(err.error_code(), "INTEGRATION_FAILURE");
        assert_eq!(err.category(), ErrorCategory::Numeric);
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("particle 2"));

        let err = DriftError::invalid_config("lz", "must be positive");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_to_json() {
        let err = DriftError::invalid_input("num_points", "must be at least 1");
        let json = err.to_json();
        assert_eq!(json["error"]["code"], "INVALID_INPUT");
        assert_eq!(json["error"]["category"], "validation");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("num_points"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let err: DriftError = io.into();
        assert_eq!(err.error_code(), "IO_ERROR");
        assert_eq!(err.category(), ErrorCategory::External);
    }
}
