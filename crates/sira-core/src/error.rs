//! Unified error types for the SIRA workspace
//!
//! [`SiraError`] covers every failure the model and simulation layers can
//! report. Orchestration code (scenario loading, CLI commands) wraps these in
//! `anyhow` with context; library code returns [`SiraResult`].
//!
//! # Example
//!
//! ```ignore
//! use sira_core::{SiraError, SiraResult};
//!
//! fn require_type(table: &FragilityTable, name: &str) -> SiraResult<()> {
//!     table.require(name)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for facility modelling and simulation.
#[derive(Error, Debug)]
pub enum SiraError {
    /// I/O errors (file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Data validation errors (ranges, duplicates, ordering)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration mismatches between tables, e.g. a component type with no
    /// fragility entry. Always fatal: raised before any simulation starts.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network structure errors (unknown component, dangling connection)
    #[error("Network error: {0}")]
    Network(String),

    /// Simulation/scheduling errors
    #[error("Simulation error: {0}")]
    Simulation(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using SiraError.
pub type SiraResult<T> = Result<T, SiraError>;

impl From<anyhow::Error> for SiraError {
    fn from(err: anyhow::Error) -> Self {
        SiraError::Other(err.to_string())
    }
}

impl From<String> for SiraError {
    fn from(s: String) -> Self {
        SiraError::Other(s)
    }
}

impl From<&str> for SiraError {
    fn from(s: &str) -> Self {
        SiraError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for SiraError {
    fn from(err: serde_json::Error) -> Self {
        SiraError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SiraError::Config("component type 'Boiler' has no fragility entry".into());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Boiler"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SiraError = io_err.into();
        assert!(matches!(err, SiraError::Io(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> SiraResult<()> {
            Err(SiraError::Validation("cost fractions".into()))
        }

        fn outer() -> SiraResult<()> {
            inner()?;
            Ok(())
        }

        assert!(matches!(outer(), Err(SiraError::Validation(_))));
    }
}
