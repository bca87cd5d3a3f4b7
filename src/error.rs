//! Error types for the Guardrail service.

use thiserror::Error;

/// Main error type for Guardrail operations.
#[derive(Error, Debug)]
pub enum GuardrailError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Guardrail operations.
pub type Result<T> = std::result::Result<T, GuardrailError>;
