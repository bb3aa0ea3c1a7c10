//! Error taxonomy for command construction and dispatch

use thiserror::Error;

/// Errors raised while validating, building or executing a command
#[derive(Error, Debug)]
pub enum GlassError {
    /// A single raw value failed its parameter's rule
    #[error("Invalid input for parameter {parameter}: {value:?}")]
    InvalidInput { parameter: String, value: String },

    /// Arity mismatch or a rejected slot while building command text
    #[error("Invalid parameters for command {command}: {reason}")]
    InvalidParams { command: String, reason: String },

    /// The backend could not run the command
    #[error("Execution failed: {0}")]
    Execution(String),

    /// A broken command, parameter or router declaration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl GlassError {
    /// Short tag written to the operator log
    pub fn log_tag(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } | Self::InvalidParams { .. } => "BAD_PARAMS",
            Self::Execution(_) => "EXECUTION_FAILURE",
            Self::Configuration(_) => "CONFIGURATION",
        }
    }
}

pub type Result<T> = std::result::Result<T, GlassError>;
