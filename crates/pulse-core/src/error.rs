//! Shared error type across pulse crates.

use thiserror::Error;

/// Stable error codes used as a structured log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Startup configuration could not be interpreted.
    Config,
    /// Metrics text could not be rendered.
    Exposition,
    /// Recording a request outcome failed.
    Instrumentation,
}

impl ErrorKind {
    /// String representation used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "CONFIG",
            ErrorKind::Exposition => "EXPOSITION",
            ErrorKind::Instrumentation => "INSTRUMENTATION",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PulseError>;

/// Unified error type used by core and service.
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("invalid config: {0}")]
    Config(String),
    #[error("metrics exposition failed: {0}")]
    Exposition(String),
    #[error("instrumentation failed: {0}")]
    Instrumentation(String),
}

impl PulseError {
    /// Map an error to its stable code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PulseError::Config(_) => ErrorKind::Config,
            PulseError::Exposition(_) => ErrorKind::Exposition,
            PulseError::Instrumentation(_) => ErrorKind::Instrumentation,
        }
    }
}

impl From<std::fmt::Error> for PulseError {
    fn from(e: std::fmt::Error) -> Self {
        PulseError::Exposition(e.to_string())
    }
}
