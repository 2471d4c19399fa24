//! Error types for the preview pipeline

use thiserror::Error;

/// Result type alias for preview operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while composing or evaluating a preview.
///
/// None of these cross the public `preview` boundary: composition falls back
/// to the original input and evaluation turns every failure into a rejection.
#[derive(Error, Debug)]
pub enum Error {
    /// Markup or CSS could not be repaired
    #[error("Parse failed: {0}")]
    Parse(String),

    /// The rendering context failed to load the document
    #[error("Failed to load document: {0}")]
    LoadError(String),

    /// The rendering context failed while being inspected
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// The evaluation was detached before it could finish
    #[error("Evaluation detached")]
    Detached,

    /// Failed to initialize a rendering context
    #[error("Context initialization failed: {0}")]
    InitializationError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}
