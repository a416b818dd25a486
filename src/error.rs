//! Error types for the rasterizer

use thiserror::Error;

/// Result type alias for rasterizer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rasterizing a page
///
/// The pipeline never rewraps an error returned by a collaborator: a failing
/// loader, renderer or painter surfaces through the returned future exactly
/// as it was produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Failed to load a document
    #[error("Failed to load URL: {0}")]
    LoadError(String),

    /// Failed to render the document into an image
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Failed to paint an image onto a canvas
    #[error("Painting failed: {0}")]
    PaintError(String),

    /// Failed to execute JavaScript
    #[error("Script execution failed: {0}")]
    ScriptError(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration or call arguments
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// The bare message carried by the error, without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            Error::LoadError(msg)
            | Error::RenderError(msg)
            | Error::PaintError(msg)
            | Error::ScriptError(msg)
            | Error::ConfigError(msg)
            | Error::NetworkError(msg)
            | Error::Io(msg)
            | Error::Other(msg) => msg.clone(),
            Error::Timeout(ms) => format!("Timeout after {}ms", ms),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}

#[cfg(feature = "backends")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::NetworkError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_strips_variant_prefix() {
        let e = Error::LoadError("the message".into());
        assert_eq!(e.to_string(), "Failed to load URL: the message");
        assert_eq!(e.message(), "the message");
        assert_eq!(Error::Timeout(42).message(), "Timeout after 42ms");
    }
}
