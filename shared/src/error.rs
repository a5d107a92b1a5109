//! Error types for the Agenda de Shows functions.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Agenda de Shows functions.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid credentials/keys
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or malformed request parameters or body
    #[error("Validation error: {0}")]
    Validation(String),

    /// HTTP verb not allowed for this action
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// A third-party API call failed; carries the upstream message
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The source image could not be downloaded
    #[error("Failed to fetch image: status {status}")]
    SourceFetch {
        /// HTTP status returned by the image source
        status: u16,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::NotFound(_) => 404,
            Error::MethodNotAllowed => 405,
            // Surface the source's own status when the download failed.
            Error::SourceFetch { status } => *status,
            _ => 500,
        }
    }
}
