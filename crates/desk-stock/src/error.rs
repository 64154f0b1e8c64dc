//! Error types for stock desk operations

use thiserror::Error;

/// Stock desk specific errors
#[derive(Debug, Error)]
pub enum DeskError {
    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("{message} (HTTP {status})")]
    Backend {
        status: u16,
        message: String,
    },

    /// Backend answered with a body we could not use
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Ticker symbol rejected before any request was made
    #[error("Invalid ticker: {0}")]
    InvalidTicker(String),

    /// An operation needed a selected ticker
    #[error("No ticker selected")]
    NoTickerSelected,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid backend URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Command parsing error
    #[error("Command error: {0}")]
    Command(String),

    /// Report file could not be written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for desk operations
pub type Result<T> = std::result::Result<T, DeskError>;

impl DeskError {
    /// Message suitable for a transcript line
    ///
    /// Backend errors carry the server's own wording; everything else uses
    /// the display form.
    pub fn user_message(&self) -> String {
        match self {
            DeskError::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
