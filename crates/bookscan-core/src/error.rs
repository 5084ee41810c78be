//! Error handling
//!
//! Typed errors for the scan-to-book pipeline with recovery suggestions.
//! Gate rejections are not errors at all; they are silent `Ignore` decisions.

use thiserror::Error;

use crate::catalog::LookupError;
use crate::isbn::ValidationError;

/// Required configuration is missing or unusable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// No catalog credential configured
    #[error("Catalog application ID is not configured")]
    MissingApplicationId,

    /// Catalog endpoint is not an absolute http(s) URL
    #[error("Invalid catalog endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

/// Any failure surfaced by the pipeline
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl Error {
    /// Whether the user can recover without changing configuration
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Configuration(_))
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Error::Configuration(ConfigurationError::MissingApplicationId) => Some(
                "Set BOOKSCAN_APPLICATION_ID or run `bookscan config set application_id <id>`.",
            ),
            Error::Configuration(ConfigurationError::InvalidEndpoint { .. }) => {
                Some("Run `bookscan config set endpoint <url>` with an http(s) URL.")
            }
            Error::Validation(_) => {
                Some("Check the number printed above the barcode; it should start with 978 or 979.")
            }
            Error::Lookup(_) => Some("Scan the barcode again or re-enter the ISBN to retry."),
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;
