//! Catalog lookup errors

use thiserror::Error;

/// A catalog lookup that failed to produce an answer
///
/// "No matching book" is not an error; see `LookupOutcome::NotFound`.
#[derive(Error, Debug)]
pub enum LookupError {
    /// The catalog answered with a non-2xx status
    #[error("Catalog returned HTTP {status} for ISBN {isbn}")]
    Status { isbn: String, status: u16 },

    /// The request could not be sent or the body could not be read
    #[error("Catalog request for ISBN {isbn} failed: {source}")]
    Transport {
        isbn: String,
        #[source]
        source: reqwest::Error,
    },

    /// The body was not the expected JSON
    #[error("Could not parse catalog response for ISBN {isbn}: {source}")]
    Decode {
        isbn: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LookupError {
    /// ISBN the failed lookup was for
    pub fn isbn(&self) -> &str {
        match self {
            LookupError::Status { isbn, .. }
            | LookupError::Transport { isbn, .. }
            | LookupError::Decode { isbn, .. } => isbn,
        }
    }

    /// HTTP status, when the catalog answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            LookupError::Status { status, .. } => Some(*status),
            LookupError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            LookupError::Decode { .. } => None,
        }
    }
}
