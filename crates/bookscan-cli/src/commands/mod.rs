//! Command handlers

pub mod config;
pub mod lookup;
pub mod scan;
pub mod validate;

/// Attach the core error's recovery suggestion, if any
pub(crate) fn with_suggestion(err: impl Into<bookscan_core::Error>) -> anyhow::Error {
    let err = err.into();
    match err.recovery_suggestion() {
        Some(hint) => anyhow::anyhow!("{}\n\n{}", err, hint),
        None => err.into(),
    }
}
