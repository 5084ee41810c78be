//! Book catalog lookups
//!
//! Resolves a validated ISBN into a [`BookRecord`] through a remote catalog.
//! One request per lookup: no retry, no caching.

mod error;
mod rakuten;

use async_trait::async_trait;
use serde::Serialize;

use crate::isbn::Isbn;
use crate::models::BookRecord;

pub use error::LookupError;
pub use rakuten::{parse_endpoint, ApplicationId, RakutenBooksClient, DEFAULT_ENDPOINT};

/// A settled lookup that did not fail
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", content = "book", rename_all = "snake_case")]
pub enum LookupOutcome {
    /// The catalog knows this ISBN
    Found(BookRecord),
    /// The catalog answered, but has no matching book
    NotFound,
}

impl LookupOutcome {
    pub fn book(&self) -> Option<&BookRecord> {
        match self {
            LookupOutcome::Found(book) => Some(book),
            LookupOutcome::NotFound => None,
        }
    }

    pub fn into_book(self) -> Option<BookRecord> {
        match self {
            LookupOutcome::Found(book) => Some(book),
            LookupOutcome::NotFound => None,
        }
    }
}

/// Source of book metadata
#[async_trait]
pub trait BookCatalog: Send + Sync {
    /// Resolve a single ISBN
    async fn lookup(&self, isbn: &Isbn) -> Result<LookupOutcome, LookupError>;
}

/// Look up a manually entered ISBN
///
/// Unlike the scanning path, malformed input is reported as a
/// `ValidationError` instead of being ignored.
pub async fn lookup_entry<C>(catalog: &C, raw: &str) -> crate::Result<LookupOutcome>
where
    C: BookCatalog + ?Sized,
{
    let isbn = Isbn::parse(raw)?;
    Ok(catalog.lookup(&isbn).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCatalog {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BookCatalog for CountingCatalog {
        async fn lookup(&self, isbn: &Isbn) -> Result<LookupOutcome, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(LookupOutcome::Found(BookRecord::new(isbn.clone())))
        }
    }

    #[tokio::test]
    async fn test_lookup_entry_rejects_invalid_input_without_calling_catalog() {
        let catalog = CountingCatalog {
            calls: AtomicUsize::new(0),
        };

        let err = lookup_entry(&catalog, "12-34").await.unwrap_err();
        match err {
            Error::Validation(e) => assert_eq!(e.normalized, "1234"),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lookup_entry_normalizes_before_lookup() {
        let catalog = CountingCatalog {
            calls: AtomicUsize::new(0),
        };

        let outcome = lookup_entry(&catalog, "978-4-16-715805-7").await.unwrap();
        assert_eq!(outcome.book().unwrap().isbn.as_str(), "9784167158057");
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_outcome_accessors() {
        assert!(LookupOutcome::NotFound.book().is_none());
        let isbn = Isbn::parse("9784167158057").unwrap();
        let outcome = LookupOutcome::Found(BookRecord::new(isbn));
        assert!(outcome.into_book().is_some());
    }
}
