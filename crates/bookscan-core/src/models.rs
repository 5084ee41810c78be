//! Data models for bookscan
//!
//! `BookRecord` is the book metadata produced by a catalog lookup. It is not
//! stored here; the surrounding application decides what to persist.

use serde::{Deserialize, Serialize};

use crate::isbn::Isbn;

/// Placeholder used when the catalog leaves title or author blank
pub const UNKNOWN: &str = "unknown";

/// Book metadata resolved from an ISBN
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookRecord {
    /// The ISBN the record was resolved from
    pub isbn: Isbn,
    /// Title, or [`UNKNOWN`]
    pub title: String,
    /// Author(s) as reported by the catalog, or [`UNKNOWN`]
    pub author: String,
    /// Publisher name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    /// Publication date as reported by the catalog (free-form)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    /// Blurb or description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Cover image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl BookRecord {
    /// Create a record with unknown title and author
    pub fn new(isbn: Isbn) -> Self {
        Self {
            isbn,
            title: UNKNOWN.to_string(),
            author: UNKNOWN.to_string(),
            publisher: None,
            published_date: None,
            description: None,
            thumbnail_url: None,
        }
    }

    /// Set the title, falling back to [`UNKNOWN`] when blank
    pub fn set_title(&mut self, title: Option<&str>) {
        self.title = or_unknown(title);
    }

    /// Set the author, falling back to [`UNKNOWN`] when blank
    pub fn set_author(&mut self, author: Option<&str>) {
        self.author = or_unknown(author);
    }
}

fn or_unknown(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// Trim an optional upstream string, dropping it when blank
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn isbn() -> Isbn {
        Isbn::parse("9784167158057").unwrap()
    }

    #[test]
    fn test_new_record_is_unknown() {
        let book = BookRecord::new(isbn());
        assert_eq!(book.title, UNKNOWN);
        assert_eq!(book.author, UNKNOWN);
        assert!(book.publisher.is_none());
    }

    #[test]
    fn test_blank_fields_fall_back() {
        let mut book = BookRecord::new(isbn());
        book.set_title(Some("   "));
        book.set_author(None);
        assert_eq!(book.title, UNKNOWN);
        assert_eq!(book.author, UNKNOWN);

        book.set_title(Some(" Title "));
        book.set_author(Some("Author"));
        assert_eq!(book.title, "Title");
        assert_eq!(book.author, "Author");
    }

    #[test]
    fn test_serialization_skips_missing_optionals() {
        let mut book = BookRecord::new(isbn());
        book.set_title(Some("T"));
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["isbn"], "9784167158057");
        assert_eq!(json["title"], "T");
        assert!(json.get("publisher").is_none());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some(" x ".into())), Some("x".to_string()));
        assert_eq!(non_blank(Some("".into())), None);
        assert_eq!(non_blank(None), None);
    }
}
