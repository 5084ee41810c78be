//! ISBN-13 validation and normalization
//!
//! Scanned payloads and manually typed ISBNs are reduced to their digits and
//! accepted only in the book-specific EAN-13 form: 13 digits starting with
//! `978` or `979`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of digits in an ISBN-13
pub const ISBN13_LEN: usize = 13;

/// EAN prefixes reserved for books ("Bookland")
pub const BOOK_PREFIXES: [&str; 2] = ["978", "979"];

/// Input that does not normalize to a usable ISBN-13
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{normalized}' is not a valid ISBN-13 (expected 13 digits starting with 978 or 979)")]
pub struct ValidationError {
    /// The input after non-digit characters were stripped
    pub normalized: String,
}

/// A validated ISBN-13
///
/// Always exactly 13 ASCII digits with a 978/979 prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isbn(String);

impl Isbn {
    /// Normalize and validate raw input
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let normalized = normalize(raw);
        if is_isbn13(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(ValidationError { normalized })
        }
    }

    /// The 13-digit string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 978/979 prefix
    pub fn prefix(&self) -> &str {
        &self.0[..3]
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Isbn {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Isbn {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Isbn> for String {
    fn from(isbn: Isbn) -> Self {
        isbn.0
    }
}

impl AsRef<str> for Isbn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Result of checking a scanned payload without raising an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsbnCheck {
    Valid(Isbn),
    Invalid,
}

impl IsbnCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, IsbnCheck::Valid(_))
    }
}

/// Strip every non-digit character
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Check a payload for the silent scanning path
pub fn check(raw: &str) -> IsbnCheck {
    match Isbn::parse(raw) {
        Ok(isbn) => IsbnCheck::Valid(isbn),
        Err(_) => IsbnCheck::Invalid,
    }
}

/// Whether the payload normalizes to a usable ISBN-13
pub fn is_valid(raw: &str) -> bool {
    check(raw).is_valid()
}

fn is_isbn13(digits: &str) -> bool {
    digits.len() == ISBN13_LEN
        && digits.bytes().all(|b| b.is_ascii_digit())
        && BOOK_PREFIXES.iter().any(|p| digits.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_separators() {
        assert_eq!(normalize("978-4-16-715805-7"), "9784167158057");
        assert_eq!(normalize(" ISBN 978 4 16 715805 7 "), "9784167158057");
        assert_eq!(normalize("abc"), "");
    }

    #[test]
    fn test_valid_isbn() {
        assert!(is_valid("9784167158057"));
        assert!(is_valid("978-4-16-715805-7"));
        assert!(is_valid("9791032305690"));
    }

    #[test]
    fn test_wrong_prefix() {
        assert!(!is_valid("1234567890123"));
        // Retail price code printed under the ISBN on Japanese books
        assert!(!is_valid("1920193006003"));
    }

    #[test]
    fn test_wrong_length() {
        assert!(!is_valid("97841671580"));
        assert!(!is_valid("97841671580571"));
        assert!(!is_valid(""));
    }

    #[test]
    fn test_parse_error_carries_normalized_input() {
        let err = Isbn::parse("123-456").unwrap_err();
        assert_eq!(err.normalized, "123456");
        assert!(err.to_string().contains("123456"));
    }

    #[test]
    fn test_check() {
        match check("978-4-16-715805-7") {
            IsbnCheck::Valid(isbn) => assert_eq!(isbn.as_str(), "9784167158057"),
            IsbnCheck::Invalid => panic!("expected valid ISBN"),
        }
        assert_eq!(check("4901234567894"), IsbnCheck::Invalid);
    }

    #[test]
    fn test_prefix_and_display() {
        let isbn: Isbn = "979-10-323-0569-0".parse().unwrap();
        assert_eq!(isbn.prefix(), "979");
        assert_eq!(isbn.to_string(), "9791032305690");
    }

    #[test]
    fn test_serde_validates() {
        let isbn: Isbn = serde_json::from_str("\"9784167158057\"").unwrap();
        assert_eq!(isbn.as_str(), "9784167158057");
        assert!(serde_json::from_str::<Isbn>("\"1234\"").is_err());
        assert_eq!(serde_json::to_string(&isbn).unwrap(), "\"9784167158057\"");
    }
}
