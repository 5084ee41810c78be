//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use bookscan_core::{BookRecord, Isbn, LookupOutcome, ScanEvent, ValidationError};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
#[derive(Debug, Clone, Copy)]
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a book record
    pub fn print_book(&self, book: &BookRecord) {
        match self.format {
            OutputFormat::Human => {
                println!("ISBN:        {}", book.isbn);
                println!("Title:       {}", book.title);
                println!("Author:      {}", book.author);
                if let Some(ref publisher) = book.publisher {
                    println!("Publisher:   {}", publisher);
                }
                if let Some(ref date) = book.published_date {
                    println!("Published:   {}", date);
                }
                if let Some(ref url) = book.thumbnail_url {
                    println!("Cover:       {}", url);
                }
                if let Some(ref desc) = book.description {
                    println!();
                    println!("{}", truncate(desc, 400));
                }
            }
            OutputFormat::Json => print_json(book, true),
            OutputFormat::Quiet => {
                println!("{}\t{}", book.isbn, book.title);
            }
        }
    }

    /// Print the result of a manual lookup
    pub fn print_outcome(&self, isbn: &str, outcome: &LookupOutcome) {
        match outcome {
            LookupOutcome::Found(book) => self.print_book(book),
            LookupOutcome::NotFound => match self.format {
                OutputFormat::Human => println!("No match for ISBN {}.", isbn),
                OutputFormat::Json => {
                    print_json(&serde_json::json!({"isbn": isbn, "found": false}), true)
                }
                OutputFormat::Quiet => {}
            },
        }
    }

    /// Print validation results
    pub fn print_validation(&self, results: &[(&str, Result<Isbn, ValidationError>)]) {
        match self.format {
            OutputFormat::Human => {
                for (raw, result) in results {
                    match result {
                        Ok(isbn) => println!("✓ {} -> {}", raw, isbn),
                        Err(e) => println!("✗ {} ({})", raw, e),
                    }
                }
            }
            OutputFormat::Json => {
                let json: Vec<_> = results
                    .iter()
                    .map(|(raw, result)| match result {
                        Ok(isbn) => serde_json::json!({
                            "input": raw,
                            "valid": true,
                            "isbn": isbn,
                        }),
                        Err(e) => serde_json::json!({
                            "input": raw,
                            "valid": false,
                            "normalized": e.normalized,
                        }),
                    })
                    .collect();
                print_json(&json, true);
            }
            OutputFormat::Quiet => {
                for (_, result) in results {
                    if let Ok(isbn) = result {
                        println!("{}", isbn);
                    }
                }
            }
        }
    }

    /// Print a scan session event
    ///
    /// JSON mode prints one object per line.
    pub fn print_scan_event(&self, event: &ScanEvent) {
        match self.format {
            OutputFormat::Human => match event {
                ScanEvent::StateChanged { .. } => {}
                ScanEvent::Accepted { isbn } => println!("Scanned {}, looking up...", isbn),
                ScanEvent::Resolved { book } => {
                    self.print_book(book);
                    println!();
                }
                ScanEvent::NotFound { isbn } => println!("No match for ISBN {}.", isbn),
                ScanEvent::LookupFailed { error, .. } => eprintln!("⚠ Lookup failed: {}", error),
            },
            OutputFormat::Json => print_json(event, false),
            OutputFormat::Quiet => {
                if let ScanEvent::Resolved { book } = event {
                    println!("{}", book.isbn);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr
    pub fn warning(&self, msg: &str) {
        if self.format != OutputFormat::Quiet {
            eprintln!("⚠ {}", msg);
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match rendered {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("⚠ Could not render JSON: {}", e),
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
