//! bookscan core library
//!
//! Turns camera barcode detections into book metadata: a scan gate filters
//! the detection stream, an ISBN-13 check validates the accepted code, and a
//! catalog client resolves it into a [`BookRecord`].
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let catalog = Arc::new(RakutenBooksClient::from_config(&config.catalog)?);
//!
//! let (camera, decodes) = decode_channel(32);
//! let mut session = ScanSession::new(catalog, config.scan.gate_options());
//! let handle = session.handle();
//! let task = session.spawn(decodes);
//!
//! handle.arm();
//! camera.try_send(DecodeEvent::ean13("9784167158057"))?;
//! ```
//!
//! # Modules
//!
//! - `scan`: decode events, scan gate, screen controller and session driver
//! - `isbn`: ISBN-13 normalization and validation
//! - `catalog`: book catalog lookups
//! - `models`: book record
//! - `config`: application configuration
//! - `error`: error types

pub mod catalog;
pub mod config;
pub mod error;
pub mod isbn;
pub mod models;
pub mod scan;

pub use catalog::{
    lookup_entry, ApplicationId, BookCatalog, LookupError, LookupOutcome, RakutenBooksClient,
};
pub use config::Config;
pub use error::{ConfigurationError, Error, Result};
pub use isbn::{Isbn, IsbnCheck, ValidationError};
pub use models::BookRecord;
pub use scan::{
    decode_channel, DecodeEvent, ScanController, ScanEvent, ScanSession, ScreenState,
    SessionHandle, Symbology,
};
