//! Rakuten Books catalog client
//!
//! Queries the book search endpoint by ISBN and maps the first hit into a
//! `BookRecord`.

use std::fmt;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{BookCatalog, LookupError, LookupOutcome};
use crate::config::CatalogConfig;
use crate::error::ConfigurationError;
use crate::isbn::Isbn;
use crate::models::{non_blank, BookRecord};

/// Book search endpoint used when none is configured
pub const DEFAULT_ENDPOINT: &str = "https://app.rakuten.co.jp/services/api/BooksBook/Search/20170404";

/// User agent sent with every catalog request
const USER_AGENT: &str = concat!("bookscan/", env!("CARGO_PKG_VERSION"));

/// Leading characters shown by `ApplicationId`'s `Display`
const HINT_LEN: usize = 4;

/// Shorter credentials are masked entirely
const MIN_LEN_FOR_HINT: usize = 8;

/// Catalog credential
///
/// Never printed in full; `Debug` and `Display` are redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct ApplicationId(String);

impl ApplicationId {
    /// Wrap a credential, rejecting blank values
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigurationError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(ConfigurationError::MissingApplicationId);
        }
        Ok(Self(value))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApplicationId(***)")
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.chars().count() < MIN_LEN_FOR_HINT {
            return f.write_str("***");
        }
        let visible: String = self.0.chars().take(HINT_LEN).collect();
        write!(f, "{}***", visible)
    }
}

/// HTTP client for the Rakuten Books search API
#[derive(Debug, Clone)]
pub struct RakutenBooksClient {
    http: reqwest::Client,
    endpoint: Url,
    application_id: ApplicationId,
}

impl RakutenBooksClient {
    /// Create a client against the default endpoint
    pub fn new(application_id: ApplicationId) -> Self {
        let endpoint = Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL");
        Self::build(application_id, endpoint)
    }

    /// Create a client against a custom endpoint
    pub fn with_endpoint(
        application_id: ApplicationId,
        endpoint: &str,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self::build(application_id, parse_endpoint(endpoint)?))
    }

    /// Create a client from configuration
    ///
    /// Fails before any request is made when the credential is missing.
    pub fn from_config(config: &CatalogConfig) -> Result<Self, ConfigurationError> {
        let application_id = config.application_id()?;
        Self::with_endpoint(application_id, &config.endpoint)
    }

    fn build(application_id: ApplicationId, endpoint: Url) -> Self {
        let http = match reqwest::Client::builder().user_agent(USER_AGENT).build() {
            Ok(http) => http,
            Err(e) => {
                warn!("Could not configure catalog HTTP client, using defaults: {}", e);
                reqwest::Client::new()
            }
        };

        Self {
            http,
            endpoint,
            application_id,
        }
    }

    /// Full request URL for an ISBN
    pub fn request_url(&self, isbn: &Isbn) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("isbnjan", isbn.as_str())
            .append_pair("applicationId", self.application_id.expose())
            .append_pair("format", "json");
        url
    }
}

#[async_trait]
impl BookCatalog for RakutenBooksClient {
    async fn lookup(&self, isbn: &Isbn) -> Result<LookupOutcome, LookupError> {
        debug!(%isbn, endpoint = %self.endpoint, "Querying catalog");

        let response = self
            .http
            .get(self.request_url(isbn))
            .send()
            .await
            .map_err(|source| {
                // The request URL carries the credential
                let source = source.without_url();
                warn!(%isbn, "Catalog request failed: {}", source);
                LookupError::Transport {
                    isbn: isbn.to_string(),
                    source,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%isbn, status = status.as_u16(), "Catalog returned an error status");
            return Err(LookupError::Status {
                isbn: isbn.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| LookupError::Transport {
                isbn: isbn.to_string(),
                source: source.without_url(),
            })?;

        let outcome = parse_search_response(isbn, &body)?;
        match &outcome {
            LookupOutcome::Found(book) => info!(%isbn, title = %book.title, "Catalog match"),
            LookupOutcome::NotFound => info!(%isbn, "No catalog match"),
        }
        Ok(outcome)
    }
}

/// Parse a catalog endpoint, accepting only absolute http(s) URLs
pub fn parse_endpoint(endpoint: &str) -> Result<Url, ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "Items", default)]
    items: Option<Vec<SearchHit>>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "Item", default)]
    item: CatalogItem,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogItem {
    title: Option<String>,
    author: Option<String>,
    publisher_name: Option<String>,
    sales_date: Option<String>,
    item_caption: Option<String>,
    large_image_url: Option<String>,
}

/// Map a search response body to a lookup outcome
fn parse_search_response(isbn: &Isbn, body: &str) -> Result<LookupOutcome, LookupError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|source| LookupError::Decode {
            isbn: isbn.to_string(),
            source,
        })?;

    let Some(hit) = response.items.unwrap_or_default().into_iter().next() else {
        return Ok(LookupOutcome::NotFound);
    };

    let item = hit.item;
    let mut book = BookRecord::new(isbn.clone());
    book.set_title(item.title.as_deref());
    book.set_author(item.author.as_deref());
    book.publisher = non_blank(item.publisher_name);
    book.published_date = non_blank(item.sales_date);
    book.description = non_blank(item.item_caption);
    book.thumbnail_url = non_blank(item.large_image_url);

    Ok(LookupOutcome::Found(book))
}
