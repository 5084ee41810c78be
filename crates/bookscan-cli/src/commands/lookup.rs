//! Manual ISBN lookup

use anyhow::Result;

use bookscan_core::{isbn, lookup_entry, Config, RakutenBooksClient};

use super::with_suggestion;
use crate::output::Output;

/// Look up a typed ISBN
pub async fn lookup(config: &Config, raw: &str, output: &Output) -> Result<()> {
    // A missing credential is fatal before any request goes out
    let client = RakutenBooksClient::from_config(&config.catalog).map_err(with_suggestion)?;

    let outcome = lookup_entry(&client, raw).await.map_err(with_suggestion)?;
    output.print_outcome(&isbn::normalize(raw), &outcome);

    Ok(())
}
