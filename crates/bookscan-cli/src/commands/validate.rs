//! ISBN validation command

use anyhow::{bail, Result};

use bookscan_core::Isbn;

use crate::output::Output;

/// Validate each input, failing if any is not an ISBN-13
pub fn validate(inputs: &[String], output: &Output) -> Result<()> {
    let results: Vec<_> = inputs
        .iter()
        .map(|raw| (raw.as_str(), Isbn::parse(raw)))
        .collect();

    output.print_validation(&results);

    let invalid = results.iter().filter(|(_, result)| result.is_err()).count();
    if invalid > 0 {
        bail!("{} of {} value(s) are not valid ISBN-13s", invalid, results.len());
    }

    Ok(())
}
