//! Product URL lookup command.

use crate::config::Settings;
use crate::services::ProductUrl;

/// Print the product URL of each identifier, one per line.
pub fn cmd_url(settings: &Settings, identifiers: &[String]) -> anyhow::Result<()> {
    let target = ProductUrl::new(&settings.base_url, &settings.query)?;
    for identifier in identifiers {
        println!("{}", target.url_for(identifier.trim()));
    }
    Ok(())
}
