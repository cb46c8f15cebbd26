//! Configuration management commands.

use std::path::Path;

use console::style;

use crate::config::Settings;

/// Show the effective settings as TOML.
pub fn cmd_config_show(settings: &Settings, source: Option<&Path>) -> anyhow::Result<()> {
    match source {
        Some(path) => eprintln!("{} Config file: {}", style("→").dim(), path.display()),
        None => eprintln!(
            "{} No config file found, using defaults",
            style("!").yellow()
        ),
    }

    if let Err(e) = settings.check_config() {
        eprintln!("{} {}", style("✗").red(), e);
    }

    print!("{}", toml::to_string_pretty(settings)?);
    Ok(())
}
