//! Read product identifiers from a marketplace export file.

use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::utils::dialect::sniff_delimiter;

/// Default column name fragment identifying the identifier column.
pub const DEFAULT_COLUMN_NEEDLE: &str = "asin";

/// Bytes inspected when guessing the delimiter.
const SNIFF_BYTES: usize = 4096;

/// Errors that can occur while importing identifiers.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("{0} is empty")]
    Empty(String),

    #[error("failed to parse export: {0}")]
    Parse(#[from] csv::Error),

    #[error("no column containing '{needle}' with values found")]
    NoIdentifierColumn { needle: String },
}

/// Read identifiers from the first column whose header contains `needle`.
pub fn read_identifiers(path: &Path, needle: &str) -> Result<Vec<String>, ImportError> {
    let io_err = |source: std::io::Error| ImportError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut bytes = Vec::new();
    std::fs::File::open(path)
        .and_then(|mut f| f.read_to_end(&mut bytes))
        .map_err(io_err)?;

    let text = String::from_utf8_lossy(&bytes);
    if text.trim().is_empty() {
        return Err(ImportError::Empty(path.display().to_string()));
    }

    parse_identifiers(&text, needle)
}

/// Parse identifiers out of delimited `text`.
pub fn parse_identifiers(text: &str, needle: &str) -> Result<Vec<String>, ImportError> {
    let text = text.trim_start_matches('\u{feff}');
    let sample_end = text
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| i >= SNIFF_BYTES)
        .unwrap_or(text.len());
    let delimiter = sniff_delimiter(&text[..sample_end]);
    debug!("Sniffed delimiter {:?}", delimiter);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .from_reader(text.as_bytes());
    let header = reader.headers()?.clone();
    let rows = reader
        .records()
        .collect::<Result<Vec<csv::StringRecord>, csv::Error>>()?;

    let needle = needle.to_lowercase();
    for (index, name) in header.iter().enumerate() {
        if !name.to_lowercase().contains(&needle) {
            continue;
        }

        let values: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get(index))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();

        if !values.is_empty() {
            debug!("Using column '{}' ({} identifiers)", name.trim(), values.len());
            return Ok(values);
        }
    }

    Err(ImportError::NoIdentifierColumn { needle })
}
