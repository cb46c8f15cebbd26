//! Compiled match pattern applied to the price element text.

use regex::Regex;

use super::types::CheckError;

/// Caller-supplied regular expression, compiled once per batch.
#[derive(Debug, Clone)]
pub struct CheckPattern(Regex);

impl CheckPattern {
    /// Compile `source`, failing the batch if it is not a valid regex.
    pub fn new(source: &str) -> Result<Self, CheckError> {
        Regex::new(source)
            .map(Self)
            .map_err(|source_err| CheckError::InvalidPattern {
                pattern: source.to_string(),
                source: source_err,
            })
    }

    /// Search semantics: the pattern may match anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Regex> for CheckPattern {
    fn from(regex: Regex) -> Self {
        Self(regex)
    }
}
