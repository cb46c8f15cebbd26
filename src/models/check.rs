//! Per-item records flowing through the check pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::scrapers::PageResponse;

/// Reason recorded when the page came back with a non-success status.
pub const REASON_NOT_LOADED: &str = "page could not be loaded";
/// Reason recorded when the site served its bot-challenge page.
pub const REASON_BOT_DETECTED: &str = "detected as automated traffic";
/// Reason recorded when the price element is missing from the page.
pub const REASON_NO_PRICE_ELEMENT: &str = "no price element found";
/// Reason recorded for items skipped because the batch was cancelled.
pub const REASON_CANCELLED: &str = "check cancelled";

/// Result of fetching one product page.
///
/// Always carries the identifier it was fetched for, so outcomes can be
/// verified without relying on completion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The server answered (any status code).
    Page {
        identifier: String,
        response: PageResponse,
    },
    /// The request never produced a response.
    Failed { identifier: String, error: String },
}

impl FetchOutcome {
    pub fn page(identifier: impl Into<String>, response: PageResponse) -> Self {
        Self::Page {
            identifier: identifier.into(),
            response,
        }
    }

    pub fn failed(identifier: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Failed {
            identifier: identifier.into(),
            error: error.into(),
        }
    }

    /// Identifier this outcome belongs to.
    pub fn identifier(&self) -> &str {
        match self {
            Self::Page { identifier, .. } | Self::Failed { identifier, .. } => identifier,
        }
    }
}

/// Terminal verdict for one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub identifier: String,
    pub url: String,
    pub result: bool,
    /// Empty when the pattern was found or simply did not match.
    pub reason: String,
}

impl CheckResult {
    /// Pattern evaluated on the price element (match or mismatch).
    pub fn evaluated(identifier: &str, url: String, found: bool) -> Self {
        Self {
            identifier: identifier.to_string(),
            url,
            result: found,
            reason: String::new(),
        }
    }

    /// Item could not be checked for the given reason.
    pub fn failed(identifier: &str, url: String, reason: impl Into<String>) -> Self {
        Self {
            identifier: identifier.to_string(),
            url,
            result: false,
            reason: reason.into(),
        }
    }
}

/// Pass/fail counts over a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl CheckSummary {
    pub fn from_results(results: &[CheckResult]) -> Self {
        let passed = results.iter().filter(|r| r.result).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
        }
    }
}

impl fmt::Display for CheckSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} failing pages found", self.failed, self.total)
    }
}
