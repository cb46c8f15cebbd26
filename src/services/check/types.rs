//! Check service configuration, errors and report types.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::models::{CheckResult, CheckSummary};
use crate::scrapers::DelayRange;

/// Default product page base URL.
pub const DEFAULT_BASE_URL: &str = "https://www.amazon.de/gp/product";
/// Default query string appended to every product URL.
pub const DEFAULT_QUERY: &str = "th=1";
/// Default phrase identifying the bot-challenge page.
pub const DEFAULT_CHALLENGE_MARKER: &str = "dass sie kein bot sind";
/// Default selector of the price-per-unit element.
pub const DEFAULT_PRICE_SELECTOR: &str = "#apex_desktop";
/// Default worker cap for each phase.
pub const DEFAULT_WORKERS: usize = 100;

/// Callback receiving human-readable progress messages.
///
/// Called concurrently from fetch and verify workers; implementations must
/// be safe to share across threads.
pub type ProgressLog = Arc<dyn Fn(&str) + Send + Sync>;

/// A progress log that discards every message.
pub fn silent_log() -> ProgressLog {
    Arc::new(|_: &str| {})
}

/// Errors that abort a whole batch before any page is fetched.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("invalid price selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("invalid product base URL '{base}': {source}")]
    InvalidBaseUrl {
        base: String,
        source: url::ParseError,
    },
}

/// Template turning an identifier into its product page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductUrl {
    base: String,
    query: String,
}

impl ProductUrl {
    pub fn new(base: &str, query: &str) -> Result<Self, CheckError> {
        url::Url::parse(base).map_err(|source| CheckError::InvalidBaseUrl {
            base: base.to_string(),
            source,
        })?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            query: query.trim_start_matches('?').to_string(),
        })
    }

    /// `<base>/<identifier>?<query>`
    pub fn url_for(&self, identifier: &str) -> String {
        if self.query.is_empty() {
            format!("{}/{}", self.base, identifier)
        } else {
            format!("{}/{}?{}", self.base, identifier, self.query)
        }
    }
}

impl Default for ProductUrl {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_URL.to_string(),
            query: DEFAULT_QUERY.to_string(),
        }
    }
}

/// Configuration for the check service.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    pub target: ProductUrl,
    pub delay: DelayRange,
    pub fetch_workers: usize,
    pub verify_workers: usize,
    pub challenge_marker: String,
    pub price_selector: String,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            target: ProductUrl::default(),
            delay: DelayRange::default(),
            fetch_workers: DEFAULT_WORKERS,
            verify_workers: DEFAULT_WORKERS,
            challenge_marker: DEFAULT_CHALLENGE_MARKER.to_string(),
            price_selector: DEFAULT_PRICE_SELECTOR.to_string(),
        }
    }
}

/// Cooperative cancellation shared between the caller and the workers.
///
/// Checked between the phases and before each fetch or verify task starts.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Results of a batch, one per input identifier in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub results: Vec<CheckResult>,
    /// Set when cancellation left some items unchecked.
    pub truncated: bool,
}

impl BatchReport {
    pub fn summary(&self) -> CheckSummary {
        CheckSummary::from_results(&self.results)
    }
}
