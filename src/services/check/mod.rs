//! Product page check service.
//!
//! Runs a batch in two phases separated by a barrier: every page is fetched
//! on a bounded pool of async workers, then every outcome is verified on a
//! bounded pool of blocking workers. Results are slotted by input position,
//! so each identifier yields exactly one record regardless of completion
//! order.

mod fetcher;
mod pattern;
mod types;
mod verifier;

pub use fetcher::Fetcher;
pub use pattern::CheckPattern;
pub use types::{
    silent_log, BatchReport, CancelFlag, CheckConfig, CheckError, ProductUrl, ProgressLog,
    DEFAULT_BASE_URL, DEFAULT_CHALLENGE_MARKER, DEFAULT_PRICE_SELECTOR, DEFAULT_QUERY,
    DEFAULT_WORKERS,
};
pub use verifier::{Verdict, Verifier};

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::models::{CheckResult, FetchOutcome, REASON_CANCELLED};
use crate::scrapers::{PageTransport, RandomSource};

/// Service checking batches of product identifiers.
pub struct CheckService {
    fetcher: Arc<Fetcher>,
    verifier: Arc<Verifier>,
    target: ProductUrl,
    fetch_workers: usize,
    verify_workers: usize,
}

impl CheckService {
    /// Create a new check service.
    pub fn new(
        transport: Arc<dyn PageTransport>,
        random: Arc<dyn RandomSource>,
        config: CheckConfig,
    ) -> Result<Self, CheckError> {
        let verifier = Verifier::new(
            config.target.clone(),
            &config.challenge_marker,
            &config.price_selector,
        )?;
        let fetcher = Fetcher::new(transport, random, config.target.clone(), config.delay);

        Ok(Self {
            fetcher: Arc::new(fetcher),
            verifier: Arc::new(verifier),
            target: config.target,
            fetch_workers: config.fetch_workers.max(1),
            verify_workers: config.verify_workers.max(1),
        })
    }

    /// Product URL for `identifier`.
    pub fn url_for(&self, identifier: &str) -> String {
        self.target.url_for(identifier)
    }

    /// Check every identifier against `pattern`.
    ///
    /// Fails only if `pattern` does not compile, in which case nothing is
    /// fetched. Returns one result per identifier, in input order.
    pub async fn run(
        &self,
        identifiers: &[String],
        pattern: &str,
        log: ProgressLog,
    ) -> Result<Vec<CheckResult>, CheckError> {
        let report = self
            .run_with_cancel(identifiers, pattern, log, &CancelFlag::new())
            .await?;
        Ok(report.results)
    }

    /// Like [`run`](Self::run), stopping early once `cancel` is set.
    pub async fn run_with_cancel(
        &self,
        identifiers: &[String],
        pattern: &str,
        log: ProgressLog,
        cancel: &CancelFlag,
    ) -> Result<BatchReport, CheckError> {
        let pattern = CheckPattern::new(pattern)?;
        Ok(self.run_compiled(identifiers, &pattern, log, cancel).await)
    }

    /// Run a batch with an already compiled pattern.
    pub async fn run_compiled(
        &self,
        identifiers: &[String],
        pattern: &CheckPattern,
        log: ProgressLog,
        cancel: &CancelFlag,
    ) -> BatchReport {
        if identifiers.is_empty() {
            return BatchReport::default();
        }

        let start = Instant::now();
        let outcomes = self.fetch_all(identifiers, &log, cancel).await;
        info!(
            "Fetched {} pages in {:.1}s using up to {} workers",
            outcomes.iter().filter(|o| o.is_some()).count(),
            start.elapsed().as_secs_f64(),
            self.fetch_workers
        );

        let start = Instant::now();
        let results = self
            .verify_all(identifiers, outcomes, pattern, &log, cancel)
            .await;
        info!(
            "Verified {} pages in {:.1}s",
            results.len(),
            start.elapsed().as_secs_f64()
        );

        let skipped = results
            .iter()
            .filter(|r| r.reason == REASON_CANCELLED)
            .count();
        if skipped > 0 {
            warn!("Batch cancelled, {} of {} items unchecked", skipped, results.len());
        }

        let report = BatchReport {
            results,
            truncated: skipped > 0,
        };
        log(&report.summary().to_string());
        report
    }

    /// Phase one. Slot `i` holds the outcome for `identifiers[i]`, or `None`
    /// if cancellation skipped it.
    async fn fetch_all(
        &self,
        identifiers: &[String],
        log: &ProgressLog,
        cancel: &CancelFlag,
    ) -> Vec<Option<FetchOutcome>> {
        let semaphore = Arc::new(Semaphore::new(self.fetch_workers));
        let mut handles = Vec::with_capacity(identifiers.len());

        for identifier in identifiers {
            let fetcher = self.fetcher.clone();
            let semaphore = semaphore.clone();
            let log = log.clone();
            let cancel = cancel.clone();
            let identifier = identifier.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                if cancel.is_cancelled() {
                    return None;
                }
                Some(fetcher.fetch(&identifier, &log).await)
            }));
        }

        join_all(handles)
            .await
            .into_iter()
            .zip(identifiers)
            .map(|(joined, identifier)| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Fetch worker for {} failed: {}", identifier, e);
                    Some(FetchOutcome::failed(
                        identifier.as_str(),
                        format!("fetch worker failed: {}", e),
                    ))
                }
            })
            .collect()
    }

    /// Phase two. Runs only after every fetch has finished.
    async fn verify_all(
        &self,
        identifiers: &[String],
        outcomes: Vec<Option<FetchOutcome>>,
        pattern: &CheckPattern,
        log: &ProgressLog,
        cancel: &CancelFlag,
    ) -> Vec<CheckResult> {
        let semaphore = Arc::new(Semaphore::new(self.verify_workers));
        let mut handles = Vec::with_capacity(outcomes.len());

        for slot in outcomes {
            let verifier = self.verifier.clone();
            let semaphore = semaphore.clone();
            let pattern = pattern.clone();
            let log = log.clone();
            let cancel = cancel.clone();

            handles.push(tokio::spawn(async move {
                let outcome = slot?;
                let _permit = semaphore.acquire_owned().await.ok()?;
                if cancel.is_cancelled() {
                    return None;
                }
                let identifier = outcome.identifier().to_string();
                let url = verifier.target_url(&identifier);
                let verified =
                    tokio::task::spawn_blocking(move || verifier.verify(&outcome, &pattern, &log))
                        .await;
                Some(verified.unwrap_or_else(|e| {
                    warn!("Verify worker for {} failed: {}", identifier, e);
                    CheckResult::failed(&identifier, url, format!("verify worker failed: {}", e))
                }))
            }));
        }

        join_all(handles)
            .await
            .into_iter()
            .zip(identifiers)
            .map(|(joined, identifier)| match joined {
                Ok(Some(result)) => result,
                Ok(None) => CheckResult::failed(identifier, self.url_for(identifier), REASON_CANCELLED),
                Err(e) => {
                    warn!("Verify task for {} failed: {}", identifier, e);
                    CheckResult::failed(
                        identifier,
                        self.url_for(identifier),
                        format!("verify worker failed: {}", e),
                    )
                }
            })
            .collect()
    }
}
