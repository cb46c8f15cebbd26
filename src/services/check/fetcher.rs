//! Phase one: fetch a single product page.

use std::sync::Arc;

use tracing::{debug, warn};

use super::types::{ProductUrl, ProgressLog};
use crate::models::FetchOutcome;
use crate::scrapers::{pick_user_agent, DelayRange, PageTransport, RandomSource};

/// Fetches product pages with a rotating identity and randomized pacing.
pub struct Fetcher {
    transport: Arc<dyn PageTransport>,
    random: Arc<dyn RandomSource>,
    target: ProductUrl,
    delay: DelayRange,
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn PageTransport>,
        random: Arc<dyn RandomSource>,
        target: ProductUrl,
        delay: DelayRange,
    ) -> Self {
        Self {
            transport,
            random,
            target,
            delay,
        }
    }

    /// Fetch the page for `identifier`.
    ///
    /// Transport failures come back as [`FetchOutcome::Failed`]; this never
    /// errors. The randomized pause runs after the request either way.
    pub async fn fetch(&self, identifier: &str, log: &ProgressLog) -> FetchOutcome {
        let url = self.target.url_for(identifier);
        let user_agent = pick_user_agent(self.random.as_ref());

        log(&format!("fetching {}", url));

        let outcome = match self.transport.get(&url, user_agent).await {
            Ok(response) => FetchOutcome::page(identifier, response),
            Err(e) => {
                warn!("Fetch failed for {}: {}", identifier, e);
                FetchOutcome::failed(identifier, e.to_string())
            }
        };

        let pause = self.random.delay(&self.delay);
        if !pause.is_zero() {
            debug!("Pausing {}ms after {}", pause.as_millis(), identifier);
            tokio::time::sleep(pause).await;
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::scrapers::{FetchError, FixedRandom, PageResponse, BROWSER_USER_AGENTS};

    #[derive(Default)]
    struct RecordingTransport {
        calls: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl PageTransport for RecordingTransport {
        async fn get(&self, url: &str, user_agent: &str) -> Result<PageResponse, FetchError> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), user_agent.to_string()));
            if self.fail {
                Err(FetchError::Timeout {
                    url: url.to_string(),
                    timeout: Duration::from_secs(30),
                })
            } else {
                Ok(PageResponse::new(200, "<html></html>"))
            }
        }
    }

    fn collecting_log() -> (ProgressLog, Arc<Mutex<Vec<String>>>) {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();
        let log: ProgressLog = Arc::new(move |msg: &str| sink.lock().unwrap().push(msg.to_string()));
        (log, messages)
    }

    fn fetcher(transport: Arc<RecordingTransport>) -> Fetcher {
        Fetcher::new(
            transport,
            Arc::new(FixedRandom::new(2, Duration::ZERO)),
            ProductUrl::new("https://shop.test/gp/product", "th=1").unwrap(),
            DelayRange::none(),
        )
    }

    #[tokio::test]
    async fn test_fetch_uses_template_and_pinned_identity() {
        let transport = Arc::new(RecordingTransport::default());
        let (log, messages) = collecting_log();

        let outcome = fetcher(transport.clone()).fetch("B0001", &log).await;

        assert_eq!(
            outcome,
            FetchOutcome::page("B0001", PageResponse::new(200, "<html></html>"))
        );
        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "https://shop.test/gp/product/B0001?th=1");
        assert_eq!(calls[0].1, BROWSER_USER_AGENTS[2]);
        assert_eq!(
            *messages.lock().unwrap(),
            vec!["fetching https://shop.test/gp/product/B0001?th=1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_fetch_turns_transport_error_into_outcome() {
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..Default::default()
        });
        let (log, _) = collecting_log();

        let outcome = fetcher(transport).fetch("B0002", &log).await;

        assert_eq!(
            outcome,
            FetchOutcome::failed(
                "B0002",
                "request to https://shop.test/gp/product/B0002?th=1 timed out after 30s"
            )
        );
    }

    fn pacing_fetcher(transport: Arc<RecordingTransport>) -> Fetcher {
        Fetcher::new(
            transport,
            Arc::new(FixedRandom::new(0, Duration::from_secs(5))),
            ProductUrl::new("https://shop.test/gp/product", "th=1").unwrap(),
            DelayRange::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_after_successful_fetch() {
        let transport = Arc::new(RecordingTransport::default());
        let (log, _) = collecting_log();

        let start = tokio::time::Instant::now();
        let outcome = pacing_fetcher(transport).fetch("B0003", &log).await;

        assert!(matches!(outcome, FetchOutcome::Page { .. }));
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_after_failed_fetch() {
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..Default::default()
        });
        let (log, _) = collecting_log();

        let start = tokio::time::Instant::now();
        let outcome = pacing_fetcher(transport).fetch("B0004", &log).await;

        assert!(matches!(outcome, FetchOutcome::Failed { .. }));
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_pause_does_not_sleep() {
        let transport = Arc::new(RecordingTransport::default());
        let (log, _) = collecting_log();

        let start = tokio::time::Instant::now();
        fetcher(transport).fetch("B0005", &log).await;

        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
