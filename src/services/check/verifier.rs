//! Phase two: classify a fetched page and test the price element.

use scraper::{Html, Selector};
use tracing::debug;

use super::pattern::CheckPattern;
use super::types::{CheckError, ProductUrl, ProgressLog};
use crate::models::{
    CheckResult, FetchOutcome, REASON_BOT_DETECTED, REASON_NOT_LOADED, REASON_NO_PRICE_ELEMENT,
};

/// Classification of a single fetch outcome, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No response at all; carries the transport error.
    TransportFailed(String),
    /// Status outside 200..=299.
    NotLoaded { status: u16 },
    /// The site served its bot-challenge page.
    BotChallenge,
    /// The price element is not on the page.
    MissingElement,
    /// The pattern was tested against the price element text.
    Evaluated { found: bool },
}

/// Classifies fetch outcomes into check results.
pub struct Verifier {
    target: ProductUrl,
    /// Lower-cased; empty disables challenge detection.
    challenge_marker: String,
    price_selector: Selector,
}

impl Verifier {
    pub fn new(
        target: ProductUrl,
        challenge_marker: &str,
        price_selector: &str,
    ) -> Result<Self, CheckError> {
        let selector =
            Selector::parse(price_selector).map_err(|e| CheckError::InvalidSelector {
                selector: price_selector.to_string(),
                message: format!("{:?}", e),
            })?;

        Ok(Self {
            target,
            challenge_marker: challenge_marker.trim().to_lowercase(),
            price_selector: selector,
        })
    }

    pub fn target_url(&self, identifier: &str) -> String {
        self.target.url_for(identifier)
    }

    /// Classify `outcome` without side effects.
    pub fn classify(&self, outcome: &FetchOutcome, pattern: &CheckPattern) -> Verdict {
        let response = match outcome {
            FetchOutcome::Failed { error, .. } => return Verdict::TransportFailed(error.clone()),
            FetchOutcome::Page { response, .. } => response,
        };

        if !response.is_success() {
            return Verdict::NotLoaded {
                status: response.status,
            };
        }

        if !self.challenge_marker.is_empty()
            && response
                .body
                .to_lowercase()
                .contains(&self.challenge_marker)
        {
            return Verdict::BotChallenge;
        }

        let document = Html::parse_document(&response.body);
        match document.select(&self.price_selector).next() {
            None => Verdict::MissingElement,
            Some(element) => {
                let text: String = element.text().collect();
                Verdict::Evaluated {
                    found: pattern.is_match(&text),
                }
            }
        }
    }

    /// Classify `outcome`, report it on `log` and build its result record.
    pub fn verify(
        &self,
        outcome: &FetchOutcome,
        pattern: &CheckPattern,
        log: &ProgressLog,
    ) -> CheckResult {
        let identifier = outcome.identifier();
        let url = self.target_url(identifier);
        let verdict = self.classify(outcome, pattern);
        debug!("{} classified as {:?}", identifier, verdict);

        match verdict {
            Verdict::TransportFailed(error) => {
                log(&format!("{}: page could not be fetched ({})", identifier, error));
                CheckResult::failed(identifier, url, error)
            }
            Verdict::NotLoaded { status } => {
                log(&format!(
                    "{}: page could not be loaded (HTTP {})",
                    identifier, status
                ));
                CheckResult::failed(identifier, url, REASON_NOT_LOADED)
            }
            Verdict::BotChallenge => {
                log(&format!(
                    "{}: blocked, detected as automated traffic; page cannot be checked",
                    identifier
                ));
                CheckResult::failed(identifier, url, REASON_BOT_DETECTED)
            }
            Verdict::MissingElement => {
                log(&format!("{}: WARNING price element missing", identifier));
                CheckResult::failed(identifier, url, REASON_NO_PRICE_ELEMENT)
            }
            Verdict::Evaluated { found } => {
                let status = if found { "text found" } else { "text NOT found" };
                log(&format!("checked {}: {}", identifier, status));
                CheckResult::evaluated(identifier, url, found)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::scrapers::PageResponse;
    use crate::services::check::types::{
        silent_log, DEFAULT_CHALLENGE_MARKER, DEFAULT_PRICE_SELECTOR,
    };

    const UNIT_PRICE: &str = r"\d+,\d{2}€ / meter";

    fn verifier() -> Verifier {
        Verifier::new(
            ProductUrl::default(),
            DEFAULT_CHALLENGE_MARKER,
            DEFAULT_PRICE_SELECTOR,
        )
        .unwrap()
    }

    fn pattern() -> CheckPattern {
        CheckPattern::new(UNIT_PRICE).unwrap()
    }

    fn page(status: u16, body: &str) -> FetchOutcome {
        FetchOutcome::page("X1", PageResponse::new(status, body))
    }

    fn price_page(text: &str) -> String {
        format!(
            r#"<html><body><div id="apex_desktop"><span class="a-price">12,99€</span>
            <span class="a-size-small">({})</span></div></body></html>"#,
            text
        )
    }

    #[test]
    fn test_pattern_match() {
        let result = verifier().verify(&page(200, &price_page("9,99€ / meter")), &pattern(), &silent_log());
        assert_eq!(
            result,
            CheckResult {
                identifier: "X1".to_string(),
                url: "https://www.amazon.de/gp/product/X1?th=1".to_string(),
                result: true,
                reason: String::new(),
            }
        );
    }

    #[test]
    fn test_pattern_mismatch_is_not_an_error() {
        let result = verifier().verify(&page(200, &price_page("9,99€ / kg")), &pattern(), &silent_log());
        assert!(!result.result);
        assert_eq!(result.reason, "");
    }

    #[test]
    fn test_transport_failure_reason_is_error_text() {
        let outcome = FetchOutcome::failed("X3", "operation timed out");
        let result = verifier().verify(&outcome, &pattern(), &silent_log());
        assert!(!result.result);
        assert_eq!(result.reason, "operation timed out");
        assert_eq!(result.url, "https://www.amazon.de/gp/product/X3?th=1");
    }

    #[test]
    fn test_status_outside_success_range() {
        for status in [199, 300, 404, 503] {
            let result = verifier().verify(&page(status, &price_page("9,99€ / meter")), &pattern(), &silent_log());
            assert!(!result.result, "status {}", status);
            assert_eq!(result.reason, REASON_NOT_LOADED);
        }
        for status in [200, 204, 299] {
            let verdict = verifier().classify(&page(status, &price_page("9,99€ / meter")), &pattern());
            assert_eq!(verdict, Verdict::Evaluated { found: true }, "status {}", status);
        }
    }

    #[test]
    fn test_bot_challenge_case_insensitive() {
        let body = "<html><body><p>Bitte bestätigen Sie, DASS SIE KEIN BOT SIND.</p></body></html>";
        let result = verifier().verify(&page(200, body), &pattern(), &silent_log());
        assert!(!result.result);
        assert_eq!(result.reason, REASON_BOT_DETECTED);
    }

    #[test]
    fn test_bot_challenge_wins_over_price_element() {
        let body = format!("{} dass sie kein Bot sind", price_page("9,99€ / meter"));
        assert_eq!(
            verifier().classify(&page(200, &body), &pattern()),
            Verdict::BotChallenge
        );
    }

    #[test]
    fn test_status_wins_over_bot_challenge() {
        assert_eq!(
            verifier().classify(&page(503, "dass sie kein bot sind"), &pattern()),
            Verdict::NotLoaded { status: 503 }
        );
    }

    #[test]
    fn test_missing_price_element() {
        let body = r#"<html><body><div id="other">9,99€ / meter</div></body></html>"#;
        let result = verifier().verify(&page(200, body), &pattern(), &silent_log());
        assert!(!result.result);
        assert_eq!(result.reason, REASON_NO_PRICE_ELEMENT);
    }

    #[test]
    fn test_empty_marker_disables_challenge_detection() {
        let verifier = Verifier::new(ProductUrl::default(), "  ", DEFAULT_PRICE_SELECTOR).unwrap();
        assert_eq!(
            verifier.classify(&page(200, "<p>nothing</p>"), &pattern()),
            Verdict::MissingElement
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        let outcome = page(200, &price_page("9,99€ / meter"));
        let v = verifier();
        let first = v.verify(&outcome, &pattern(), &silent_log());
        for _ in 0..10 {
            assert_eq!(v.verify(&outcome, &pattern(), &silent_log()), first);
        }
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let err = Verifier::new(ProductUrl::default(), DEFAULT_CHALLENGE_MARKER, "##").err();
        assert!(matches!(err, Some(CheckError::InvalidSelector { .. })));
    }

    #[test]
    fn test_verify_logs_one_message() {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();
        let log: ProgressLog = Arc::new(move |m: &str| sink.lock().unwrap().push(m.to_string()));

        verifier().verify(&page(200, &price_page("9,99€ / meter")), &pattern(), &log);

        assert_eq!(*messages.lock().unwrap(), vec!["checked X1: text found".to_string()]);
    }
}
