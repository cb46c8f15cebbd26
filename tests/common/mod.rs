//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use amachecker::scrapers::{FetchError, PageResponse, PageTransport};
use amachecker::services::{CheckConfig, ProductUrl, ProgressLog};
use amachecker::scrapers::DelayRange;

pub const BASE: &str = "https://shop.test/gp/product";

/// Scripted reply for one URL.
#[derive(Clone)]
pub enum Reply {
    Page(u16, String),
    Error(String),
    /// Fail the way the HTTP client reports an elapsed request timeout.
    Timeout(Duration),
    /// Respond after sleeping, to shuffle completion order.
    Slow(Duration, u16, String),
}

/// In-memory transport answering from a URL table.
#[derive(Default)]
pub struct FakeTransport {
    replies: HashMap<String, Reply>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    user_agents: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, identifier: &str, reply: Reply) -> Self {
        self.replies.insert(url_for(identifier), reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of requests observed in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn user_agents(&self) -> Vec<String> {
        self.user_agents.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageTransport for FakeTransport {
    async fn get(&self, url: &str, user_agent: &str) -> Result<PageResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.user_agents.lock().unwrap().push(user_agent.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let reply = match self.replies.get(url) {
            Some(Reply::Page(status, body)) => Ok(PageResponse::new(*status, body.clone())),
            Some(Reply::Slow(delay, status, body)) => {
                tokio::time::sleep(*delay).await;
                Ok(PageResponse::new(*status, body.clone()))
            }
            Some(Reply::Timeout(timeout)) => Err(FetchError::Timeout {
                url: url.to_string(),
                timeout: *timeout,
            }),
            Some(Reply::Error(message)) => Err(FetchError::Request {
                url: url.to_string(),
                message: message.clone(),
            }),
            None => Ok(PageResponse::new(404, "not found")),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }
}

pub fn url_for(identifier: &str) -> String {
    format!("{}/{}?th=1", BASE, identifier)
}

/// Service configuration pointing at [`BASE`] with no pacing.
pub fn config(workers: usize) -> CheckConfig {
    CheckConfig {
        target: ProductUrl::new(BASE, "th=1").unwrap(),
        delay: DelayRange::none(),
        fetch_workers: workers,
        verify_workers: workers,
        ..CheckConfig::default()
    }
}

/// Product page with the given price-per-unit text.
pub fn price_page(text: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><body>
        <div id="apex_desktop"><span class="a-price">12,99€</span>
        <span class="a-size-mini">({})</span></div>
        </body></html>"#,
        text
    )
}

pub fn challenge_page() -> String {
    "<html><body><h4>Geben Sie die Zeichen unten ein</h4>\
     <p>Wir müssen sicherstellen, dass Sie kein Bot sind.</p></body></html>"
        .to_string()
}

/// Progress log collecting every message.
pub fn recording_log() -> (ProgressLog, Arc<Mutex<Vec<String>>>) {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    let log: ProgressLog = Arc::new(move |m: &str| sink.lock().unwrap().push(m.to_string()));
    (log, messages)
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
