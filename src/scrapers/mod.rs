//! Network access for product pages.

mod http_client;
pub mod pacing;

pub use http_client::{
    pick_user_agent, FetchError, HttpClient, HttpClientBuilder, PageResponse, PageTransport,
    ACCEPT_ENCODING_VALUE, ACCEPT_LANGUAGE_VALUE, BROWSER_USER_AGENTS,
};
pub use pacing::{DelayRange, FixedRandom, RandomSource, ThreadRandom};
