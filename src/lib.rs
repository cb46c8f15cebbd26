//! AmaChecker - product page price-per-unit checker.
//!
//! Fetches marketplace product pages concurrently, then verifies that each
//! page shows a price-per-unit text matching a configurable pattern.

pub mod cli;
pub mod config;
pub mod models;
pub mod scrapers;
pub mod services;
pub mod utils;
