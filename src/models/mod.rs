//! Data models for AmaChecker.

mod check;

pub use check::{
    CheckResult, CheckSummary, FetchOutcome, REASON_BOT_DETECTED, REASON_CANCELLED,
    REASON_NOT_LOADED, REASON_NO_PRICE_ELEMENT,
};
