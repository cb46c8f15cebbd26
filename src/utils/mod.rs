//! Shared utility functions.
//!
//! - `dialect`: delimiter sniffing for marketplace exports

pub mod dialect;
