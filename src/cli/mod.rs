//! Command line interface.

mod commands;
mod progress;

pub use commands::{is_verbose, run};
