//! Terminal progress display for check runs.

use std::sync::Arc;

use chrono::Local;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::services::ProgressLog;

/// Progress bar fed by the check service's progress messages.
///
/// Every item produces one message while fetching and one while verifying,
/// so the bar counts two steps per identifier. The closing summary line is
/// printed but not counted.
pub struct CheckProgress {
    bar: ProgressBar,
    items: u64,
}

impl CheckProgress {
    pub fn new(items: usize) -> anyhow::Result<Self> {
        Self::with_target(items, ProgressDrawTarget::stderr())
    }

    /// Hidden display for non-interactive runs.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            items: 0,
        }
    }

    fn with_target(items: usize, target: ProgressDrawTarget) -> anyhow::Result<Self> {
        let items = items as u64;
        let bar = ProgressBar::with_draw_target(Some(items.saturating_mul(2)), target);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        bar.set_message("fetching");
        Ok(Self { bar, items })
    }

    /// Progress callback printing timestamped lines above the bar.
    pub fn log(&self) -> ProgressLog {
        let bar = self.bar.clone();
        let items = self.items;
        Arc::new(move |message: &str| {
            bar.println(format!("[{}] {}", Local::now().format("%H:%M:%S"), message));
            if bar.position() < items * 2 {
                bar.inc(1);
            }
            if bar.position() == items {
                bar.set_message("verifying");
            }
        })
    }

    fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Complete the bar; cancelled items never report, so jump to the end.
    pub fn finish(&self) {
        self.bar.set_position(self.items * 2);
        self.bar.finish_and_clear();
    }
}
