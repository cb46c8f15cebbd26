//! Batch check command.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use console::style;

use crate::cli::progress::CheckProgress;
use crate::config::Settings;
use crate::scrapers::{HttpClient, ThreadRandom};
use crate::services::{
    default_export_path, read_identifiers, silent_log, write_results, CancelFlag, CheckPattern,
    CheckService, ExportFormat,
};

/// Arguments of `amachecker check` not covered by [`Settings`].
pub struct CheckArgs {
    pub file: PathBuf,
    pub output: Option<PathBuf>,
    pub format: ExportFormat,
    pub quiet: bool,
}

/// Check every identifier in `args.file` and write the results.
pub async fn cmd_check(settings: &Settings, args: CheckArgs) -> anyhow::Result<()> {
    let check_config = settings.check_config()?;
    // Compile first so a bad pattern never triggers a single request.
    let pattern = CheckPattern::new(&settings.pattern)?;

    let identifiers = read_identifiers(&args.file, &settings.identifier_column)?;
    println!(
        "{} Loaded {} identifiers from {}",
        style("→").cyan(),
        identifiers.len(),
        args.file.display()
    );

    let client = HttpClient::builder(settings.request_timeout())
        .accept_language(&settings.accept_language)
        .build()?;
    let service = CheckService::new(Arc::new(client), Arc::new(ThreadRandom), check_config)?;

    println!(
        "{} Checking with {} fetch / {} verify workers",
        style("→").cyan(),
        settings.fetch_workers,
        settings.verify_workers
    );

    let (progress, log) = if args.quiet {
        (CheckProgress::hidden(), silent_log())
    } else {
        let progress = CheckProgress::new(identifiers.len())?;
        let log = progress.log();
        (progress, log)
    };

    let cancel = CancelFlag::new();
    let interrupt = tokio::spawn(watch_interrupts(cancel.clone()));

    let report = service
        .run_compiled(&identifiers, &pattern, log, &cancel)
        .await;
    interrupt.abort();
    progress.finish();

    let path = args
        .output
        .unwrap_or_else(|| default_export_path(&settings.output_dir, args.format, Local::now()));
    write_results(&path, &report.results, args.format)?;

    let summary = report.summary();
    if summary.failed == 0 {
        println!("{} {}", style("✓").green(), summary);
    } else {
        println!("{} {}", style("✗").red(), summary);
    }
    println!("  {} Results: {}", style("→").dim(), path.display());

    if report.truncated {
        println!(
            "{} Check was interrupted; unchecked items are marked as cancelled",
            style("!").yellow()
        );
    }

    Ok(())
}

/// What to do when Ctrl-C arrives.
#[derive(Debug, PartialEq, Eq)]
enum InterruptAction {
    /// Stop scheduling new work and write the partial results.
    Cancel,
    /// Already cancelled once; quit without waiting.
    Exit,
}

fn on_interrupt(cancel: &CancelFlag) -> InterruptAction {
    if cancel.is_cancelled() {
        InterruptAction::Exit
    } else {
        cancel.cancel();
        InterruptAction::Cancel
    }
}

/// Listen for Ctrl-C for the whole run.
async fn watch_interrupts(cancel: CancelFlag) {
    while tokio::signal::ctrl_c().await.is_ok() {
        match on_interrupt(&cancel) {
            InterruptAction::Cancel => {
                tracing::warn!("Interrupted, finishing in-flight requests");
                eprintln!(
                    "{} Finishing in-flight requests, press Ctrl-C again to quit",
                    style("!").yellow()
                );
            }
            InterruptAction::Exit => {
                eprintln!("{} Interrupted again, exiting", style("✗").red());
                std::process::exit(130);
            }
        }
    }
}
