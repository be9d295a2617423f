//! Sift application binary - composition root.
//!
//! 1. Load configuration from TOML
//! 2. Load the handler document and build live handlers
//! 3. Register cron handlers with the scheduler
//! 4. Feed captures from stdin through the capture gate into the orchestrator
//!
//! The one-shot subcommands (`dispatch`, `trigger`, `list`, `enable`,
//! `disable`) share the same composition and exit when done.

mod cli;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use sift_action::{
    ActionRegistry, AttemptOutcome, CronScheduler, DispatchEnv, DispatchSummary,
    HandlerTypeRegistry, HeadlessUi, Orchestrator, UiBridge,
};
use sift_capture::{CaptureError, CaptureGate, QueuedCaptureService};
use sift_core::config::SiftConfig;
use sift_core::store::HandlerStore;
use sift_core::types::CapturedInput;

use crate::cli::{CliArgs, Command};

/// Prefix marking a stdin line as a file selection.
const FILES_PREFIX: &str = "files:";

/// Turn one stdin line into a capture.
///
/// `files:/a.txt;/b.txt` becomes a file selection; anything else is text.
/// Blank lines yield nothing.
fn parse_capture_line(line: &str) -> Option<CapturedInput> {
    if line.trim().is_empty() {
        return None;
    }
    match line.strip_prefix(FILES_PREFIX) {
        Some(rest) => {
            let paths: Vec<PathBuf> = rest
                .split(';')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .collect();
            if paths.is_empty() {
                None
            } else {
                Some(CapturedInput::files(paths))
            }
        }
        None => Some(CapturedInput::text(line)),
    }
}

fn print_summary(summary: &DispatchSummary) {
    println!(
        "{} of {} handler(s) processed the input in {} ms",
        summary.processed.len(),
        summary.attempted,
        summary.elapsed_ms
    );
    for name in &summary.processed {
        println!("  processed  {}", name);
    }
    for failed in &summary.failed {
        println!("  failed     {}: {}", failed.handler, failed.error);
    }
}

/// Forward stdin lines into the capture queue until EOF.
async fn stdin_feeder(sender: mpsc::Sender<CapturedInput>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Some(input) = parse_capture_line(&line) else {
                    continue;
                };
                if sender.send(input).await.is_err() {
                    return;
                }
            }
            Ok(None) => {
                tracing::info!("Stdin closed; no further captures");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stdin");
                return;
            }
        }
    }
}

/// Capture loop: one gated capture at a time, each dispatched to the orchestrator.
async fn capture_loop(orchestrator: Arc<Orchestrator>, trim_whitespace: bool) {
    let (sender, service) = QueuedCaptureService::channel(16);
    tokio::spawn(stdin_feeder(sender));

    let gate = CaptureGate::new(service).with_trim(trim_whitespace);
    tracing::info!("Capture loop started; reading selections from stdin");

    loop {
        match gate.trigger().await {
            Ok(input) => {
                let summary = orchestrator.dispatch(input).await;
                print_summary(&summary);
            }
            Err(CaptureError::Closed) => break,
            Err(e) => tracing::warn!(error = %e, "Capture skipped"),
        }
    }
    tracing::info!(
        captured = gate.captured(),
        rejected = gate.rejected(),
        "Capture loop stopped"
    );
}

async fn run(orchestrator: Arc<Orchestrator>, config: &SiftConfig) {
    let scheduler = if config.scheduler.enabled {
        let scheduler = Arc::new(CronScheduler::new(
            orchestrator.clone(),
            Duration::from_secs(config.scheduler.tick_seconds.max(1)),
        ));
        let registered = orchestrator.register_cron_jobs(&scheduler);
        tracing::info!(registered, "Cron jobs registered");
        let ticking = Arc::clone(&scheduler);
        tokio::spawn(async move { ticking.run().await });
        Some(scheduler)
    } else {
        tracing::info!("Cron scheduler disabled in config");
        None
    };

    tokio::select! {
        _ = capture_loop(Arc::clone(&orchestrator), config.capture.trim_whitespace) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupt received; shutting down");
        }
    }

    if let Some(scheduler) = scheduler {
        scheduler.shutdown();
    }
}

fn list(orchestrator: &Orchestrator) {
    println!("Automatic handlers:");
    for name in orchestrator.automatic_names() {
        println!("  {}", name);
    }
    println!("Triggered handlers:");
    for name in orchestrator.triggered_names() {
        println!("  {}", name);
    }
    println!("Actions:");
    for name in orchestrator.env().actions.names() {
        println!("  {}", name);
    }
    println!("Handler types:");
    for name in orchestrator.types().type_names() {
        println!("  {}", name);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config = SiftConfig::load_or_default(&config_file);

    // Tracing.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .init();

    tracing::info!("Starting Sift v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    // Handler document.
    let handlers_path = args.resolve_handlers_path(config.handlers_path());
    let store = Arc::new(HandlerStore::load(&handlers_path)?);

    // Dispatch environment.
    let ui = UiBridge::from_config(
        Arc::new(HeadlessUi::new(config.dispatch.auto_confirm)),
        &config.dispatch,
    );
    let mut actions = ActionRegistry::new();
    actions.register_defaults(ui.clone());
    let env = DispatchEnv::new(Arc::new(actions), ui);

    let types = Arc::new(HandlerTypeRegistry::with_builtins());
    let orchestrator = Arc::new(Orchestrator::new(types, env).with_store(Arc::clone(&store)));
    let report = orchestrator.reload()?;
    for (name, error) in &report.failed {
        tracing::warn!(handler = %name, error = %error, "Handler not loaded");
    }

    match args.command() {
        Command::Run => run(orchestrator, &config).await,
        Command::Dispatch { text } => {
            let summary = orchestrator.dispatch(CapturedInput::text(text)).await;
            print_summary(&summary);
        }
        Command::Trigger { name } => match orchestrator.trigger_manual(&name).await? {
            AttemptOutcome::Processed(report) => println!(
                "'{}' processed: {} action(s) executed, {} failed",
                report.handler,
                report.executed(),
                report.failed()
            ),
            AttemptOutcome::Skipped => println!("'{}' did not match its input", name),
        },
        Command::List => list(&orchestrator),
        Command::Enable { name } => {
            orchestrator.set_handler_enabled(&name, true)?;
            println!("Enabled '{}' in {}", name, store.path().display());
        }
        Command::Disable { name } => {
            orchestrator.set_handler_enabled(&name, false)?;
            println!("Disabled '{}' in {}", name, store.path().display());
        }
    }

    Ok(())
}
