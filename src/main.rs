//! chatprobe
//!
//! Runs the conformance battery against an OpenAI-compatible chat completions
//! endpoint and exits 0 only when every scenario passed

use anyhow::{Context, Result};
use chatprobe::config::{resolve_targets, Settings};
use chatprobe::services::{cancel_pair, ConsoleReporter, Reporter, RunSummary};
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// Exit status when the run could not start
const EXIT_CONFIG_ERROR: i32 = 2;

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(summary) => summary.exit_code(),
        Err(e) => {
            eprintln!("❌ {:#}", e);
            EXIT_CONFIG_ERROR
        }
    };

    std::process::exit(code);
}

async fn run() -> Result<RunSummary> {
    let settings = Settings::new().context("Failed to load probe settings")?;

    init_logging(&settings)?;
    info!("Starting {}", chatprobe::version_info());

    let targets = resolve_targets(&settings).context("Failed to resolve probe targets")?;
    info!("Probing {} target(s)", targets.len());

    let (cancel_handle, cancel) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling remaining scenarios");
            cancel_handle.cancel();
        }
    });

    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("probe_run", run_id = %run_id);
    info!(parent: &span, "Run started at {}", chrono::Utc::now().to_rfc3339());

    let mut reporter = ConsoleReporter::stdout();
    let summary = chatprobe::run_targets(&settings, &targets, cancel, &mut reporter)
        .instrument(span)
        .await?;

    if targets.len() > 1 {
        println!();
        reporter.run_finished(&summary);
    }

    Ok(summary)
}

/// Initialize logging system
///
/// Logs go to stderr so they never interleave with the report on stdout
fn init_logging(settings: &Settings) -> Result<()> {
    let log_level = settings.logging.level.as_str();

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if settings.logging.format == "json" {
        // JSON format logs (CI environment)
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(log_level)
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .finish(),
        )
    } else {
        // Human readable format
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(log_level)
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .finish(),
        )
    };

    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    info!("Logging system initialized");
    Ok(())
}
