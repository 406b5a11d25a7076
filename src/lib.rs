//! chatprobe library
//!
//! Conformance harness for OpenAI-compatible chat completion endpoints

pub mod config;
pub mod models;
pub mod services;
pub mod utils;

// Re-export common types
pub use config::{Settings, Target};
pub use models::openai;
pub use services::{ChatClient, ConsoleReporter, Harness, RunSummary, Scenario, ScenarioResult, StreamLimits};
pub use utils::error::{FailureKind, ProbeError, ProbeResult};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get version information
pub fn version_info() -> String {
    format!("{} v{} - {}", NAME, VERSION, DESCRIPTION)
}

/// Run the battery against every target, one after another
///
/// A target whose client cannot be built ends the run with
/// [`ProbeError::Config`] before any of its scenarios are sent.
pub async fn run_targets(
    settings: &Settings,
    targets: &[Target],
    cancel: services::CancelSignal,
    reporter: &mut dyn services::Reporter,
) -> ProbeResult<RunSummary> {
    let limits = StreamLimits {
        deadline: settings.stream_timeout(),
        idle: settings.stream_idle_timeout(),
    };

    let mut overall = RunSummary::default();
    for target in targets {
        let client = ChatClient::new(&target.base_url, &target.api_key, settings.request_timeout())?;
        let harness = Harness::new(client, limits).with_cancel(cancel.clone());

        let mut scenarios = Vec::new();
        if settings.run.health_check {
            scenarios.push(Scenario::health());
        }
        if settings.run.models_check {
            scenarios.push(Scenario::models(&target.model));
        }
        scenarios.extend(services::default_battery(&target.model));

        reporter.run_started(target);
        let summary = harness.run_all(&scenarios, reporter).await;
        reporter.run_finished(&summary);

        overall.merge(summary);
    }

    Ok(overall)
}
