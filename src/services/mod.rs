//! Service layer module
//!
//! Contains the endpoint client, SSE decoding, scenarios, the runner and console reporting

pub mod client;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod sse;

pub use client::{ChatClient, ChunkStream, HealthStatus};
pub use report::{ConsoleReporter, NullReporter, Reporter};
pub use runner::{cancel_pair, CancelHandle, CancelSignal, Harness, RunSummary, ScenarioResult, Status, StreamLimits};
pub use scenario::{default_battery, Action, Check, Exchange, Scenario, Verdict};
pub use sse::{SseDecoder, SseFrame};
