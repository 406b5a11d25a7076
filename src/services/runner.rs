//! Scenario runner
//!
//! Runs scenarios one after another against a single client. Every scenario
//! ends in an explicit [`ScenarioResult`]; errors never escape a scenario.

use crate::models::openai::{OpenAIRequest, OpenAIStreamResponse};
use crate::services::client::ChatClient;
use crate::services::report::Reporter;
use crate::services::scenario::{Action, Exchange, Scenario, Verdict};
use crate::utils::error::{helpers, FailureKind, ProbeError, ProbeResult};
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// Bounds on one streamed exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamLimits {
    /// Overall deadline, from sending the request to the last chunk
    pub deadline: Duration,
    /// Maximum gap between two chunks
    pub idle: Duration,
}

impl Default for StreamLimits {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(300),
            idle: Duration::from_secs(60),
        }
    }
}

/// Sender half of a run's cancellation signal
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Receiver half of a run's cancellation signal
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Create a connected cancellation handle and signal
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelHandle {
    /// Request cancellation of the run
    pub fn cancel(&self) {
        // Receivers may all be gone already
        let _ = self.tx.send(true);
    }
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        cancel_pair().1
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Handle dropped without cancelling
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Pass/fail status of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "kind", rename_all = "snake_case")]
pub enum Status {
    Passed,
    Failed(FailureKind),
}

/// Result of one scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    pub status: Status,
    /// Why the scenario failed
    pub diagnostic: Option<String>,
    /// Advisory findings that did not fail the scenario
    pub warnings: Vec<String>,
    /// What the endpoint returned, when an exchange completed
    pub exchange: Option<Exchange>,
}

impl ScenarioResult {
    pub fn passed(&self) -> bool {
        self.status == Status::Passed
    }

    fn from_error(name: &str, err: &ProbeError) -> Self {
        Self {
            name: name.to_string(),
            status: Status::Failed(err.kind()),
            diagnostic: Some(err.to_string()),
            warnings: Vec::new(),
            exchange: None,
        }
    }

    fn from_verdicts(name: &str, exchange: Exchange, verdicts: Vec<Verdict>) -> Self {
        let mut failures = Vec::new();
        let mut warnings = Vec::new();
        for verdict in verdicts {
            match verdict {
                Verdict::Pass => {}
                Verdict::Warn(msg) => warnings.push(msg),
                Verdict::Fail(msg) => failures.push(msg),
            }
        }

        let (status, diagnostic) = if failures.is_empty() {
            (Status::Passed, None)
        } else {
            let err = helpers::assertion_error(failures.join("; "));
            (Status::Failed(err.kind()), Some(err.to_string()))
        };

        Self {
            name: name.to_string(),
            status,
            diagnostic,
            warnings,
            exchange: Some(exchange),
        }
    }
}

/// Aggregated results of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub results: Vec<ScenarioResult>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(ScenarioResult::passed)
    }

    /// Process exit status: 0 only if every scenario passed
    pub fn exit_code(&self) -> i32 {
        if self.all_passed() {
            0
        } else {
            1
        }
    }

    pub fn merge(&mut self, other: RunSummary) {
        self.results.extend(other.results);
    }
}

enum StreamStep {
    Item(Option<ProbeResult<OpenAIStreamResponse>>),
    Idle,
    Deadline,
    Cancelled,
}

/// Drives scenarios against one endpoint
#[derive(Debug, Clone)]
pub struct Harness {
    client: ChatClient,
    limits: StreamLimits,
    cancel: CancelSignal,
}

impl Harness {
    pub fn new(client: ChatClient, limits: StreamLimits) -> Self {
        Self {
            client,
            limits,
            cancel: CancelSignal::never(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run scenarios sequentially; a failure never stops the run
    pub async fn run_all(&self, scenarios: &[Scenario], reporter: &mut dyn Reporter) -> RunSummary {
        let mut summary = RunSummary::default();
        for scenario in scenarios {
            summary.results.push(self.run_scenario(scenario, reporter).await);
        }
        info!("Run finished: {}/{} passed", summary.passed(), summary.total());
        summary
    }

    /// Run one scenario and report it
    pub async fn run_scenario(&self, scenario: &Scenario, reporter: &mut dyn Reporter) -> ScenarioResult {
        reporter.scenario_started(scenario);

        let result = if self.cancel.is_cancelled() {
            ScenarioResult::from_error(&scenario.name, &ProbeError::Cancelled)
        } else {
            let started = Instant::now();
            let outcome = match &scenario.action {
                Action::Chat(request) if request.stream => self.exchange_streaming(request, reporter).await,
                Action::Chat(request) => self.exchange_buffered(request).await,
                Action::Health => self.exchange_health().await,
                Action::Models => self.exchange_models().await,
            };

            match outcome {
                Ok(mut exchange) => {
                    exchange.elapsed = started.elapsed();
                    let verdicts = scenario.evaluate(&exchange);
                    ScenarioResult::from_verdicts(&scenario.name, exchange, verdicts)
                }
                Err(err) => {
                    if err.should_log_details() {
                        warn!(scenario = %scenario.name, kind = %err.kind(), "Scenario failed: {}", err);
                    }
                    ScenarioResult::from_error(&scenario.name, &err)
                }
            }
        };

        debug!(scenario = %scenario.name, status = ?result.status, "Scenario finished");
        reporter.scenario_finished(&result);
        result
    }

    async fn exchange_buffered(&self, request: &OpenAIRequest) -> ProbeResult<Exchange> {
        let response = tokio::select! {
            response = self.client.chat_completions(request) => response?,
            _ = self.cancel.cancelled() => return Err(ProbeError::Cancelled),
        };

        let content = response
            .first_content()
            .ok_or_else(|| helpers::protocol_error("response has no choices"))?;

        Ok(Exchange {
            content,
            model: Some(response.model.clone()),
            id: Some(response.id.clone()),
            finish_reason: response.first_finish_reason().map(str::to_string),
            usage: response.usage,
            ..Default::default()
        })
    }

    async fn exchange_streaming(
        &self,
        request: &OpenAIRequest,
        reporter: &mut dyn Reporter,
    ) -> ProbeResult<Exchange> {
        let deadline = tokio::time::Instant::now() + self.limits.deadline;

        let mut stream = tokio::select! {
            opened = tokio::time::timeout_at(deadline, self.client.chat_completions_stream(request)) => {
                opened.map_err(|_| ProbeError::Timeout(self.limits.deadline))??
            }
            _ = self.cancel.cancelled() => return Err(ProbeError::Cancelled),
        };

        let mut exchange = Exchange::default();
        loop {
            let step = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => StreamStep::Cancelled,
                _ = tokio::time::sleep_until(deadline) => StreamStep::Deadline,
                next = tokio::time::timeout(self.limits.idle, stream.next()) => match next {
                    Ok(item) => StreamStep::Item(item),
                    Err(_) => StreamStep::Idle,
                },
            };

            let chunk = match step {
                StreamStep::Item(None) => break,
                StreamStep::Item(Some(chunk)) => chunk?,
                StreamStep::Idle => return Err(ProbeError::Timeout(self.limits.idle)),
                StreamStep::Deadline => return Err(ProbeError::Timeout(self.limits.deadline)),
                StreamStep::Cancelled => return Err(ProbeError::Cancelled),
            };

            exchange.chunks += 1;
            if exchange.model.is_none() && !chunk.model.is_empty() {
                exchange.model = Some(chunk.model.clone());
            }
            if exchange.id.is_none() && !chunk.id.is_empty() {
                exchange.id = Some(chunk.id.clone());
            }
            if let Some(reason) = chunk.finish_reason() {
                exchange.finish_reason = Some(reason.to_string());
            }
            if chunk.usage.is_some() {
                exchange.usage = chunk.usage;
            }
            if let Some(fragment) = chunk.content_fragment() {
                exchange.content.push_str(fragment);
                reporter.fragment(fragment);
            }
        }

        debug!("Stream completed after {} chunks", exchange.chunks);
        Ok(exchange)
    }

    async fn exchange_health(&self) -> ProbeResult<Exchange> {
        let health = tokio::select! {
            health = self.client.health() => health?,
            _ = self.cancel.cancelled() => return Err(ProbeError::Cancelled),
        };

        Ok(Exchange {
            content: health.status,
            ..Default::default()
        })
    }

    async fn exchange_models(&self) -> ProbeResult<Exchange> {
        let list = tokio::select! {
            list = self.client.models() => list?,
            _ = self.cancel.cancelled() => return Err(ProbeError::Cancelled),
        };

        debug!("Endpoint lists {} models", list.data.len());
        Ok(Exchange {
            models: list.ids(),
            ..Default::default()
        })
    }
}
