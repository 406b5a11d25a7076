//! Console reporting
//!
//! Human-readable pass/fail output with per-scenario markers, streamed text
//! echoed as it arrives, and a summary line per run.

use crate::config::Target;
use crate::services::runner::{RunSummary, ScenarioResult, Status};
use crate::services::scenario::Scenario;
use crate::utils::logging::truncate_content;
use std::io::Write;

const HEAVY_RULE: &str = "==================================================";
const LIGHT_RULE: &str = "--------------------------------------------------";

/// Receives progress events from the harness
pub trait Reporter {
    fn run_started(&mut self, _target: &Target) {}
    fn scenario_started(&mut self, _scenario: &Scenario) {}
    /// A streamed content fragment, in arrival order
    fn fragment(&mut self, _text: &str) {}
    fn scenario_finished(&mut self, _result: &ScenarioResult) {}
    fn run_finished(&mut self, _summary: &RunSummary) {}
}

/// Reporter that discards everything
#[derive(Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Reporter writing the console markers to any writer
pub struct ConsoleReporter<W: Write> {
    out: W,
    index: usize,
    streaming: bool,
    stream_open: bool,
}

impl ConsoleReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            index: 0,
            streaming: false,
            stream_open: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    // Console output is best effort; a closed stdout must not fail the run
    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{}", text);
    }

    fn print_exchange(&mut self, result: &ScenarioResult) {
        let Some(exchange) = &result.exchange else {
            return;
        };

        if self.streaming {
            if self.stream_open {
                self.line("");
                self.line(LIGHT_RULE);
            }
            self.line(&format!(
                "✅ Full content: {} chars in {} chunks",
                exchange.content.chars().count(),
                exchange.chunks
            ));
        } else {
            if let Some(model) = exchange.model.as_deref().filter(|m| !m.is_empty()) {
                self.line(&format!("✅ Model: {}", model));
            }
            if let Some(id) = exchange.id.as_deref().filter(|id| !id.is_empty()) {
                self.line(&format!("✅ ID: {}", id));
            }
            if exchange.models.is_empty() {
                self.line(&format!("✅ Reply: {}", truncate_content(&exchange.content, 500)));
            } else {
                self.line(&format!("✅ Models listed: {}", exchange.models.join(", ")));
            }
        }

        if let Some(reason) = &exchange.finish_reason {
            self.line(&format!("✅ Finish reason: {}", reason));
        }
        if let Some(usage) = exchange.usage {
            self.line(&format!(
                "✅ Token usage: {} (prompt: {}, completion: {})",
                usage.total_tokens, usage.prompt_tokens, usage.completion_tokens
            ));
        }
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn run_started(&mut self, target: &Target) {
        self.line(HEAVY_RULE);
        self.line(&format!("🚀 {} - {} ({})", target.name, target.base_url, target.model));
        self.line(HEAVY_RULE);
        self.line("");
        self.index = 0;
    }

    fn scenario_started(&mut self, scenario: &Scenario) {
        self.index += 1;
        self.streaming = scenario.is_streaming();
        self.stream_open = false;
        self.line(&format!("🧪 Test {}: {} [{}]", self.index, scenario.title, scenario.name));
        self.line(LIGHT_RULE);
    }

    fn fragment(&mut self, text: &str) {
        if !self.stream_open {
            self.stream_open = true;
            self.line("✅ Streaming response, receiving content:");
            self.line(LIGHT_RULE);
        }
        let _ = write!(self.out, "{}", text);
        let _ = self.out.flush();
    }

    fn scenario_finished(&mut self, result: &ScenarioResult) {
        if result.exchange.is_none() && self.stream_open {
            // Stream broke off mid-message
            self.line("");
            self.line(LIGHT_RULE);
        }

        self.print_exchange(result);

        for warning in &result.warnings {
            self.line(&format!("⚠️  {}", warning));
        }

        match result.status {
            Status::Passed => self.line(&format!("✅ {} passed", result.name)),
            Status::Failed(kind) => {
                let diagnostic = result.diagnostic.as_deref().unwrap_or("unknown error");
                self.line(&format!("❌ Error [{}]: {}", kind, diagnostic));
            }
        }
        self.line("");
        self.stream_open = false;
    }

    fn run_finished(&mut self, summary: &RunSummary) {
        self.line(HEAVY_RULE);
        self.line(&format!("📊 Results: {}/{} passed", summary.passed(), summary.total()));
        self.line(HEAVY_RULE);
        let _ = self.out.flush();
    }
}
