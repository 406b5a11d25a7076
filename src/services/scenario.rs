//! Scenario definitions
//!
//! A scenario is one request against the endpoint plus the checks applied to
//! what came back. The default battery covers buffered and streamed
//! completions, system prompts and multi-turn context.

use crate::models::openai::{OpenAIMessage, OpenAIRequest, OpenAIUsage};
use serde::Serialize;
use std::time::Duration;

/// Status string the health endpoint reports when the proxy is up
pub const HEALTHY_STATUS: &str = "healthy";

/// What a scenario sends
#[derive(Debug, Clone)]
pub enum Action {
    /// POST /chat/completions; `request.stream` selects buffered or streamed mode
    Chat(OpenAIRequest),
    /// GET /health
    Health,
    /// GET /models
    Models,
}

/// Check applied to an exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// Reply text is non-empty
    NonEmptyContent,
    /// Response names the model that answered
    ModelPresent,
    /// Response carries an identifier
    IdPresent,
    /// Usage is reported and total == prompt + completion
    UsageConsistent,
    /// Reply mentions a fact from earlier turns. Advisory: a miss is a warning.
    Recall { expected: String },
    /// Health endpoint reports "healthy"
    Healthy,
    /// Model list advertises the given model
    ModelListed { model: String },
}

/// Outcome of a single check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Warn(String),
    Fail(String),
}

/// One self-contained test case
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Stable identifier, e.g. "multi_turn"
    pub name: String,
    /// Human readable title
    pub title: String,
    pub action: Action,
    pub checks: Vec<Check>,
}

/// What the endpoint returned for one scenario
#[derive(Debug, Clone, Default, Serialize)]
pub struct Exchange {
    /// Reply text; for streams, all fragments concatenated in arrival order
    pub content: String,
    pub model: Option<String>,
    pub id: Option<String>,
    pub finish_reason: Option<String>,
    pub usage: Option<OpenAIUsage>,
    /// Number of stream chunks received (0 for buffered replies)
    pub chunks: usize,
    /// Model identifiers from the model list
    pub models: Vec<String>,
    pub elapsed: Duration,
}

impl Scenario {
    /// Buffered chat completion scenario
    pub fn buffered(name: &str, title: &str, request: OpenAIRequest) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            action: Action::Chat(request.with_stream(false)),
            checks: Vec::new(),
        }
    }

    /// Streamed chat completion scenario
    pub fn streaming(name: &str, title: &str, request: OpenAIRequest) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            action: Action::Chat(request.with_stream(true)),
            checks: Vec::new(),
        }
    }

    /// Health endpoint scenario
    pub fn health() -> Self {
        Self {
            name: "health".to_string(),
            title: "Health check".to_string(),
            action: Action::Health,
            checks: vec![Check::Healthy],
        }
    }

    /// Model discovery scenario: the list must advertise `model`
    pub fn models(model: &str) -> Self {
        Self {
            name: "models".to_string(),
            title: "Model list".to_string(),
            action: Action::Models,
            checks: vec![Check::ModelListed {
                model: model.to_string(),
            }],
        }
    }

    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn is_streaming(&self) -> bool {
        matches!(&self.action, Action::Chat(request) if request.stream)
    }

    /// Apply every check to an exchange
    pub fn evaluate(&self, exchange: &Exchange) -> Vec<Verdict> {
        self.checks.iter().map(|check| check.evaluate(exchange)).collect()
    }
}

impl Check {
    pub fn evaluate(&self, exchange: &Exchange) -> Verdict {
        match self {
            Check::NonEmptyContent => {
                if exchange.content.trim().is_empty() {
                    Verdict::Fail("reply content is empty".to_string())
                } else {
                    Verdict::Pass
                }
            }
            Check::ModelPresent => match exchange.model.as_deref() {
                Some(model) if !model.is_empty() => Verdict::Pass,
                _ => Verdict::Fail("response does not name a model".to_string()),
            },
            Check::IdPresent => match exchange.id.as_deref() {
                Some(id) if !id.is_empty() => Verdict::Pass,
                _ => Verdict::Fail("response carries no id".to_string()),
            },
            Check::UsageConsistent => match exchange.usage {
                None => Verdict::Fail("response carries no usage".to_string()),
                Some(usage) if usage.is_consistent() => Verdict::Pass,
                Some(usage) => Verdict::Fail(format!(
                    "usage total {} != prompt {} + completion {}",
                    usage.total_tokens, usage.prompt_tokens, usage.completion_tokens
                )),
            },
            Check::Recall { expected } => {
                if contains_ignore_case(&exchange.content, expected) {
                    Verdict::Pass
                } else {
                    Verdict::Warn(format!("reply may not recall context: '{}' not found", expected))
                }
            }
            Check::Healthy => {
                if exchange.content == HEALTHY_STATUS {
                    Verdict::Pass
                } else {
                    Verdict::Fail(format!("health status is '{}'", exchange.content))
                }
            }
            Check::ModelListed { model } => {
                if exchange.models.iter().any(|id| id == model) {
                    Verdict::Pass
                } else {
                    Verdict::Fail(format!(
                        "model '{}' not listed ({} models advertised)",
                        model,
                        exchange.models.len()
                    ))
                }
            }
        }
    }
}

/// Case-insensitive substring test
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// The fixed battery run against every target
pub fn default_battery(model: &str) -> Vec<Scenario> {
    vec![
        Scenario::buffered(
            "basic_chat",
            "Basic chat",
            OpenAIRequest::new(model, vec![OpenAIMessage::user("你好，请用中文简短回复")])
                .with_max_tokens(50),
        )
        .check(Check::NonEmptyContent)
        .check(Check::ModelPresent)
        .check(Check::IdPresent)
        .check(Check::UsageConsistent),
        Scenario::buffered(
            "system_prompt",
            "System message",
            OpenAIRequest::new(
                model,
                vec![
                    OpenAIMessage::system("You are a helpful math tutor. Answer briefly."),
                    OpenAIMessage::user("What is 7 * 8?"),
                ],
            )
            .with_max_tokens(30)
            .with_temperature(0.7),
        )
        .check(Check::NonEmptyContent)
        .check(Check::UsageConsistent),
        Scenario::buffered(
            "multi_turn",
            "Multi-turn context",
            OpenAIRequest::new(
                model,
                vec![
                    OpenAIMessage::user("My name is Alice"),
                    OpenAIMessage::assistant("Nice to meet you, Alice!"),
                    OpenAIMessage::user("What's my name?"),
                ],
            )
            .with_max_tokens(20),
        )
        .check(Check::NonEmptyContent)
        .check(Check::Recall {
            expected: "Alice".to_string(),
        }),
        Scenario::buffered(
            "non_stream",
            "Non-streaming response",
            OpenAIRequest::new(model, vec![OpenAIMessage::user("用一句话介绍自己")])
                .with_max_tokens(100),
        )
        .check(Check::NonEmptyContent)
        .check(Check::ModelPresent),
        Scenario::streaming(
            "stream",
            "Streaming response",
            OpenAIRequest::new(model, vec![OpenAIMessage::user("用一句话介绍自己")])
                .with_max_tokens(100),
        )
        .check(Check::NonEmptyContent),
        Scenario::streaming(
            "stream_with_system",
            "Streaming response with system prompt",
            OpenAIRequest::new(
                model,
                vec![
                    OpenAIMessage::system("你是一个专业的 Python 编程助手"),
                    OpenAIMessage::user("写一个 Hello World 程序"),
                ],
            )
            .with_max_tokens(200)
            .with_temperature(0.7),
        )
        .check(Check::NonEmptyContent),
    ]
}
