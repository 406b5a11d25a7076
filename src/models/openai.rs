//! OpenAI API data models
//!
//! Request, response and streaming chunk structures for the chat completions
//! endpoint. Response fields that a proxy may legitimately omit carry serde
//! defaults so that their absence is judged by scenario checks, not by the decoder.

use serde::{Deserialize, Serialize};

/// Message roles accepted by the chat completions endpoint
pub const ROLE_SYSTEM: &str = "system";
pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

/// OpenAI API request structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAIRequest {
    /// Model name
    pub model: String,
    /// Message list
    pub messages: Vec<OpenAIMessage>,
    /// Maximum tokens to generate (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Temperature parameter (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Whether to stream response
    #[serde(default)]
    pub stream: bool,
}

/// OpenAI message structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAIMessage {
    /// Role (system/user/assistant)
    pub role: String,
    /// Message content
    #[serde(default)]
    pub content: Option<OpenAIContent>,
}

/// OpenAI message content (can be string or content array)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpenAIContent {
    /// Simple text content
    Text(String),
    /// Content array
    Array(Vec<OpenAIContentPart>),
}

/// OpenAI content part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OpenAIContentPart {
    /// Text part
    #[serde(rename = "text")]
    Text { text: String },
    /// Any other part type (images, audio) carries no text
    #[serde(other)]
    Other,
}

/// OpenAI API response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIResponse {
    /// Response ID
    #[serde(default)]
    pub id: String,
    /// Object type
    #[serde(default)]
    pub object: String,
    /// Creation timestamp
    #[serde(default)]
    pub created: u64,
    /// Model used
    #[serde(default)]
    pub model: String,
    /// Choice list
    #[serde(default)]
    pub choices: Vec<OpenAIChoice>,
    /// Usage statistics
    #[serde(default)]
    pub usage: Option<OpenAIUsage>,
}

/// OpenAI choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIChoice {
    /// Choice index
    #[serde(default)]
    pub index: u32,
    /// Message content
    pub message: OpenAIResponseMessage,
    /// Finish reason
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Assistant message inside a buffered choice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAIResponseMessage {
    /// Role, normally "assistant"
    #[serde(default)]
    pub role: Option<String>,
    /// Message content
    #[serde(default)]
    pub content: Option<OpenAIContent>,
}

/// OpenAI usage statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAIUsage {
    /// Prompt token count
    pub prompt_tokens: u32,
    /// Completion token count
    pub completion_tokens: u32,
    /// Total token count
    pub total_tokens: u32,
}

/// OpenAI streaming response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIStreamResponse {
    /// Response ID
    #[serde(default)]
    pub id: String,
    /// Object type
    #[serde(default)]
    pub object: String,
    /// Creation timestamp
    #[serde(default)]
    pub created: u64,
    /// Model used
    #[serde(default)]
    pub model: String,
    /// Choice list, empty on usage-only chunks
    #[serde(default)]
    pub choices: Vec<OpenAIStreamChoice>,
    /// Usage statistics, sent by some servers on the final chunk
    #[serde(default)]
    pub usage: Option<OpenAIUsage>,
}

/// OpenAI streaming choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIStreamChoice {
    /// Choice index
    #[serde(default)]
    pub index: u32,
    /// Delta content
    #[serde(default)]
    pub delta: OpenAIStreamDelta,
    /// Finish reason
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// OpenAI streaming delta
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAIStreamDelta {
    /// Role (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// OpenAI error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIErrorResponse {
    /// Error information
    pub error: OpenAIError,
}

/// OpenAI error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIError {
    /// Error message
    pub message: String,
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    /// Error code (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<serde_json::Value>,
}

/// Body of `GET /models`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAIModelList {
    /// Object type, "list"
    #[serde(default)]
    pub object: String,
    /// Advertised models
    #[serde(default)]
    pub data: Vec<OpenAIModel>,
}

/// One advertised model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIModel {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub owned_by: Option<String>,
}

impl OpenAIModelList {
    /// Identifiers of every advertised model, in listed order
    pub fn ids(&self) -> Vec<String> {
        self.data.iter().map(|m| m.id.clone()).collect()
    }
}

impl OpenAIContent {
    /// Extract text content
    pub fn extract_text(&self) -> String {
        match self {
            OpenAIContent::Text(text) => text.clone(),
            OpenAIContent::Array(parts) => {
                parts
                    .iter()
                    .filter_map(|part| match part {
                        OpenAIContentPart::Text { text } => Some(text.as_str()),
                        OpenAIContentPart::Other => None,
                    })
                    .collect::<Vec<_>>()
                    .join("")
            }
        }
    }
}

impl OpenAIMessage {
    /// Build a plain-text message with the given role
    pub fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(OpenAIContent::Text(content.into())),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(ROLE_SYSTEM, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(ROLE_USER, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(ROLE_ASSISTANT, content)
    }
}

impl OpenAIRequest {
    /// Create a buffered request for a model
    pub fn new(model: impl Into<String>, messages: Vec<OpenAIMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: None,
            temperature: None,
            stream: false,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

impl OpenAIResponse {
    /// Text of the first choice, if the response has one
    pub fn first_content(&self) -> Option<String> {
        self.choices
            .first()
            .map(|choice| {
                choice
                    .message
                    .content
                    .as_ref()
                    .map(OpenAIContent::extract_text)
                    .unwrap_or_default()
            })
    }

    /// Finish reason of the first choice
    pub fn first_finish_reason(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.finish_reason.as_deref())
    }
}

impl OpenAIStreamResponse {
    /// Content fragment carried by the first choice, if any
    pub fn content_fragment(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Finish reason carried by the first choice, if any
    pub fn finish_reason(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.finish_reason.as_deref())
    }
}

impl OpenAIUsage {
    /// Whether total equals prompt plus completion
    pub fn is_consistent(&self) -> bool {
        u64::from(self.prompt_tokens) + u64::from(self.completion_tokens)
            == u64::from(self.total_tokens)
    }
}
