//! Logging utilities
//!
//! Shared helpers for keeping request logs short

use crate::models::openai::{OpenAIContent, OpenAIMessage, OpenAIRequest, ROLE_SYSTEM};

/// Set to true to include full message content in debug logs
pub const VERBOSE_REQUEST_LOGGING: bool = false;

/// Truncate a string to `max_chars` characters with a note about the original length
pub fn truncate_content(s: &str, max_chars: usize) -> String {
    let total = s.chars().count();
    if total > max_chars {
        let head: String = s.chars().take(max_chars).collect();
        format!("{}... ({} chars truncated)", head, total - max_chars)
    } else {
        s.to_string()
    }
}

/// Create a filtered version of a message for logging
fn filter_message(msg: &OpenAIMessage) -> serde_json::Value {
    let content = match &msg.content {
        Some(OpenAIContent::Text(t)) => {
            // System prompts are truncated harder
            let max_len = if msg.role == ROLE_SYSTEM { 100 } else { 200 };
            serde_json::Value::String(truncate_content(t, max_len))
        }
        Some(OpenAIContent::Array(arr)) => {
            serde_json::json!(format!("[...{} content blocks]", arr.len()))
        }
        None => serde_json::Value::Null,
    };

    serde_json::json!({
        "role": msg.role,
        "content": content,
    })
}

/// Create a filtered summary of a request for logging
pub fn create_request_log_summary(request: &OpenAIRequest) -> serde_json::Value {
    if VERBOSE_REQUEST_LOGGING {
        serde_json::to_value(request).unwrap_or(serde_json::json!({"error": "serialize failed"}))
    } else {
        let filtered_messages: Vec<serde_json::Value> =
            request.messages.iter().map(filter_message).collect();

        serde_json::json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "stream": request.stream,
            "messages": filtered_messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "用一句话介绍自己";
        assert_eq!(truncate_content(text, 3), "用一句... (5 chars truncated)");
        assert_eq!(truncate_content(text, 20), text);
    }

    #[test]
    fn test_summary_truncates_system_prompt() {
        let request = OpenAIRequest::new(
            "m",
            vec![OpenAIMessage::system("s".repeat(150)), OpenAIMessage::user("hi")],
        );
        let summary = create_request_log_summary(&request);

        let system = summary["messages"][0]["content"].as_str().unwrap();
        assert!(system.ends_with("(50 chars truncated)"));
        assert_eq!(summary["messages"][1]["content"], "hi");
    }
}
