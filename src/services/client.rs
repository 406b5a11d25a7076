//! HTTP client service
//!
//! Encapsulates HTTP communication with the endpoint under test

use crate::models::openai::*;
use crate::services::sse::{SseDecoder, SseFrame};
use crate::utils::error::{helpers, ProbeError, ProbeResult};
use crate::utils::logging::create_request_log_summary;
use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, warn};

/// A boxed stream of decoded streaming chunks
pub type ChunkStream = Pin<Box<dyn Stream<Item = ProbeResult<OpenAIStreamResponse>> + Send>>;

const USER_AGENT: &str = concat!("chatprobe/", env!("CARGO_PKG_VERSION"));

/// Body served by the proxy's health endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Service status, "healthy" when up
    pub status: String,
    /// Uptime in seconds (optional)
    #[serde(default)]
    pub uptime: Option<f64>,
}

/// Chat completions client bound to one endpoint and credential
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    stream_client: Client,
    base_url: String,
    api_key: String,
}

impl ChatClient {
    /// Create a new client instance
    ///
    /// The streaming client carries no whole-request timeout. Streamed
    /// exchanges are bounded by the runner's deadline and idle limits.
    pub fn new(base_url: &str, api_key: &str, request_timeout: Duration) -> Result<Self> {
        if base_url.trim().is_empty() {
            anyhow::bail!("Endpoint base URL is not set");
        }
        if api_key.is_empty() {
            anyhow::bail!("API key is not set");
        }

        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        let stream_client = Client::builder()
            .connect_timeout(request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create streaming HTTP client")?;

        Ok(Self {
            client,
            stream_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Endpoint base URL, without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    /// Send chat completion request
    pub async fn chat_completions(&self, request: &OpenAIRequest) -> ProbeResult<OpenAIResponse> {
        debug!(request = %create_request_log_summary(request), "Sending chat completion request");

        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        let parsed: OpenAIResponse = serde_json::from_str(&body)?;

        debug!("Chat completion request completed");
        Ok(parsed)
    }

    /// Send streaming chat completion request
    pub async fn chat_completions_stream(&self, request: &OpenAIRequest) -> ProbeResult<ChunkStream> {
        debug!(request = %create_request_log_summary(request), "Sending streaming chat completion request");

        let response = self
            .stream_client
            .post(self.completions_url())
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await?;

        let response = Self::check_status(response).await?;

        if let Some(content_type) = response.headers().get("content-type") {
            let content_type = content_type.to_str().unwrap_or_default();
            if !content_type.starts_with("text/event-stream") {
                warn!("Streaming response has content type {}", content_type);
            }
        }

        Ok(decode_event_stream(response.bytes_stream()))
    }

    /// Query the proxy health endpoint
    pub async fn health(&self) -> ProbeResult<HealthStatus> {
        let url = format!("{}/health", self.base_url);
        debug!("Checking endpoint health at {}", url);

        let response = self.client.get(&url).send().await?;
        let response = Self::check_status(response).await?;
        let body = response.text().await?;

        Ok(serde_json::from_str(&body)?)
    }

    /// List the models the endpoint advertises
    pub async fn models(&self) -> ProbeResult<OpenAIModelList> {
        let url = format!("{}/models", self.base_url);
        debug!("Listing endpoint models at {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        let body = response.text().await?;

        Ok(serde_json::from_str(&body)?)
    }

    /// Turn a non-success status into an error carrying the server's message
    async fn check_status(response: Response) -> ProbeResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();

        // Try to parse as OpenAI error format
        if let Ok(error_response) = serde_json::from_str::<OpenAIErrorResponse>(&error_text) {
            error!("Endpoint API error: {:?}", error_response.error);
            Err(helpers::status_error(status.as_u16(), error_response.error.message))
        } else {
            error!("Endpoint request failed: {} - {}", status, error_text);
            Err(helpers::status_error(status.as_u16(), error_text))
        }
    }
}

struct DecodeState<S> {
    body: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<ProbeResult<OpenAIStreamResponse>>,
    finished: bool,
}

impl<S> DecodeState<S> {
    fn enqueue(&mut self, frames: impl IntoIterator<Item = SseFrame>) {
        for frame in frames {
            match frame {
                SseFrame::Done => {
                    debug!("Received streaming response end marker");
                    self.finished = true;
                    return;
                }
                SseFrame::Data(payload) => {
                    let item = parse_chunk(&payload);
                    if item.is_err() {
                        self.finished = true;
                    }
                    self.pending.push_back(item);
                    if self.finished {
                        return;
                    }
                }
            }
        }
    }

    fn fail(&mut self, err: ProbeError) {
        self.finished = true;
        self.pending.push_back(Err(err));
    }
}

/// Decode an SSE response body into chat completion chunks
///
/// The stream ends after `[DONE]`, at the end of the body, or after the first
/// error it yields.
pub fn decode_event_stream<S, B, E>(body: S) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ProbeError> + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    let stream = futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => match state.decoder.push(bytes.as_ref()) {
                    Ok(frames) => state.enqueue(frames),
                    Err(e) => state.fail(e),
                },
                Some(Err(e)) => state.fail(e.into()),
                None => match state.decoder.finish() {
                    Ok(frame) => {
                        state.enqueue(frame);
                        state.finished = true;
                    }
                    Err(e) => state.fail(e),
                },
            }
        }
    });

    Box::pin(stream)
}

/// Parse one SSE data payload into a chunk
fn parse_chunk(payload: &str) -> ProbeResult<OpenAIStreamResponse> {
    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| helpers::protocol_error(format!("Malformed stream chunk: {} - data: {}", e, payload)))?;

    if value.get("error").is_some() {
        let message = serde_json::from_value::<OpenAIErrorResponse>(value.clone())
            .map(|r| r.error.message)
            .unwrap_or_else(|_| value["error"].to_string());
        return Err(helpers::protocol_error(format!("Error event in stream: {}", message)));
    }

    serde_json::from_value(value)
        .map_err(|e| helpers::protocol_error(format!("Unexpected stream chunk shape: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&'static str]) -> ChunkStream {
        let items: Vec<Result<&'static [u8], reqwest::Error>> =
            parts.iter().map(|p| Ok(p.as_bytes())).collect();
        decode_event_stream(futures::stream::iter(items))
    }

    #[test]
    fn test_client_creation() {
        let client = ChatClient::new("http://localhost:8003/v1/", "key", Duration::from_secs(5));
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url(), "http://localhost:8003/v1");
    }

    #[test]
    fn test_client_requires_credential() {
        assert!(ChatClient::new("http://localhost:8003/v1", "", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_completions_url() {
        let client = ChatClient::new("http://localhost:8003/v1", "key", Duration::from_secs(5)).unwrap();
        assert_eq!(client.completions_url(), "http://localhost:8003/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_decode_stops_at_done() {
        let mut stream = chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\ndata: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        ]);

        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            text.push_str(chunk.unwrap().content_fragment().unwrap_or_default());
        }
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn test_decode_error_event() {
        let mut stream = chunks(&["data: {\"error\":{\"message\":\"overloaded\"}}\n\n"]);

        let err = stream.next().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("overloaded"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_decode_malformed_json() {
        let mut stream = chunks(&["data: {not json\n\n"]);
        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), crate::utils::error::FailureKind::Protocol);
    }

    #[tokio::test]
    async fn test_decode_unterminated_body() {
        let mut stream = chunks(&["data: {\"choices\":[{\"delta\":{\"content\":\"end\"}}]}"]);
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.content_fragment(), Some("end"));
        assert!(stream.next().await.is_none());
    }
}
