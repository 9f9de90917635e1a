//! HTTP client for a local Ollama server

use super::error::{OllamaError, Result};
use super::protocol::{ChatBody, ChatEvent, GenerateBody, GenerateResponse, LineBuffer, parse_chat_line};
use async_trait::async_trait;
use devops_agent_application::{ChatRequest, GatewayError, GenerateRequest, LlmClient, TextStream};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, warn};

/// Default Ollama endpoint
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default request timeout (model loading can be slow)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// [`LlmClient`] backed by the Ollama HTTP API
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().connect_timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn generate_text(&self, request: &GenerateRequest) -> Result<String> {
        debug!(model = %request.model, "POST /api/generate");
        let response = self
            .http
            .post(self.endpoint("/api/generate"))
            .timeout(self.timeout)
            .json(&GenerateBody::from(request))
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: GenerateResponse = serde_json::from_slice(&response.bytes().await?)?;
        if let Some(message) = body.error {
            return Err(OllamaError::from_server_message(&request.model, message));
        }
        Ok(body.response)
    }

    /// Send the chat request and wait for the response headers.
    ///
    /// Only this part is bounded by the timeout; the body streams for as
    /// long as the model keeps generating.
    async fn open_chat(&self, request: &ChatRequest) -> Result<reqwest::Response> {
        debug!(model = %request.model, messages = request.messages.len(), "POST /api/chat");
        let send = self
            .http
            .post(self.endpoint("/api/chat"))
            .json(&ChatBody::from(request))
            .send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| OllamaError::Timeout)??;
        check_status(response).await
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, request: GenerateRequest) -> std::result::Result<String, GatewayError> {
        Ok(self.generate_text(&request).await?)
    }

    async fn chat_stream(&self, request: ChatRequest) -> std::result::Result<TextStream, GatewayError> {
        let response = self.open_chat(&request).await?;
        let model = request.model;
        let mut bytes = Box::pin(response.bytes_stream());

        let stream = async_stream::stream! {
            let mut lines = LineBuffer::new();
            let mut finished = false;

            while !finished {
                let Some(chunk) = bytes.next().await else {
                    break;
                };
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(GatewayError::from(OllamaError::Http(e)));
                        finished = true;
                        continue;
                    }
                };
                for line in lines.push(&chunk) {
                    let (item, stop) = decode_line(&model, &line);
                    if let Some(item) = item {
                        yield item;
                    }
                    if stop {
                        finished = true;
                        break;
                    }
                }
            }

            if !finished {
                let stopped = match lines.finish() {
                    Some(line) => {
                        let (item, stop) = decode_line(&model, &line);
                        if let Some(item) = item {
                            yield item;
                        }
                        stop
                    }
                    None => false,
                };
                // A cut-off answer must not pass for a complete one
                if !stopped {
                    warn!(model = %model, "chat stream ended without a done marker");
                    yield Err(GatewayError::from(OllamaError::Incomplete));
                }
            }
        };

        Ok(stream.boxed())
    }
}

/// Turn one NDJSON line into an optional stream item plus a stop flag.
fn decode_line(
    model: &str,
    line: &str,
) -> (Option<std::result::Result<String, GatewayError>>, bool) {
    match parse_chat_line(model, line) {
        Ok(ChatEvent::Delta(text)) => ((!text.is_empty()).then(|| Ok(text)), false),
        Ok(ChatEvent::Done(text)) => ((!text.is_empty()).then(|| Ok(text)), true),
        Err(e) => (Some(Err(e.into())), true),
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    // Ollama wraps errors as {"error": "..."}
    let body = serde_json::from_str::<GenerateResponse>(&body)
        .ok()
        .and_then(|r| r.error)
        .unwrap_or(body);
    Err(OllamaError::Status {
        status: status.as_u16(),
        body,
    })
}
