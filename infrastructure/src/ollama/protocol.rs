//! Ollama HTTP API wire types
//!
//! `/api/generate` is called with `stream: false` and answers with a single
//! JSON object. `/api/chat` is called with `stream: true` and answers with
//! newline-delimited JSON, one [`ChatChunk`] per line, the last one carrying
//! `done: true`.

use super::error::{OllamaError, Result};
use devops_agent_application::{ChatMessage, ChatRequest, GenerateRequest, ResponseFormat};
use serde::{Deserialize, Serialize};

/// Sampling options shared by both endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Options {
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// Body of `POST /api/generate`
#[derive(Debug, Clone, Serialize)]
pub struct GenerateBody<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'static str>,
    pub options: Options,
}

impl<'a> From<&'a GenerateRequest> for GenerateBody<'a> {
    fn from(request: &'a GenerateRequest) -> Self {
        Self {
            model: &request.model,
            prompt: &request.prompt,
            stream: false,
            format: match request.format {
                ResponseFormat::Json => Some("json"),
                ResponseFormat::Text => None,
            },
            options: Options {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Serialize)]
pub struct ChatBody<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
    pub options: Options,
}

impl<'a> From<&'a ChatRequest> for ChatBody<'a> {
    fn from(request: &'a ChatRequest) -> Self {
        Self {
            model: &request.model,
            messages: &request.messages,
            stream: true,
            options: Options {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }
}

/// Response of a non-streaming `/api/generate` call
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkMessage {
    #[serde(default)]
    pub content: String,
}

/// One line of a streaming `/api/chat` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub message: Option<ChunkMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// What a single NDJSON line means for the stream consumer
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// Text delta (possibly empty)
    Delta(String),
    /// Final line; may still carry trailing text
    Done(String),
}

/// Decode one line of a `/api/chat` stream.
///
/// An `error` field on the line is reported as an error even when the line
/// also has content.
pub fn parse_chat_line(model: &str, line: &str) -> Result<ChatEvent> {
    let chunk: ChatChunk = serde_json::from_str(line)?;
    if let Some(message) = chunk.error {
        return Err(OllamaError::from_server_message(model, message));
    }
    let content = chunk.message.map(|m| m.content).unwrap_or_default();
    Ok(if chunk.done {
        ChatEvent::Done(content)
    } else {
        ChatEvent::Delta(content)
    })
}

/// Splits a byte stream into complete lines.
///
/// HTTP chunk boundaries do not line up with NDJSON records, so bytes are
/// buffered until a newline arrives. Blank lines are dropped.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and return every line completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            let text = text.trim();
            if !text.is_empty() {
                lines.push(text.to_string());
            }
        }
        lines
    }

    /// Flush a trailing line that had no newline
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let text = String::from_utf8_lossy(&rest).trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}
