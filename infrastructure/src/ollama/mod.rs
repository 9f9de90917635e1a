//! Ollama adapter
//!
//! Implements the [`LlmClient`](devops_agent_application::LlmClient) port
//! over the Ollama HTTP API: `/api/generate` for single-shot planning calls
//! and streaming `/api/chat` for answers.

pub mod client;
pub mod error;
pub mod protocol;

pub use client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, OllamaClient};
pub use error::OllamaError;
