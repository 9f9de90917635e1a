//! Error types for the Ollama adapter

use devops_agent_application::GatewayError;
use thiserror::Error;

/// Result type alias for Ollama operations
pub type Result<T> = std::result::Result<T, OllamaError>;

/// Errors that can occur when talking to an Ollama server
#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Request timeout")]
    Timeout,

    #[error("Chat stream ended before the model finished")]
    Incomplete,
}

impl OllamaError {
    /// Map a server-reported error message, recognising missing models
    pub fn from_server_message(model: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains("not found") {
            OllamaError::ModelNotFound(model.to_string())
        } else {
            OllamaError::Server(message)
        }
    }
}

impl From<OllamaError> for GatewayError {
    fn from(err: OllamaError) -> Self {
        match err {
            OllamaError::Http(e) if e.is_timeout() => GatewayError::Timeout,
            OllamaError::Http(e) if e.is_connect() => GatewayError::ConnectionError(e.to_string()),
            OllamaError::Http(e) => GatewayError::RequestFailed(e.to_string()),
            OllamaError::Status { status: 404, body } => GatewayError::ModelNotAvailable(body),
            e @ OllamaError::Status { .. } => GatewayError::RequestFailed(e.to_string()),
            OllamaError::ModelNotFound(model) => GatewayError::ModelNotAvailable(model),
            OllamaError::Server(message) => GatewayError::RequestFailed(message),
            OllamaError::Parse(e) => GatewayError::InvalidResponse(e.to_string()),
            OllamaError::Timeout => GatewayError::Timeout,
            e @ OllamaError::Incomplete => GatewayError::InvalidResponse(e.to_string()),
        }
    }
}
