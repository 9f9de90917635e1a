//! Agent domain entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of a chat turn.
///
/// Advisory bookkeeping for status displays; it is not used for
/// concurrency control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// No turn in flight
    #[default]
    Idle,
    /// Building a plan with the language model
    Thinking,
    /// Running plan steps against tools
    Executing,
    /// A step is waiting for a human decision
    WaitingApproval,
    /// Streaming the final answer
    Responding,
    /// The last turn ended on an unrecoverable failure
    Error,
}

impl AgentState {
    pub fn as_str(&self) -> &str {
        match self {
            AgentState::Idle => "idle",
            AgentState::Thinking => "thinking",
            AgentState::Executing => "executing",
            AgentState::WaitingApproval => "waiting_approval",
            AgentState::Responding => "responding",
            AgentState::Error => "error",
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            AgentState::Idle => "Idle",
            AgentState::Thinking => "Thinking",
            AgentState::Executing => "Executing",
            AgentState::WaitingApproval => "Waiting for approval",
            AgentState::Responding => "Responding",
            AgentState::Error => "Error",
        }
    }

    /// Whether a turn is currently in progress
    pub fn is_busy(&self) -> bool {
        !matches!(self, AgentState::Idle | AgentState::Error)
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Role of a message in the conversation log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One turn in a conversation.
///
/// Fields are private: a message is built once (optionally decorated with
/// metadata through the consuming builder) and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    role: Role,
    content: String,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl AgentMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, content)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn metadata(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_idle() {
        assert_eq!(AgentState::default(), AgentState::Idle);
        assert!(!AgentState::Idle.is_busy());
        assert!(!AgentState::Error.is_busy());
        assert!(AgentState::Thinking.is_busy());
        assert!(AgentState::WaitingApproval.is_busy());
    }

    #[test]
    fn test_state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&AgentState::WaitingApproval).unwrap(),
            "\"waiting_approval\""
        );
        assert_eq!(AgentState::WaitingApproval.as_str(), "waiting_approval");
    }

    #[test]
    fn test_message_builders() {
        let msg = AgentMessage::tool("docker.ps succeeded")
            .with_metadata("tool", "docker")
            .with_metadata("success", true);

        assert_eq!(msg.role(), Role::Tool);
        assert_eq!(msg.content(), "docker.ps succeeded");
        assert_eq!(msg.metadata()["tool"], "docker");
        assert_eq!(msg.metadata()["success"], true);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = AgentMessage::assistant("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert!(json["timestamp"].is_string());
    }
}
