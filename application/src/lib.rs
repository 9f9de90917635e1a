//! Application layer for devops-agent
//!
//! This crate contains the chat orchestrator use case and the port
//! definitions it depends on. It depends only on the domain layer.

pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use ports::{
    approval::{ApprovalDecision, ApprovalError, ApprovalPort, ApprovalRequest, AutoApprove, AutoReject},
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    llm_client::{ChatMessage, ChatRequest, GatewayError, GenerateRequest, LlmClient, ResponseFormat, TextStream},
    tool::{Tool, ToolError},
    tool_registry::ToolRegistryPort,
};
pub use use_cases::chat::{AgentOrchestrator, ChatError, ChatSession};
