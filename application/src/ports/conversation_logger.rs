//! Port for structured conversation logging.
//!
//! Defines the [`ConversationLogger`] trait for recording what happened in
//! each chat turn (plans, step outcomes, parked approvals) to a structured
//! transcript.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the
//! transcript in a machine-readable format (JSONL).

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Event type identifiers
pub mod events {
    pub const CHAT_STARTED: &str = "chat_started";
    pub const PLAN_CREATED: &str = "plan_created";
    pub const PLAN_PARSE_FAILED: &str = "plan_parse_failed";
    pub const STEP_EXECUTED: &str = "step_executed";
    pub const APPROVAL_PARKED: &str = "approval_parked";
    pub const APPROVAL_REJECTED: &str = "approval_rejected";
    pub const CHAT_COMPLETED: &str = "chat_completed";
    pub const CHAT_FAILED: &str = "chat_failed";
    pub const CONTEXT_CLEARED: &str = "context_cleared";
}

/// A structured conversation event.
#[derive(Debug, Clone)]
pub struct ConversationEvent {
    /// Event type identifier, one of [`events`]
    pub event_type: &'static str,
    /// When the event happened
    pub timestamp: DateTime<Utc>,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ConversationEvent {
    /// Create an event stamped with the current UTC time.
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Port for logging conversation events.
///
/// `log` is synchronous and infallible; implementations swallow their own
/// write errors.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
