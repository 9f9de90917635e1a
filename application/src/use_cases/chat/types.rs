//! Type definitions for the chat use case.

use crate::ports::llm_client::GatewayError;
use devops_agent_domain::{ApprovalId, RiskLevel, ToolResult};
use thiserror::Error;

/// Errors surfaced as items of a chat stream
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("No pending approval with id #{0}")]
    ApprovalNotFound(ApprovalId),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ChatError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ChatError::Cancelled)
    }
}

/// Whether a step still has to pass the approval gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ApprovalGate {
    /// Apply `require_approval_for` and `auto_execute_safe`
    Policy,
    /// A human already approved this step
    Approved,
}

/// Outcome of one step, with the bookkeeping the orchestrator needs.
#[derive(Debug, Clone)]
pub(super) struct StepExecution {
    pub result: ToolResult,
    /// Risk the step was classified at, if the tool was found
    pub risk: Option<RiskLevel>,
    /// The step was refused for lack of approval and should be parked
    pub needs_approval: bool,
}

impl StepExecution {
    pub fn done(result: ToolResult, risk: Option<RiskLevel>) -> Self {
        Self {
            result,
            risk,
            needs_approval: false,
        }
    }

    pub fn awaiting_approval(result: ToolResult, risk: RiskLevel) -> Self {
        Self {
            result,
            risk: Some(risk),
            needs_approval: true,
        }
    }
}

/// What the responding phase streams back.
pub(super) enum Reply {
    /// Fixed text, no model call
    Text(String),
    /// Answer the user input directly
    Direct(String),
    /// Summarize executed steps
    Synthesis {
        plan: devops_agent_domain::ExecutionPlan,
        results: Vec<ToolResult>,
    },
}
