//! Approval port for gated plan steps.
//!
//! When a step's risk level is in `require_approval_for` and automatic
//! execution is disabled, the orchestrator asks an [`ApprovalPort`] before
//! running it.
//!
//! # Flow
//!
//! ```text
//! execute_step()
//!        ↓
//! risk ∈ require_approval_for && !auto_execute
//!        ↓
//! ApprovalPort configured? ──no──▶ park as PendingApproval (/approve later)
//!        │ yes
//!        ↓
//! ApprovalPort::request_approval()  (state: waiting_approval)
//!        ↓
//! Approve → execute   |   Reject → failed step
//! ```
//!
//! # Built-in Implementations
//!
//! - [`AutoApprove`] - Always approves
//! - [`AutoReject`] - Always rejects
//!
//! For interactive use, see `InteractiveApproval` in the presentation layer.

use async_trait::async_trait;
use devops_agent_domain::{PlanStep, RiskLevel};
use thiserror::Error;

/// What the orchestrator wants to run
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalRequest {
    /// Goal of the plan the step belongs to
    pub goal: String,
    pub step: PlanStep,
    pub risk_level: RiskLevel,
}

impl ApprovalRequest {
    pub fn new(goal: impl Into<String>, step: PlanStep, risk_level: RiskLevel) -> Self {
        Self {
            goal: goal.into(),
            step,
            risk_level,
        }
    }
}

/// A human (or policy) decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

/// Failure while asking for approval.
///
/// These errors are not decisions; the orchestrator turns them into a
/// failed step.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApprovalError {
    #[error("Approval cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    IoError(String),
}

/// Port for requesting approval of a gated step
#[async_trait]
pub trait ApprovalPort: Send + Sync {
    async fn request_approval(&self, request: &ApprovalRequest) -> Result<ApprovalDecision, ApprovalError>;
}

/// Approves every request.
///
/// # Warning
///
/// This runs every non-blocked operation the model plans. Only use it in a
/// sandbox.
pub struct AutoApprove;

#[async_trait]
impl ApprovalPort for AutoApprove {
    async fn request_approval(&self, _request: &ApprovalRequest) -> Result<ApprovalDecision, ApprovalError> {
        Ok(ApprovalDecision::Approve)
    }
}

/// Rejects every request. The safest non-interactive mode.
pub struct AutoReject;

#[async_trait]
impl ApprovalPort for AutoReject {
    async fn request_approval(&self, _request: &ApprovalRequest) -> Result<ApprovalDecision, ApprovalError> {
        Ok(ApprovalDecision::Reject)
    }
}
