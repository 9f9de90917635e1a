//! Domain layer for devops-agent
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Plan → Execute → Synthesize
//!
//! Every user turn is first turned into an [`ExecutionPlan`] by the model.
//! Zero-step plans are answered directly; otherwise each [`PlanStep`] runs
//! through a risk gate and the collected [`ToolResult`]s are summarized.
//!
//! ## Risk Levels
//!
//! - **Safe / ReadOnly**: run without asking
//! - **RequiresApproval**: run only when auto-execution is enabled or a
//!   human approves
//! - **Blocked**: never run

pub mod agent;
pub mod core;
pub mod prompt;
pub mod safety;
pub mod tool;

// Re-export commonly used types
pub use agent::{
    config::{AgentConfig, ClarificationPolicy},
    entities::{AgentMessage, AgentState, Role},
    plan::{CLARIFICATION_GOAL, ExecutionPlan, PlanStep, RiskAssessment},
    value_objects::{ApprovalId, PendingApproval},
};
pub use core::error::DomainError;
pub use prompt::AgentPromptTemplate;
pub use safety::{CommandFilter, SafetyVerdict};
pub use tool::{
    entities::{OperationSpec, RiskLevel, ToolDescriptor, ToolInput, ToolParameter, ToolParameters},
    traits::{DefaultInputValidator, InputValidator, build_validated_input},
    value_objects::ToolResult,
};

// Re-export plan parser
pub use agent::plan_parser::{PlanParseError, parse_plan_json, parse_plan_response};
