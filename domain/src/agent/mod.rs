//! Agent domain module
//!
//! Contains agent state, conversation messages, execution plans and
//! configuration for the orchestrator.

pub mod config;
pub mod entities;
pub mod plan;
pub mod plan_parser;
pub mod value_objects;

pub use config::{AgentConfig, ClarificationPolicy};
pub use entities::{AgentMessage, AgentState, Role};
pub use plan::{CLARIFICATION_GOAL, ExecutionPlan, PlanStep, RiskAssessment};
pub use plan_parser::{PlanParseError, parse_plan_json, parse_plan_response};
pub use value_objects::{ApprovalId, PendingApproval};
