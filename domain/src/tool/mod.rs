//! Tool domain module
//!
//! This module defines the core abstractions for the agent's **Tool System**:
//! how the orchestrator describes, classifies and records tool invocations.
//!
//! # Overview
//!
//! ```text
//! ┌────────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ ToolDescriptor │───▶│ ToolInput    │───▶│ ToolResult   │
//! │ (catalog)      │    │ (validated)  │    │ (outcome)    │
//! └────────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! # Risk-Based Execution
//!
//! Each operation is classified at call time with a [`RiskLevel`](entities::RiskLevel):
//!
//! | Risk | Examples | Orchestrator behaviour |
//! |------|----------|------------------------|
//! | **Safe** | `echo`, `date` | Execute directly |
//! | **ReadOnly** | `docker ps`, `kubectl get pods` | Execute directly |
//! | **RequiresApproval** | `docker restart`, `terraform apply` | Execute only if auto-execution is enabled or a human approves |
//! | **Blocked** | `rm -rf /`, `DROP DATABASE` | Never executed |
//!
//! # Architecture
//!
//! - **Domain** (this module): pure definitions, no I/O
//! - **Application** (`Tool`, `ToolRegistryPort`): async port traits
//! - **Infrastructure** (`ToolRegistry`, `ShellTool`): concrete adapters

pub mod entities;
pub mod traits;
pub mod value_objects;

pub use entities::{OperationSpec, RiskLevel, ToolDescriptor, ToolInput, ToolParameter, ToolParameters};
pub use traits::{DefaultInputValidator, InputValidator, build_validated_input};
pub use value_objects::ToolResult;
