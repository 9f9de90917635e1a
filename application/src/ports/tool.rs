//! Tool port
//!
//! A tool is a named capability (docker, kubectl, shell, ...) exposing one or
//! more operations. The orchestrator asks the tool to classify each call,
//! then to build a validated input, then to execute it.

use async_trait::async_trait;
use devops_agent_domain::{RiskLevel, ToolDescriptor, ToolInput, ToolParameters, ToolResult, build_validated_input};
use thiserror::Error;

/// Errors raised by a tool while preparing or running an operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),
}

/// Port for a single tool
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry key; must equal `descriptor().name`
    fn name(&self) -> &str;

    /// Catalog entry shown to the planner
    fn descriptor(&self) -> ToolDescriptor;

    /// Classify a call before it runs. Must not perform I/O.
    fn risk_level(&self, operation: &str, parameters: &ToolParameters) -> RiskLevel;

    /// Build a validated input for `execute`.
    ///
    /// The default validates against [`Tool::descriptor`].
    fn build_input(&self, operation: &str, parameters: &ToolParameters) -> Result<ToolInput, ToolError> {
        build_validated_input(&self.descriptor(), operation, parameters).map_err(ToolError::InvalidInput)
    }

    /// Run the operation
    async fn execute(&self, input: ToolInput) -> Result<ToolResult, ToolError>;
}
