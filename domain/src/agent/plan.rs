//! Execution plans
//!
//! An [`ExecutionPlan`] is the orchestrator's interpretation of one user
//! request. It is created once per chat turn from the model's structured
//! output and never modified afterwards.

use crate::tool::entities::ToolParameters;
use serde::{Deserialize, Serialize};

/// Goal used when the model asks clarifying questions instead of planning.
pub const CLARIFICATION_GOAL: &str = "Clarification needed";

/// The model's own risk label for a whole plan.
///
/// Informational only: step gating always uses the tool's classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskAssessment {
    #[default]
    Safe,
    ReadOnly,
    RequiresApproval,
}

impl RiskAssessment {
    pub fn as_str(&self) -> &str {
        match self {
            RiskAssessment::Safe => "safe",
            RiskAssessment::ReadOnly => "read_only",
            RiskAssessment::RequiresApproval => "requires_approval",
        }
    }

    /// Parse a label produced by the model.
    ///
    /// Unrecognised labels map to `RequiresApproval`: the text is untrusted
    /// and must never downgrade risk.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "safe" => RiskAssessment::Safe,
            "read_only" | "readonly" => RiskAssessment::ReadOnly,
            _ => RiskAssessment::RequiresApproval,
        }
    }
}

impl std::fmt::Display for RiskAssessment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One tool invocation in a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Name of the tool in the registry
    pub tool: String,
    /// Operation to run on that tool
    pub operation: String,
    /// Operation parameters
    #[serde(default)]
    pub parameters: ToolParameters,
    /// Why the model wants this step
    #[serde(default)]
    pub reason: String,
}

impl PlanStep {
    pub fn new(tool: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            operation: operation.into(),
            parameters: ToolParameters::new(),
            reason: String::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// `tool.operation` label for logs and messages
    pub fn label(&self) -> String {
        format!("{}.{}", self.tool, self.operation)
    }
}

/// A plan for answering one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// What the user wants, restated by the model
    pub goal: String,
    /// Ordered steps; executed strictly in sequence
    pub steps: Vec<PlanStep>,
    /// The model's overall risk label
    pub risk_assessment: RiskAssessment,
    /// Questions the model asked instead of planning
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clarifying_questions: Vec<String>,
}

impl ExecutionPlan {
    pub fn new(goal: impl Into<String>, steps: Vec<PlanStep>, risk_assessment: RiskAssessment) -> Self {
        Self {
            goal: goal.into(),
            steps,
            risk_assessment,
            clarifying_questions: Vec::new(),
        }
    }

    /// Zero-step plan: answer the request directly.
    pub fn direct(goal: impl Into<String>) -> Self {
        Self::new(goal, Vec::new(), RiskAssessment::Safe)
    }

    /// Zero-step plan carrying the model's clarifying questions.
    pub fn clarification(questions: Vec<String>) -> Self {
        Self {
            clarifying_questions: questions,
            ..Self::direct(CLARIFICATION_GOAL)
        }
    }

    /// Number of steps in the plan
    pub fn estimated_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn needs_tools(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn needs_clarification(&self) -> bool {
        !self.clarifying_questions.is_empty()
    }
}
