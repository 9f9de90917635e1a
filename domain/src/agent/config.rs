//! Agent configuration: process-wide tunables fixed at construction.

use crate::core::error::DomainError;
use crate::tool::entities::RiskLevel;
use serde::{Deserialize, Serialize};

/// What to do when the planner answers with clarifying questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClarificationPolicy {
    /// Stream the questions back to the user
    #[default]
    Surface,
    /// Ignore the questions and answer the request directly
    AnswerDirectly,
}

impl std::str::FromStr for ClarificationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "surface" => Ok(ClarificationPolicy::Surface),
            "answer_directly" | "direct" => Ok(ClarificationPolicy::AnswerDirectly),
            other => Err(format!("Unknown clarification policy: {}", other)),
        }
    }
}

/// Configuration for the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model identifier passed to the LLM client
    pub model: String,
    /// Sampling temperature for conversational calls
    pub temperature: f32,
    /// Sampling temperature for the planning call
    pub planning_temperature: f32,
    /// Maximum tokens to generate per call
    pub max_tokens: u32,
    /// Context window of the model, in tokens
    pub context_window: u32,
    /// Execute approval-gated steps without asking.
    ///
    /// Despite the name this flag governs the levels listed in
    /// `require_approval_for`, not `safe` steps (those always run).
    pub auto_execute_safe: bool,
    /// Risk levels that need approval before execution
    pub require_approval_for: Vec<RiskLevel>,
    /// Handling of clarifying questions from the planner
    pub clarification: ClarificationPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "qwen2.5:7b".to_string(),
            temperature: 0.5,
            planning_temperature: 0.3,
            max_tokens: 4096,
            context_window: 128_000,
            auto_execute_safe: true,
            require_approval_for: vec![RiskLevel::RequiresApproval, RiskLevel::Blocked],
            clarification: ClarificationPolicy::Surface,
        }
    }
}

impl AgentConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_auto_execute(mut self, enabled: bool) -> Self {
        self.auto_execute_safe = enabled;
        self
    }

    pub fn with_require_approval_for(mut self, levels: Vec<RiskLevel>) -> Self {
        self.require_approval_for = levels;
        self
    }

    pub fn with_clarification(mut self, policy: ClarificationPolicy) -> Self {
        self.clarification = policy;
        self
    }

    /// Whether approval-gated steps run without asking anyone
    pub fn auto_executes_approval_required(&self) -> bool {
        self.auto_execute_safe
    }

    /// Whether a step classified at `risk` must be approved first.
    ///
    /// `RequiresApproval` is always gated; `require_approval_for` can only
    /// add levels. `Blocked` is listed by default but never reaches this
    /// check: blocked steps are refused before the approval gate.
    pub fn requires_approval(&self, risk: RiskLevel) -> bool {
        risk == RiskLevel::RequiresApproval || self.require_approval_for.contains(&risk)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.model.trim().is_empty() {
            return Err(DomainError::InvalidConfig("model cannot be empty".to_string()));
        }
        for (name, value) in [
            ("temperature", self.temperature),
            ("planning_temperature", self.planning_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(DomainError::InvalidConfig(format!(
                    "{} must be between 0.0 and 2.0 (got {})",
                    name, value
                )));
            }
        }
        if self.max_tokens == 0 {
            return Err(DomainError::InvalidConfig("max_tokens cannot be 0".to_string()));
        }
        if self.max_tokens > self.context_window {
            return Err(DomainError::InvalidConfig(format!(
                "max_tokens ({}) exceeds context_window ({})",
                self.max_tokens, self.context_window
            )));
        }
        Ok(())
    }
}
