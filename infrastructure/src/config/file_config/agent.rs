//! Agent configuration from TOML (`[agent]` section)

use super::ConfigValidationError;
use devops_agent_domain::{AgentConfig, ClarificationPolicy, RiskLevel};
use serde::{Deserialize, Serialize};

/// Raw agent configuration from TOML
///
/// # Example
///
/// ```toml
/// [agent]
/// model = "qwen2.5:7b"
/// temperature = 0.5
/// planning_temperature = 0.3
/// max_tokens = 4096
/// context_window = 128000
/// auto_execute_safe = false                 # ask before approval-gated steps
/// require_approval_for = ["requires_approval", "blocked"]
/// clarification = "surface"                 # "surface" or "answer_directly"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    pub model: String,
    pub temperature: f32,
    pub planning_temperature: f32,
    pub max_tokens: u32,
    pub context_window: u32,
    pub auto_execute_safe: bool,
    /// Risk level labels, parsed with `RiskLevel::from_str`
    pub require_approval_for: Vec<String>,
    pub clarification: String,
}

impl Default for FileAgentConfig {
    fn default() -> Self {
        let defaults = AgentConfig::default();
        Self {
            model: defaults.model,
            temperature: defaults.temperature,
            planning_temperature: defaults.planning_temperature,
            max_tokens: defaults.max_tokens,
            context_window: defaults.context_window,
            auto_execute_safe: defaults.auto_execute_safe,
            require_approval_for: defaults
                .require_approval_for
                .iter()
                .map(|level| level.as_str().to_string())
                .collect(),
            clarification: "surface".to_string(),
        }
    }
}

impl FileAgentConfig {
    /// Convert into a validated [`AgentConfig`]
    pub fn to_agent_config(&self) -> Result<AgentConfig, ConfigValidationError> {
        let require_approval_for = self
            .require_approval_for
            .iter()
            .map(|label| {
                label
                    .parse::<RiskLevel>()
                    .map_err(|_| ConfigValidationError::InvalidRiskLevel(label.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let clarification = self
            .clarification
            .parse::<ClarificationPolicy>()
            .map_err(|_| ConfigValidationError::InvalidClarification(self.clarification.clone()))?;

        let config = AgentConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            planning_temperature: self.planning_temperature,
            max_tokens: self.max_tokens,
            context_window: self.context_window,
            auto_execute_safe: self.auto_execute_safe,
            require_approval_for,
            clarification,
        };
        config
            .validate()
            .map_err(|e| ConfigValidationError::Agent(e.to_string()))?;
        Ok(config)
    }
}
