//! Tool domain value objects: the outcome of a single step.
//!
//! Every executed (or refused) plan step produces exactly one
//! [`ToolResult`]. Refusals by the risk policy are ordinary failed
//! results, never errors, so the orchestrator can report them inline.

use super::entities::RiskLevel;
use serde::{Deserialize, Serialize};

/// Result of a tool execution.
///
/// Produced by tool implementations and by the orchestrator's risk gate,
/// consumed by the synthesis prompt and the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the execution was successful
    pub success: bool,
    /// Error message (for failed or refused execution)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Structured output (for successful execution)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Non-fatal issues worth surfacing in the summary
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Risk level the step was classified at, when classification happened
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(data: impl Into<serde_json::Value>) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data.into()),
            warnings: Vec::new(),
            risk_level: None,
        }
    }

    /// Create a failed result
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            data: None,
            warnings: Vec::new(),
            risk_level: None,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_risk_level(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = Some(risk_level);
        self
    }

    /// Check if execution was successful
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Get the error message
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Render the data payload for prompts (`None` when absent).
    pub fn data_display(&self) -> String {
        match &self.data {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(value) => value.to_string(),
            None => "None".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success(serde_json::json!({"containers": ["web", "db"]}))
            .with_risk_level(RiskLevel::ReadOnly);

        assert!(result.is_success());
        assert!(result.error().is_none());
        assert_eq!(result.risk_level, Some(RiskLevel::ReadOnly));
        assert_eq!(result.data_display(), r#"{"containers":["web","db"]}"#);
    }

    #[test]
    fn test_tool_result_failure() {
        let result = ToolResult::failure("Operation 'drop' is blocked for safety")
            .with_risk_level(RiskLevel::Blocked);

        assert!(!result.is_success());
        assert_eq!(result.error(), Some("Operation 'drop' is blocked for safety"));
        assert_eq!(result.data_display(), "None");
    }

    #[test]
    fn test_string_data_is_rendered_raw() {
        let result = ToolResult::success("web  Up 3 hours").with_warning("output truncated");
        assert_eq!(result.data_display(), "web  Up 3 hours");
        assert_eq!(result.warnings, vec!["output truncated".to_string()]);
    }
}
