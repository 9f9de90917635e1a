//! Tool domain entities

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters passed to a tool operation, keyed by parameter name.
///
/// A `BTreeMap` keeps prompts and logs deterministic.
pub type ToolParameters = BTreeMap<String, serde_json::Value>;

/// Risk level of a tool operation
///
/// Levels are totally ordered from least to most dangerous, so combining
/// several classifications (tool + command filter) is simply `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// No side effects worth mentioning
    Safe,
    /// Reads state but never modifies it (e.g., `docker ps`, `git status`)
    ReadOnly,
    /// Modifies state; a human should sign off first
    #[serde(alias = "approval")]
    RequiresApproval,
    /// Never executed, regardless of configuration
    Blocked,
}

impl RiskLevel {
    pub fn as_str(&self) -> &str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::ReadOnly => "read_only",
            RiskLevel::RequiresApproval => "requires_approval",
            RiskLevel::Blocked => "blocked",
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, RiskLevel::Blocked)
    }

    /// Escalate to the more dangerous of two classifications.
    pub fn escalate(self, other: RiskLevel) -> RiskLevel {
        self.max(other)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "safe" => Ok(RiskLevel::Safe),
            "read_only" | "readonly" => Ok(RiskLevel::ReadOnly),
            "requires_approval" | "approval" => Ok(RiskLevel::RequiresApproval),
            "blocked" => Ok(RiskLevel::Blocked),
            other => Err(format!("Unknown risk level: {}", other)),
        }
    }
}

/// Parameter specification for a tool operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name
    pub name: String,
    /// Parameter description
    pub description: String,
    /// Whether this parameter is required
    pub required: bool,
    /// Parameter type hint (e.g., "string", "number", "boolean")
    #[serde(rename = "type")]
    pub param_type: String,
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
            param_type: "string".to_string(),
        }
    }

    pub fn with_type(mut self, param_type: impl Into<String>) -> Self {
        self.param_type = param_type.into();
        self
    }
}

/// One operation a tool supports (e.g., `ps`, `logs`, `restart` for a container tool)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl OperationSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Catalog entry describing a registered tool.
///
/// Serialized verbatim into the planning prompt so the model knows
/// which tools, operations and parameters exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique name of the tool (e.g., "docker")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Supported operations
    pub operations: Vec<OperationSpec>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            operations: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: OperationSpec) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn operation(&self, name: &str) -> Option<&OperationSpec> {
        self.operations.iter().find(|o| o.name == name)
    }
}

/// Validated input for a single tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInput {
    pub operation: String,
    pub parameters: ToolParameters,
}

impl ToolInput {
    pub fn new(operation: impl Into<String>, parameters: ToolParameters) -> Self {
        Self {
            operation: operation.into(),
            parameters,
        }
    }

    /// Get a string parameter
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|v| v.as_str())
    }

    /// Get a required string parameter or return an error message
    pub fn require_string(&self, key: &str) -> Result<&str, String> {
        self.get_string(key)
            .ok_or_else(|| format!("Missing required argument: {}", key))
    }

    /// Get an optional u64 parameter
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.parameters.get(key).and_then(|v| v.as_u64())
    }
}
