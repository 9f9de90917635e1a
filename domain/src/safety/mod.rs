//! Safety domain module
//!
//! A [`CommandFilter`] classifies free-form command text (shell lines,
//! SQL, manifests) independently of the tool that will run it. The
//! orchestrator combines its verdict with the tool's own classification and
//! keeps the more dangerous of the two.

use crate::tool::entities::{RiskLevel, ToolParameters};
use serde::{Deserialize, Serialize};

/// Outcome of a safety check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub level: RiskLevel,
    /// Why the level was raised, if it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SafetyVerdict {
    pub fn safe() -> Self {
        Self {
            level: RiskLevel::Safe,
            reason: None,
        }
    }

    pub fn new(level: RiskLevel, reason: impl Into<String>) -> Self {
        Self {
            level,
            reason: Some(reason.into()),
        }
    }

    /// Keep whichever verdict is more dangerous (ties keep `self`).
    pub fn escalate(self, other: SafetyVerdict) -> SafetyVerdict {
        if other.level > self.level { other } else { self }
    }
}

/// Pure classifier for command text.
///
/// Implementations must not perform I/O.
pub trait CommandFilter: Send + Sync {
    /// Classify a single command string
    fn check(&self, command: &str) -> SafetyVerdict;

    /// Classify every string found in a parameter map (nested arrays and
    /// objects included) and return the most dangerous verdict.
    fn check_parameters(&self, parameters: &ToolParameters) -> SafetyVerdict {
        parameters
            .values()
            .fold(SafetyVerdict::safe(), |verdict, value| {
                verdict.escalate(check_value(self, value))
            })
    }
}

fn check_value<F: CommandFilter + ?Sized>(filter: &F, value: &serde_json::Value) -> SafetyVerdict {
    match value {
        serde_json::Value::String(s) => filter.check(s),
        serde_json::Value::Array(items) => items
            .iter()
            .fold(SafetyVerdict::safe(), |v, item| v.escalate(check_value(filter, item))),
        serde_json::Value::Object(map) => map
            .values()
            .fold(SafetyVerdict::safe(), |v, item| v.escalate(check_value(filter, item))),
        _ => SafetyVerdict::safe(),
    }
}
