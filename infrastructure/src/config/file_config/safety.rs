//! Safety configuration from TOML (`[safety]` section)

use crate::safety::{FilterError, PatternCommandFilter};
use serde::{Deserialize, Serialize};

/// Raw command filter configuration from TOML
///
/// # Example
///
/// ```toml
/// [safety]
/// use_default_patterns = true
/// blocked_patterns = ['\bterraform\s+destroy\b']
/// approval_patterns = ['\bhelm\s+upgrade\b']
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSafetyConfig {
    /// Start from the built-in rules
    pub use_default_patterns: bool,
    /// Extra regular expressions that block a command
    pub blocked_patterns: Vec<String>,
    /// Extra regular expressions that gate a command behind approval
    pub approval_patterns: Vec<String>,
}

impl Default for FileSafetyConfig {
    fn default() -> Self {
        Self {
            use_default_patterns: true,
            blocked_patterns: Vec::new(),
            approval_patterns: Vec::new(),
        }
    }
}

impl FileSafetyConfig {
    /// Compile the configured rules into a filter
    pub fn to_command_filter(&self) -> Result<PatternCommandFilter, FilterError> {
        let mut filter = if self.use_default_patterns {
            PatternCommandFilter::with_defaults()
        } else {
            PatternCommandFilter::new()
        };
        for pattern in &self.blocked_patterns {
            filter = filter.block(pattern)?;
        }
        for pattern in &self.approval_patterns {
            filter = filter.require_approval(pattern)?;
        }
        Ok(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devops_agent_domain::{CommandFilter, RiskLevel};

    #[test]
    fn test_extra_patterns() {
        let config = FileSafetyConfig {
            use_default_patterns: false,
            blocked_patterns: vec![r"\bterraform\s+destroy\b".to_string()],
            approval_patterns: vec![],
        };
        let filter = config.to_command_filter().unwrap();
        assert_eq!(filter.rule_count(), 1);
        assert_eq!(filter.check("terraform destroy").level, RiskLevel::Blocked);
        assert_eq!(filter.check("reboot").level, RiskLevel::Safe);
    }

    #[test]
    fn test_invalid_pattern() {
        let config = FileSafetyConfig {
            approval_patterns: vec!["[".to_string()],
            ..Default::default()
        };
        assert!(config.to_command_filter().is_err());
    }
}
