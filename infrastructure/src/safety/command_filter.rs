//! Regex-based [`CommandFilter`]
//!
//! Each rule is a regular expression paired with the risk level a match
//! raises a command to. A command is classified at the highest level among
//! the rules it matches, `safe` when none match.
//!
//! The built-in rules block commands that destroy a host or its data
//! (`rm -rf /`, `mkfs`, `dd of=/dev/...`, fork bombs, `DROP DATABASE`) and
//! gate commands that change running state (`restart`, `delete`, `apply`,
//! `scale`, ...). Extra rules come from the `[safety]` config section.

use devops_agent_domain::{CommandFilter, RiskLevel, SafetyVerdict};
use regex::Regex;
use thiserror::Error;
use tracing::warn;

/// Never executed
const DEFAULT_BLOCKED_PATTERNS: &[(&str, &str)] = &[
    (
        r"\brm\s+(?:-[a-zA-Z]+\s+)+(?:/|/\*|~/?|\$HOME)(?:\s|$)",
        "recursive delete of the root or home directory",
    ),
    (r"\bmkfs(?:\.\w+)?\b", "formats a filesystem"),
    (r"\bdd\b.*\bof=/dev/", "overwrites a block device"),
    (r">\s*/dev/(?:sd|nvme|xvd|vd)[a-z0-9]*", "writes to a raw disk"),
    (r"\b(?:shutdown|reboot|poweroff|halt)\b", "powers off or restarts the host"),
    (r"\binit\s+[06]\b", "changes the host runlevel"),
    (r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:", "fork bomb"),
    (r"(?i)\bdrop\s+(?:database|schema)\b", "drops a database"),
    (r"\bchmod\s+(?:-R\s+)?0?777\s+/(?:\s|$)", "makes the root directory world-writable"),
    (
        r"\bkubectl\s+delete\s+(?:namespace|ns)\s+kube-system\b",
        "deletes the cluster system namespace",
    ),
];

/// Executed only after approval
const DEFAULT_APPROVAL_PATTERNS: &[(&str, &str)] = &[
    (r"\brm\s", "deletes files"),
    (
        r"\b(?:restart|stop|kill|pkill|killall|delete|apply|scale|drain|cordon|prune|rollback|uninstall)\b",
        "changes running state",
    ),
    (r"\bsystemctl\s+(?:start|reload|enable|disable|mask)\b", "changes a system service"),
    (r"\bsudo\b", "runs with elevated privileges"),
    (r"\b(?:chmod|chown)\b", "changes file permissions"),
    (r"\bgit\s+(?:push|reset|clean)\b", "rewrites a repository"),
    (r"(?i)\b(?:truncate|alter|drop)\s+table\b", "changes a database schema"),
    (r"(?i)\bdelete\s+from\b", "deletes database rows"),
];

/// A user-supplied pattern failed to compile
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid safety pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone)]
struct Rule {
    regex: Regex,
    level: RiskLevel,
    reason: String,
}

/// Command filter driven by regular expressions
#[derive(Debug, Clone, Default)]
pub struct PatternCommandFilter {
    rules: Vec<Rule>,
}

impl PatternCommandFilter {
    /// Filter with no rules; everything is `safe`
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter with the built-in blocked and approval rules
    pub fn with_defaults() -> Self {
        let builtin = DEFAULT_BLOCKED_PATTERNS
            .iter()
            .map(|(p, r)| (*p, *r, RiskLevel::Blocked))
            .chain(
                DEFAULT_APPROVAL_PATTERNS
                    .iter()
                    .map(|(p, r)| (*p, *r, RiskLevel::RequiresApproval)),
            );

        let mut filter = Self::new();
        for (pattern, reason, level) in builtin {
            match Regex::new(pattern) {
                Ok(regex) => filter.rules.push(Rule {
                    regex,
                    level,
                    reason: reason.to_string(),
                }),
                Err(e) => warn!(pattern, error = %e, "Skipping built-in safety pattern"),
            }
        }
        filter
    }

    /// Add a rule that blocks matching commands
    pub fn block(self, pattern: &str) -> Result<Self, FilterError> {
        self.add_rule(pattern, RiskLevel::Blocked, "matches a blocked pattern")
    }

    /// Add a rule that gates matching commands behind approval
    pub fn require_approval(self, pattern: &str) -> Result<Self, FilterError> {
        self.add_rule(pattern, RiskLevel::RequiresApproval, "matches an approval pattern")
    }

    fn add_rule(mut self, pattern: &str, level: RiskLevel, reason: &str) -> Result<Self, FilterError> {
        let regex = Regex::new(pattern).map_err(|source| FilterError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.rules.push(Rule {
            regex,
            level,
            reason: format!("{}: {}", reason, pattern),
        });
        Ok(self)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl CommandFilter for PatternCommandFilter {
    fn check(&self, command: &str) -> SafetyVerdict {
        self.rules
            .iter()
            .filter(|rule| rule.regex.is_match(command))
            .fold(SafetyVerdict::safe(), |verdict, rule| {
                verdict.escalate(SafetyVerdict::new(rule.level, rule.reason.clone()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devops_agent_domain::ToolParameters;

    fn level(command: &str) -> RiskLevel {
        PatternCommandFilter::with_defaults().check(command).level
    }

    #[test]
    fn test_builtin_patterns_compile() {
        let filter = PatternCommandFilter::with_defaults();
        assert_eq!(
            filter.rule_count(),
            DEFAULT_BLOCKED_PATTERNS.len() + DEFAULT_APPROVAL_PATTERNS.len()
        );
    }

    #[test]
    fn test_blocked_commands() {
        for command in [
            "rm -rf /",
            "sudo rm -rf / --no-preserve-root",
            "rm -rf ~",
            "mkfs.ext4 /dev/sdb1",
            "dd if=/dev/zero of=/dev/sda bs=1M",
            "cat image > /dev/sda",
            "shutdown -h now",
            "reboot",
            "init 0",
            ":(){ :|:& };:",
            "psql -c 'DROP DATABASE production'",
            "chmod -R 777 /",
            "kubectl delete ns kube-system",
        ] {
            assert_eq!(level(command), RiskLevel::Blocked, "{}", command);
        }
    }

    #[test]
    fn test_approval_commands() {
        for command in [
            "docker restart web",
            "kubectl delete pod web-1",
            "kubectl apply -f deploy.yaml",
            "kubectl scale deploy/web --replicas=3",
            "systemctl enable nginx",
            "rm /tmp/cache.db",
            "git push origin main",
            "DELETE FROM users",
        ] {
            assert_eq!(level(command), RiskLevel::RequiresApproval, "{}", command);
        }
    }

    #[test]
    fn test_safe_commands() {
        for command in ["docker ps", "kubectl get pods -A", "df -h", "git status", "cat /var/log/syslog"] {
            assert_eq!(level(command), RiskLevel::Safe, "{}", command);
        }
    }

    #[test]
    fn test_scoped_recursive_delete_is_gated_not_blocked() {
        assert_eq!(level("rm -rf /tmp/build"), RiskLevel::RequiresApproval);
    }

    #[test]
    fn test_verdict_reason() {
        let verdict = PatternCommandFilter::with_defaults().check("mkfs /dev/sdb");
        assert_eq!(verdict.reason.as_deref(), Some("formats a filesystem"));
        assert_eq!(PatternCommandFilter::with_defaults().check("uptime"), SafetyVerdict::safe());
    }

    #[test]
    fn test_custom_rules() {
        let filter = PatternCommandFilter::new()
            .block(r"\bterraform\s+destroy\b")
            .unwrap()
            .require_approval(r"\bterraform\s+apply\b")
            .unwrap();

        assert_eq!(filter.check("terraform destroy -auto-approve").level, RiskLevel::Blocked);
        assert_eq!(filter.check("terraform apply").level, RiskLevel::RequiresApproval);
        assert_eq!(filter.check("terraform plan").level, RiskLevel::Safe);
        assert_eq!(
            filter.check("terraform destroy").reason.as_deref(),
            Some(r"matches a blocked pattern: \bterraform\s+destroy\b")
        );
    }

    #[test]
    fn test_invalid_custom_rule() {
        let err = PatternCommandFilter::new().block("(unclosed").unwrap_err();
        assert!(err.to_string().contains("(unclosed"));
    }

    #[test]
    fn test_check_parameters_uses_rules() {
        let mut params = ToolParameters::new();
        params.insert("command".to_string(), serde_json::json!("dd if=/dev/zero of=/dev/sda"));
        params.insert("timeout_secs".to_string(), serde_json::json!(10));

        let verdict = PatternCommandFilter::with_defaults().check_parameters(&params);
        assert_eq!(verdict.level, RiskLevel::Blocked);
    }
}
