//! Interactive approval of gated plan steps.
//!
//! When the orchestrator needs a decision, the user sees:
//!
//! ```text
//! ⚠️  Approval required (requires_approval)
//! Goal: Restart the unhealthy web container
//! Step: shell.run
//! Reason: Container is failing health checks
//! Parameters:
//!   command = docker restart web
//! Run this step? [y/N]
//! ```
//!
//! Anything other than an explicit yes rejects the step.

use crate::output::ConsoleFormatter;
use async_trait::async_trait;
use devops_agent_application::{ApprovalDecision, ApprovalError, ApprovalPort, ApprovalRequest};
use std::io::{self, BufRead, Write};

/// Interpret a typed answer. Empty input is a rejection.
pub fn parse_decision(answer: &str) -> Option<ApprovalDecision> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "approve" | "/approve" => Some(ApprovalDecision::Approve),
        "" | "n" | "no" | "reject" | "/reject" => Some(ApprovalDecision::Reject),
        _ => None,
    }
}

/// Interactive approval handler for CLI.
///
/// Implements [`ApprovalPort`] by prompting on stdout and reading stdin.
#[derive(Debug, Default)]
pub struct InteractiveApproval;

impl InteractiveApproval {
    pub fn new() -> Self {
        Self
    }

    /// Prompt until a recognised answer arrives. EOF cancels.
    fn prompt_blocking(request: ApprovalRequest) -> Result<ApprovalDecision, ApprovalError> {
        print!("{}", ConsoleFormatter::approval_request(&request));

        let stdin = io::stdin();
        let mut input = stdin.lock();
        loop {
            print!("Run this step? [y/N] ");
            io::stdout().flush().map_err(|e| ApprovalError::IoError(e.to_string()))?;

            let mut line = String::new();
            let read = input
                .read_line(&mut line)
                .map_err(|e| ApprovalError::IoError(e.to_string()))?;
            if read == 0 {
                return Err(ApprovalError::Cancelled);
            }
            match parse_decision(&line) {
                Some(decision) => return Ok(decision),
                None => println!("Please answer 'y' or 'n'."),
            }
        }
    }
}

#[async_trait]
impl ApprovalPort for InteractiveApproval {
    async fn request_approval(&self, request: &ApprovalRequest) -> Result<ApprovalDecision, ApprovalError> {
        let request = request.clone();
        tokio::task::spawn_blocking(move || Self::prompt_blocking(request))
            .await
            .map_err(|e| ApprovalError::IoError(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decision() {
        assert_eq!(parse_decision("y\n"), Some(ApprovalDecision::Approve));
        assert_eq!(parse_decision("  YES "), Some(ApprovalDecision::Approve));
        assert_eq!(parse_decision("/approve"), Some(ApprovalDecision::Approve));
        assert_eq!(parse_decision("\n"), Some(ApprovalDecision::Reject));
        assert_eq!(parse_decision("no"), Some(ApprovalDecision::Reject));
        assert_eq!(parse_decision("maybe"), None);
    }
}
