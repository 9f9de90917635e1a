//! Console output formatter for the chat REPL

use colored::Colorize;
use devops_agent_application::{ApprovalRequest, ChatError};
use devops_agent_domain::core::string::truncate;
use devops_agent_domain::{AgentMessage, AgentState, PendingApproval, RiskLevel, Role};

/// Longest message excerpt shown by `/history`
const HISTORY_EXCERPT: usize = 160;

/// Formats REPL output for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Banner shown when the REPL starts
    pub fn welcome(model: &str, tools: &[&str]) -> String {
        let mut output = String::new();
        output.push_str(&Self::header("DevOps Agent - Chat Mode"));
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Model:".cyan().bold(), model));
        let tools = if tools.is_empty() {
            "(none)".to_string()
        } else {
            tools.join(", ")
        };
        output.push_str(&format!("{} {}\n\n", "Tools:".cyan().bold(), tools));
        output.push_str(&Self::help());
        output
    }

    pub fn help() -> String {
        let commands = [
            ("/help", "Show this help"),
            ("/state", "Show the agent state"),
            ("/history", "Show the conversation so far"),
            ("/clear", "Forget the conversation"),
            ("/pending", "List steps waiting for approval"),
            ("/approve ID", "Run a parked step and continue its plan"),
            ("/reject ID", "Discard a parked step"),
            ("/quit", "Exit chat"),
        ];
        let mut output = format!("{}\n", "Commands:".bold());
        for (command, description) in commands {
            output.push_str(&format!("  {:<12} - {}\n", command, description));
        }
        output
    }

    pub fn state(state: AgentState) -> String {
        let label = match state {
            AgentState::Idle => state.display_name().green(),
            AgentState::Error => state.display_name().red(),
            AgentState::WaitingApproval => state.display_name().yellow(),
            _ => state.display_name().cyan(),
        };
        format!("{} {}", "State:".bold(), label)
    }

    /// One line per message, oldest first
    pub fn history(messages: &[AgentMessage]) -> String {
        if messages.is_empty() {
            return format!("{}\n", "(no messages)".dimmed());
        }
        messages
            .iter()
            .map(|message| {
                let role = format!("[{}]", message.role().as_str());
                let role = match message.role() {
                    Role::User => role.green().bold(),
                    Role::Assistant => role.cyan().bold(),
                    Role::Tool => role.yellow().bold(),
                    Role::System => role.dimmed(),
                };
                let excerpt = truncate(&message.content().replace('\n', " "), HISTORY_EXCERPT);
                format!("{} {} {}\n", message.timestamp().format("%H:%M:%S").to_string().dimmed(), role, excerpt)
            })
            .collect()
    }

    pub fn pending(approvals: &[PendingApproval]) -> String {
        if approvals.is_empty() {
            return format!("{}\n", "No steps are waiting for approval.".dimmed());
        }
        let mut output = format!("{}\n", "Waiting for approval:".yellow().bold());
        for approval in approvals {
            output.push_str(&format!("  {}\n", approval.summary()));
        }
        output.push_str(&format!(
            "{}\n",
            "Use /approve ID to run a step or /reject ID to discard it.".dimmed()
        ));
        output
    }

    /// Shown before asking the user to approve a step
    pub fn approval_request(request: &ApprovalRequest) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{}\n", Self::risk_badge(request.risk_level)));
        output.push_str(&format!("{} {}\n", "Goal:".cyan().bold(), request.goal));
        output.push_str(&format!("{} {}\n", "Step:".cyan().bold(), request.step.label()));
        if !request.step.reason.is_empty() {
            output.push_str(&format!("{} {}\n", "Reason:".cyan().bold(), request.step.reason));
        }
        if !request.step.parameters.is_empty() {
            output.push_str(&format!("{}\n", "Parameters:".cyan().bold()));
            for (name, value) in &request.step.parameters {
                let value = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                output.push_str(&format!("  {} = {}\n", name, value));
            }
        }
        output
    }

    pub fn error(err: &ChatError) -> String {
        if err.is_cancelled() {
            format!("{}", "Cancelled.".yellow())
        } else {
            format!("{} {}", "Error:".red().bold(), err)
        }
    }

    fn risk_badge(risk: RiskLevel) -> String {
        let text = format!("⚠️  Approval required ({})", risk);
        match risk {
            RiskLevel::Blocked => text.red().bold().to_string(),
            _ => text.yellow().bold().to_string(),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devops_agent_domain::{ApprovalId, PlanStep};

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_help_lists_every_command() {
        plain();
        let help = ConsoleFormatter::help();
        for command in ["/help", "/state", "/history", "/clear", "/pending", "/approve", "/reject", "/quit"] {
            assert!(help.contains(command), "{}", command);
        }
    }

    #[test]
    fn test_welcome() {
        plain();
        let text = ConsoleFormatter::welcome("qwen2.5:7b", &["shell"]);
        assert!(text.contains("Model: qwen2.5:7b"));
        assert!(text.contains("Tools: shell"));
        assert!(ConsoleFormatter::welcome("m", &[]).contains("(none)"));
    }

    #[test]
    fn test_history() {
        plain();
        let messages = vec![
            AgentMessage::user("list containers"),
            AgentMessage::tool("shell.run: web\ndb"),
        ];
        let text = ConsoleFormatter::history(&messages);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[user] list containers"));
        assert!(lines[1].ends_with("[tool] shell.run: web db"));
        assert!(ConsoleFormatter::history(&[]).contains("no messages"));
    }

    #[test]
    fn test_pending() {
        plain();
        let approvals = vec![PendingApproval::new(
            ApprovalId(1),
            "Restart web",
            PlanStep::new("shell", "run").with_param("command", "docker restart web"),
            vec![],
            RiskLevel::RequiresApproval,
        )];
        let text = ConsoleFormatter::pending(&approvals);
        assert!(text.contains("#1 shell.run [requires_approval]"));
        assert!(ConsoleFormatter::pending(&[]).contains("No steps"));
    }

    #[test]
    fn test_approval_request() {
        plain();
        let request = ApprovalRequest::new(
            "Restart web",
            PlanStep::new("shell", "run")
                .with_param("command", "docker restart web")
                .with_reason("Container is unhealthy"),
            RiskLevel::RequiresApproval,
        );
        let text = ConsoleFormatter::approval_request(&request);
        assert!(text.contains("Approval required (requires_approval)"));
        assert!(text.contains("Step: shell.run"));
        assert!(text.contains("Reason: Container is unhealthy"));
        assert!(text.contains("command = docker restart web"));
    }

    #[test]
    fn test_error() {
        plain();
        assert_eq!(ConsoleFormatter::error(&ChatError::Cancelled), "Cancelled.");
        assert!(ConsoleFormatter::error(&ChatError::ApprovalNotFound(ApprovalId(9))).starts_with("Error:"));
    }
}
