//! Prompt templates for the orchestrator

use crate::agent::plan::ExecutionPlan;
use crate::tool::entities::ToolDescriptor;
use crate::tool::value_objects::ToolResult;

/// Persona and safety rules sent with every conversational call.
const SYSTEM_PROMPT: &str = r#"You are a DevOps AI Agent that helps engineers with daily tasks.

Core Principles:
1. Safety First: Never execute destructive commands without approval
2. Transparency: Explain what you're doing and why
3. Accuracy: Verify information before presenting it
4. Helpfulness: Provide actionable recommendations

When suggesting commands:
- Use explicit flags (no aliases)
- Include comments explaining non-obvious options
- Show the expected output
- Explain any risks

You have access to tools for Docker, Kubernetes, Helm, Terraform, Ansible, Git, and shell commands.
Always prefer read-only operations when possible.
"#;

/// Templates for generating orchestrator prompts
pub struct AgentPromptTemplate;

impl AgentPromptTemplate {
    /// System prompt for direct answers and synthesis (never for planning)
    pub fn system() -> &'static str {
        SYSTEM_PROMPT
    }

    /// Planning prompt: the request plus the full tool catalog, asking for
    /// a JSON plan.
    pub fn planning(user_input: &str, tools: &[ToolDescriptor]) -> String {
        let catalog = serde_json::to_string_pretty(tools).unwrap_or_else(|_| "[]".to_string());

        format!(
            r#"
You are a DevOps AI Agent. Analyze the user's request and create a plan.

User Request: {user_input}

Available Tools:
{catalog}

Respond in JSON format:
{{
    "goal": "Clear statement of what the user wants",
    "needs_tools": true/false,
    "steps": [
        {{
            "tool": "tool_name",
            "operation": "operation_name",
            "parameters": {{}},
            "reason": "Why this step is needed"
        }}
    ],
    "risk_assessment": "safe|read_only|requires_approval",
    "clarifying_questions": ["question1", "question2"]  // if ambiguous
}}

Rules:
- Use tools only when necessary
- Prefer read-only operations
- Flag any destructive operations
- Ask questions if the request is ambiguous
"#
        )
    }

    /// Synthesis prompt: per-step outcomes in execution order.
    pub fn synthesis(plan: &ExecutionPlan, results: &[ToolResult]) -> String {
        let mut prompt = format!(
            "\nYou are a DevOps AI Agent. Summarize the results for the user.\n\nGoal: {}\n\nExecution Results:\n",
            plan.goal
        );

        for (i, result) in results.iter().enumerate() {
            prompt.push_str(&format!("\nStep {}:\n", i + 1));
            prompt.push_str(&format!("  Success: {}\n", result.success));
            prompt.push_str(&format!("  Data: {}\n", result.data_display()));
            if let Some(error) = result.error() {
                prompt.push_str(&format!("  Error: {}\n", error));
            }
            if !result.warnings.is_empty() {
                prompt.push_str(&format!("  Warnings: {}\n", result.warnings.join("; ")));
            }
        }

        prompt.push_str(
            r#"

Provide a clear summary:
1. What was done
2. Key findings
3. Any issues or warnings
4. Recommended next steps
"#,
        );
        prompt
    }

    /// Text streamed back when the planner needs more information.
    pub fn clarification(questions: &[String]) -> String {
        let mut text = String::from("I need a bit more information before I can help:\n");
        for question in questions {
            text.push_str(&format!("- {}\n", question));
        }
        text
    }
}
