//! Plan parsing from LLM responses.
//!
//! The planning prompt asks for a JSON object:
//!
//! ```json
//! {
//!   "goal": "string",
//!   "needs_tools": true,
//!   "steps": [
//!     {"tool": "docker", "operation": "ps", "parameters": {}, "reason": "..."}
//!   ],
//!   "risk_assessment": "safe|read_only|requires_approval",
//!   "clarifying_questions": ["..."]
//! }
//! ```
//!
//! The model output is untrusted. Every field is optional, enumerations are
//! parsed into closed types, and the caller decides what to do with a
//! [`PlanParseError`] (the orchestrator falls back to a direct answer).

use super::plan::{ExecutionPlan, PlanStep, RiskAssessment};
use crate::tool::entities::ToolParameters;
use serde_json::Value;
use thiserror::Error;

/// The model response could not be read as a plan object
#[derive(Debug, Error)]
pub enum PlanParseError {
    #[error("Malformed plan JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("Plan response is not a JSON object")]
    NotAnObject,
}

/// Parse a planning response into an [`ExecutionPlan`].
///
/// Accepts raw JSON or JSON wrapped in a markdown code fence
/// (` ```json `, ` ```plan ` or a bare fence).
pub fn parse_plan_response(response: &str, user_input: &str) -> Result<ExecutionPlan, PlanParseError> {
    let body = strip_code_fence(response);
    let value: Value = serde_json::from_str(body)?;
    parse_plan_json(&value, user_input)
}

/// Build a plan from an already-decoded JSON value.
///
/// - non-empty `clarifying_questions` wins over everything else and yields
///   a zero-step clarification plan
/// - a missing `goal` defaults to the user input
/// - missing `steps` default to none
/// - a missing `risk_assessment` defaults to `safe`; an unknown one to
///   `requires_approval`
pub fn parse_plan_json(value: &Value, user_input: &str) -> Result<ExecutionPlan, PlanParseError> {
    let object = value.as_object().ok_or(PlanParseError::NotAnObject)?;

    let questions = object
        .get("clarifying_questions")
        .map(parse_questions)
        .unwrap_or_default();
    if !questions.is_empty() {
        return Ok(ExecutionPlan::clarification(questions));
    }

    let goal = object
        .get("goal")
        .and_then(Value::as_str)
        .filter(|g| !g.trim().is_empty())
        .unwrap_or(user_input);

    let steps = object
        .get("steps")
        .and_then(Value::as_array)
        .map(|steps| steps.iter().map(parse_step).collect())
        .unwrap_or_default();

    let risk_assessment = match object.get("risk_assessment") {
        None | Some(Value::Null) => RiskAssessment::Safe,
        Some(Value::String(label)) => RiskAssessment::from_label(label),
        Some(_) => RiskAssessment::RequiresApproval,
    };

    Ok(ExecutionPlan::new(goal, steps, risk_assessment))
}

/// Non-object steps are kept with an empty tool name so that they fail
/// visibly at execution time instead of silently shortening the plan.
fn parse_step(value: &Value) -> PlanStep {
    let Some(step) = value.as_object() else {
        return PlanStep::new("", "");
    };

    let text = |key: &str| {
        step.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let parameters: ToolParameters = step
        .get("parameters")
        .and_then(Value::as_object)
        .map(|params| params.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    PlanStep {
        tool: text("tool"),
        operation: text("operation"),
        parameters,
        reason: text("reason"),
    }
}

fn parse_questions(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|q| !q.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Remove a surrounding markdown code fence, if any.
fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string (`json`, `plan`, ...) on the opening line
    let Some(newline) = rest.find('\n') else {
        return trimmed;
    };
    let body = &rest[newline + 1..];
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_plan() {
        let response = r#"{
            "goal": "List running containers",
            "needs_tools": true,
            "steps": [
                {
                    "tool": "docker",
                    "operation": "ps",
                    "parameters": {"all": false},
                    "reason": "Show running containers"
                }
            ],
            "risk_assessment": "read_only"
        }"#;

        let plan = parse_plan_response(response, "list all running containers").unwrap();
        assert_eq!(plan.goal, "List running containers");
        assert_eq!(plan.estimated_steps(), 1);
        assert_eq!(plan.steps[0].tool, "docker");
        assert_eq!(plan.steps[0].operation, "ps");
        assert_eq!(plan.steps[0].parameters["all"], false);
        assert_eq!(plan.steps[0].reason, "Show running containers");
        assert_eq!(plan.risk_assessment, RiskAssessment::ReadOnly);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let result = parse_plan_response("Sure! I'll list the containers.", "list containers");
        assert!(matches!(result, Err(PlanParseError::MalformedJson(_))));
    }

    #[test]
    fn test_non_object_is_an_error() {
        let result = parse_plan_response(r#"["docker", "ps"]"#, "list containers");
        assert!(matches!(result, Err(PlanParseError::NotAnObject)));
    }

    #[test]
    fn test_no_tools_needed() {
        let response =
            r#"{"goal": "Explain pods", "needs_tools": false, "steps": [], "risk_assessment": "safe"}"#;
        let plan = parse_plan_response(response, "what is a pod?").unwrap();
        assert_eq!(plan.estimated_steps(), 0);
        assert_eq!(plan.risk_assessment, RiskAssessment::Safe);
        assert!(!plan.needs_clarification());
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let plan = parse_plan_response("{}", "check disk usage").unwrap();
        assert_eq!(plan.goal, "check disk usage");
        assert!(plan.steps.is_empty());
        assert_eq!(plan.risk_assessment, RiskAssessment::Safe);
    }

    #[test]
    fn test_unknown_risk_label_is_conservative() {
        let plan = parse_plan_response(
            r#"{"goal": "g", "steps": [], "risk_assessment": "yolo"}"#,
            "input",
        )
        .unwrap();
        assert_eq!(plan.risk_assessment, RiskAssessment::RequiresApproval);

        let plan = parse_plan_response(r#"{"risk_assessment": 3}"#, "input").unwrap();
        assert_eq!(plan.risk_assessment, RiskAssessment::RequiresApproval);
    }

    #[test]
    fn test_clarifying_questions_produce_zero_step_plan() {
        let response = r#"{
            "goal": "Restart something",
            "steps": [{"tool": "docker", "operation": "restart", "parameters": {}}],
            "risk_assessment": "requires_approval",
            "clarifying_questions": ["Which container?", "Which host?"]
        }"#;
        let plan = parse_plan_response(response, "restart it").unwrap();
        assert_eq!(plan.goal, "Clarification needed");
        assert_eq!(plan.estimated_steps(), 0);
        assert_eq!(plan.risk_assessment, RiskAssessment::Safe);
        assert_eq!(plan.clarifying_questions, vec!["Which container?", "Which host?"]);
    }

    #[test]
    fn test_empty_clarifying_questions_are_ignored() {
        let response = r#"{"goal": "g", "steps": [], "clarifying_questions": []}"#;
        let plan = parse_plan_response(response, "input").unwrap();
        assert!(!plan.needs_clarification());
        assert_eq!(plan.goal, "g");
    }

    #[test]
    fn test_fenced_json() {
        let response = "```json\n{\"goal\": \"Show pods\", \"steps\": [{\"tool\": \"kubectl\", \"operation\": \"get\"}]}\n```";
        let plan = parse_plan_response(response, "show pods").unwrap();
        assert_eq!(plan.goal, "Show pods");
        assert_eq!(plan.steps[0].tool, "kubectl");
    }

    #[test]
    fn test_malformed_steps_are_kept() {
        let response = r#"{"goal": "g", "steps": ["docker ps", {"tool": "git", "operation": "status", "parameters": "oops"}]}"#;
        let plan = parse_plan_response(response, "input").unwrap();
        assert_eq!(plan.estimated_steps(), 2);
        assert_eq!(plan.steps[0].tool, "");
        assert_eq!(plan.steps[1].tool, "git");
        assert!(plan.steps[1].parameters.is_empty());
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```plan\n{\"goal\": 1}\n```\n"), "{\"goal\": 1}");
        assert_eq!(strip_code_fence("```"), "```");
    }
}
