//! Executing phase: risk gate and tool invocation for each plan step.

use super::session::ChatSession;
use super::types::{ApprovalGate, StepExecution};
use super::{AgentOrchestrator, ChatError};
use crate::ports::approval::{ApprovalDecision, ApprovalRequest};
use crate::ports::conversation_logger::{ConversationEvent, events};
use crate::ports::tool::Tool;
use crate::use_cases::shared::check_cancelled;
use devops_agent_domain::core::string::truncate;
use devops_agent_domain::{AgentMessage, AgentState, PlanStep, RiskLevel, ToolResult};
use serde_json::json;
use tracing::{debug, error, info, warn};

/// Longest tool output kept in a conversation message
const MAX_TOOL_MESSAGE_LEN: usize = 2000;

impl AgentOrchestrator {
    /// Run steps in order, stopping after the first failed result.
    ///
    /// Every executed step is appended to the conversation as a `tool`
    /// message. A step refused for lack of approval is parked on the session
    /// together with the steps that would have followed it.
    pub(super) async fn execute_steps(
        &self,
        session: &mut ChatSession,
        goal: &str,
        steps: &[PlanStep],
        first_gate: ApprovalGate,
    ) -> Result<Vec<ToolResult>, ChatError> {
        let mut results = Vec::with_capacity(steps.len());

        for (index, step) in steps.iter().enumerate() {
            check_cancelled(&self.cancellation_token)?;

            let gate = if index == 0 { first_gate } else { ApprovalGate::Policy };
            let execution = self.execute_step(session, goal, step, gate).await?;
            let success = execution.result.is_success();

            info!(
                step = index + 1,
                tool = %step.tool,
                operation = %step.operation,
                success,
                "Step executed"
            );
            self.conversation_logger.log(ConversationEvent::new(
                events::STEP_EXECUTED,
                json!({
                    "step": index + 1,
                    "tool": step.tool,
                    "operation": step.operation,
                    "parameters": step.parameters,
                    "success": success,
                    "error": execution.result.error,
                    "risk_level": execution.risk,
                }),
            ));
            session.push_message(tool_message(step, &execution));

            if execution.needs_approval {
                let risk = execution.risk.unwrap_or(RiskLevel::RequiresApproval);
                let remaining = steps[index + 1..].to_vec();
                let id = session.park(goal, step.clone(), remaining, risk);
                session.set_state(AgentState::WaitingApproval);
                info!(approval_id = %id, step = %step.label(), "Step parked for approval");
                self.conversation_logger.log(ConversationEvent::new(
                    events::APPROVAL_PARKED,
                    json!({
                        "approval_id": id.0,
                        "tool": step.tool,
                        "operation": step.operation,
                        "risk_level": risk,
                    }),
                ));
            }

            results.push(execution.result);
            if !success {
                break;
            }
        }

        Ok(results)
    }

    /// Classify, gate and run one step.
    pub(super) async fn execute_step(
        &self,
        session: &ChatSession,
        goal: &str,
        step: &PlanStep,
        gate: ApprovalGate,
    ) -> Result<StepExecution, ChatError> {
        let Some(tool) = self.tools.get(&step.tool) else {
            warn!(tool = %step.tool, "Tool not found");
            return Ok(StepExecution::done(
                ToolResult::failure(format!("Tool '{}' not found", step.tool)),
                None,
            ));
        };

        let risk = self.classify(tool.as_ref(), step);
        if risk.is_blocked() {
            warn!(tool = %step.tool, operation = %step.operation, "Blocked operation refused");
            return Ok(StepExecution::done(
                ToolResult::failure(format!("Operation '{}' is blocked for safety", step.operation))
                    .with_risk_level(RiskLevel::Blocked),
                Some(RiskLevel::Blocked),
            ));
        }

        if gate == ApprovalGate::Policy
            && self.config.requires_approval(risk)
            && !self.config.auto_executes_approval_required()
        {
            let Some(approval) = &self.approval else {
                return Ok(StepExecution::awaiting_approval(
                    ToolResult::failure(format!("Operation '{}' requires approval", step.operation))
                        .with_risk_level(risk),
                    risk,
                ));
            };

            session.set_state(AgentState::WaitingApproval);
            let request = ApprovalRequest::new(goal, step.clone(), risk);
            let decision = self.until_cancelled(approval.request_approval(&request)).await?;
            session.set_state(AgentState::Executing);

            match decision {
                Ok(ApprovalDecision::Approve) => {
                    info!(tool = %step.tool, operation = %step.operation, "Step approved");
                }
                Ok(ApprovalDecision::Reject) => {
                    info!(tool = %step.tool, operation = %step.operation, "Step rejected");
                    return Ok(StepExecution::done(
                        ToolResult::failure(format!(
                            "Operation '{}' was rejected by the approver",
                            step.operation
                        ))
                        .with_risk_level(risk),
                        Some(risk),
                    ));
                }
                Err(e) => {
                    warn!(error = %e, "Approval request failed");
                    return Ok(StepExecution::done(
                        ToolResult::failure(e.to_string()).with_risk_level(risk),
                        Some(risk),
                    ));
                }
            }
        }

        let outcome = match tool.build_input(&step.operation, &step.parameters) {
            Ok(input) => self.until_cancelled(tool.execute(input)).await?,
            Err(e) => Err(e),
        };

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                error!(
                    tool = %step.tool,
                    operation = %step.operation,
                    error = %e,
                    "Step execution failed"
                );
                ToolResult::failure(e.to_string()).with_risk_level(risk)
            }
        };
        Ok(StepExecution::done(result, Some(risk)))
    }

    /// Tool classification, escalated by the command filter when one is set.
    fn classify(&self, tool: &dyn Tool, step: &PlanStep) -> RiskLevel {
        let risk = tool.risk_level(&step.operation, &step.parameters);
        let Some(filter) = &self.command_filter else {
            return risk;
        };

        let verdict = filter.check_parameters(&step.parameters);
        if verdict.level > risk {
            debug!(
                tool = %step.tool,
                from = %risk,
                to = %verdict.level,
                reason = verdict.reason.as_deref().unwrap_or(""),
                "Risk escalated by command filter"
            );
        }
        risk.escalate(verdict.level)
    }
}

fn tool_message(step: &PlanStep, execution: &StepExecution) -> AgentMessage {
    let result = &execution.result;
    let body = match result.error() {
        Some(error) if !result.is_success() => format!("Error: {}", error),
        _ => result.data_display(),
    };

    AgentMessage::tool(format!("{}: {}", step.label(), truncate(&body, MAX_TOOL_MESSAGE_LEN)))
        .with_metadata("tool", step.tool.clone())
        .with_metadata("operation", step.operation.clone())
        .with_metadata("success", result.is_success())
        .with_metadata("risk_level", json!(execution.risk))
}
