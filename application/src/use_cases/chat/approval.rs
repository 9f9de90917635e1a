//! Follow-up on parked approvals.

use super::session::{ChatSession, TurnGuard};
use super::types::{ApprovalGate, Reply};
use super::{AgentOrchestrator, ChatError, step_failure_line};
use crate::ports::conversation_logger::{ConversationEvent, events};
use crate::use_cases::shared::check_cancelled;
use async_stream::stream;
use devops_agent_domain::{AgentMessage, AgentState, ApprovalId, ExecutionPlan, PendingApproval, RiskAssessment};
use futures::Stream;
use serde_json::json;
use tracing::info;

impl AgentOrchestrator {
    /// Run a parked step now that a human approved it, continue with the
    /// steps that followed it and stream the summary.
    ///
    /// The approved step skips the approval gate but is re-classified, so an
    /// operation that is now blocked is still refused. The remaining steps
    /// go through the normal policy. A turn cancelled or dropped before the
    /// step runs leaves the approval parked.
    pub fn resume_approved<'a>(
        &'a self,
        session: &'a mut ChatSession,
        id: ApprovalId,
    ) -> impl Stream<Item = Result<String, ChatError>> + Send + use<'a> {
        stream! {
            if !session.pending_approvals().iter().any(|p| p.id == id) {
                yield Err(ChatError::ApprovalNotFound(id));
                return;
            }

            let mut guard = TurnGuard::new(session);
            if let Err(e) = check_cancelled(&self.cancellation_token) {
                self.fail_turn(&mut guard, &e);
                yield Err(e);
                return;
            }

            // Only leaves the session once the step is about to run
            let Some(pending) = session.take_pending(id) else {
                guard.finish(AgentState::Idle);
                yield Err(ChatError::ApprovalNotFound(id));
                return;
            };
            info!(approval_id = %id, step = %pending.step.label(), "Resuming approved step");

            let PendingApproval { goal, step, remaining, .. } = pending;
            let mut steps = Vec::with_capacity(remaining.len() + 1);
            steps.push(step);
            steps.extend(remaining);

            session.set_state(AgentState::Executing);
            let results = match self
                .execute_steps(session, &goal, &steps, ApprovalGate::Approved)
                .await
            {
                Ok(results) => results,
                Err(e) => {
                    self.fail_turn(&mut guard, &e);
                    yield Err(e);
                    return;
                }
            };

            let failure = step_failure_line(&results);
            let plan = ExecutionPlan::new(goal, steps, RiskAssessment::RequiresApproval);
            for await item in self.respond(session, guard, failure, Reply::Synthesis { plan, results }) {
                yield item;
            }
        }
    }

    /// Drop a parked step without running it.
    ///
    /// The rejection is recorded in the conversation as a failed `tool`
    /// message.
    pub fn reject_pending(&self, session: &mut ChatSession, id: ApprovalId) -> Result<PendingApproval, ChatError> {
        let pending = session.take_pending(id).ok_or(ChatError::ApprovalNotFound(id))?;

        info!(approval_id = %id, step = %pending.step.label(), "Pending approval rejected");
        self.conversation_logger.log(ConversationEvent::new(
            events::APPROVAL_REJECTED,
            json!({
                "approval_id": id.0,
                "tool": pending.step.tool,
                "operation": pending.step.operation,
            }),
        ));
        session.push_message(
            AgentMessage::tool(format!(
                "{}: Operation '{}' was rejected by the user",
                pending.step.label(),
                pending.step.operation
            ))
            .with_metadata("tool", pending.step.tool.clone())
            .with_metadata("operation", pending.step.operation.clone())
            .with_metadata("success", false)
            .with_metadata("risk_level", pending.risk_level.as_str())
            .with_metadata("approval_id", id.0),
        );

        Ok(pending)
    }
}
