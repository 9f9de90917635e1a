//! Planning phase: ask the model for a JSON plan and parse it.

use super::{AgentOrchestrator, ChatError};
use crate::ports::conversation_logger::{ConversationEvent, events};
use crate::ports::llm_client::{GenerateRequest, ResponseFormat};
use devops_agent_domain::core::string::truncate;
use devops_agent_domain::{AgentPromptTemplate, ExecutionPlan, parse_plan_response};
use serde_json::json;
use tracing::{debug, info, warn};

impl AgentOrchestrator {
    /// Turn a request into an [`ExecutionPlan`].
    ///
    /// An unparseable model response is not an error: it degrades to a
    /// zero-step plan so the request is answered directly. Only model
    /// client failures (and cancellation) are returned as `Err`.
    pub async fn plan(&self, user_input: &str) -> Result<ExecutionPlan, ChatError> {
        let catalog = self.tools.list_all();
        let prompt = AgentPromptTemplate::planning(user_input, &catalog);
        debug!(tools = catalog.len(), "Requesting plan");

        let request = GenerateRequest::new(&self.config.model, prompt)
            .with_format(ResponseFormat::Json)
            .with_temperature(self.config.planning_temperature)
            .with_max_tokens(self.config.max_tokens);
        let response = self.until_cancelled(self.llm.generate(request)).await??;

        match parse_plan_response(&response, user_input) {
            Ok(plan) => {
                info!(
                    goal = %plan.goal,
                    steps = plan.estimated_steps(),
                    risk = %plan.risk_assessment,
                    "Plan created"
                );
                self.conversation_logger.log(ConversationEvent::new(
                    events::PLAN_CREATED,
                    json!({
                        "goal": plan.goal,
                        "steps": plan.steps,
                        "risk_assessment": plan.risk_assessment,
                        "clarifying_questions": plan.clarifying_questions,
                    }),
                ));
                Ok(plan)
            }
            Err(e) => {
                warn!(error = %e, response = %truncate(&response, 500), "Plan parse failed, answering directly");
                self.conversation_logger.log(ConversationEvent::new(
                    events::PLAN_PARSE_FAILED,
                    json!({ "error": e.to_string(), "response": response }),
                ));
                Ok(ExecutionPlan::direct(user_input))
            }
        }
    }
}
