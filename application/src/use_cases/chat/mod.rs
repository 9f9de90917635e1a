//! Chat use case
//!
//! Drives one conversational turn through three phases:
//!
//! | Phase          | State              | Model call          |
//! |----------------|--------------------|---------------------|
//! | 1. Planning    | `thinking`         | `generate` (JSON)   |
//! | 2. Executing   | `executing`        | none (tools)        |
//! | 3. Responding  | `responding`       | `chat_stream`       |
//!
//! A plan with zero steps skips phase 2 and is answered directly (or, when
//! the planner asked clarifying questions, answered with the questions).
//! Steps run strictly in order and stop at the first failure.
//!
//! The orchestrator itself is stateless between turns; everything that
//! belongs to one conversation lives in [`ChatSession`].

mod approval;
mod execution;
mod planning;
mod session;
mod synthesis;
mod types;

pub use session::ChatSession;
pub use types::ChatError;

use session::TurnGuard;
use types::{ApprovalGate, Reply};

use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger, events};
use crate::ports::approval::ApprovalPort;
use crate::ports::llm_client::LlmClient;
use crate::ports::tool_registry::ToolRegistryPort;
use crate::use_cases::shared::{check_cancelled, until_cancelled};
use async_stream::stream;
use devops_agent_domain::{
    AgentConfig, AgentMessage, AgentState, AgentPromptTemplate, ClarificationPolicy, CommandFilter, ToolResult,
};
use futures::Stream;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Plans, executes and answers chat turns.
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct AgentOrchestrator {
    pub(super) llm: Arc<dyn LlmClient>,
    pub(super) tools: Arc<dyn ToolRegistryPort>,
    pub(super) command_filter: Option<Arc<dyn CommandFilter>>,
    pub(super) approval: Option<Arc<dyn ApprovalPort>>,
    pub(super) conversation_logger: Arc<dyn ConversationLogger>,
    pub(super) cancellation_token: Option<CancellationToken>,
    pub(super) config: AgentConfig,
}

impl AgentOrchestrator {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Arc<dyn ToolRegistryPort>, config: AgentConfig) -> Self {
        Self {
            llm,
            tools,
            command_filter: None,
            approval: None,
            conversation_logger: Arc::new(NoConversationLogger),
            cancellation_token: None,
            config,
        }
    }

    /// Escalate step risk with a command filter
    pub fn with_command_filter(mut self, filter: Arc<dyn CommandFilter>) -> Self {
        self.command_filter = Some(filter);
        self
    }

    /// Ask this port before running gated steps instead of parking them
    pub fn with_approval(mut self, approval: Arc<dyn ApprovalPort>) -> Self {
        self.approval = Some(approval);
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run one turn and stream the answer chunk by chunk.
    ///
    /// The session is borrowed for as long as the stream lives. Model
    /// failures and cancellation are reported as a single `Err` item, after
    /// which the stream ends with the session in `error`. Dropping the
    /// stream early abandons the turn and leaves the session `idle`.
    pub fn chat<'a>(
        &'a self,
        session: &'a mut ChatSession,
        user_input: &str,
    ) -> impl Stream<Item = Result<String, ChatError>> + Send + use<'a> {
        let user_input = user_input.to_string();

        stream! {
            let mut guard = TurnGuard::new(session);
            info!(user_input = %user_input, "Chat started");
            self.conversation_logger.log(ConversationEvent::new(
                events::CHAT_STARTED,
                json!({ "user_input": user_input }),
            ));
            session.push_message(AgentMessage::user(user_input.clone()));

            session.set_state(AgentState::Thinking);
            let plan = match check_cancelled(&self.cancellation_token) {
                Ok(()) => self.plan(&user_input).await,
                Err(e) => Err(e),
            };
            let plan = match plan {
                Ok(plan) => plan,
                Err(e) => {
                    self.fail_turn(&mut guard, &e);
                    yield Err(e);
                    return;
                }
            };

            if !plan.needs_tools() {
                let reply = if plan.needs_clarification()
                    && self.config.clarification == ClarificationPolicy::Surface
                {
                    info!(questions = plan.clarifying_questions.len(), "Surfacing clarifying questions");
                    Reply::Text(AgentPromptTemplate::clarification(&plan.clarifying_questions))
                } else {
                    Reply::Direct(user_input)
                };
                for await item in self.respond(session, guard, None, reply) {
                    yield item;
                }
                return;
            }

            session.set_state(AgentState::Executing);
            let results = match self
                .execute_steps(session, &plan.goal, &plan.steps, ApprovalGate::Policy)
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
            for await item in self.respond(session, guard, failure, Reply::Synthesis { plan, results }) {
                yield item;
            }
        }
    }

    /// Empty the session's conversation log and record it in the transcript.
    pub fn clear_context(&self, session: &mut ChatSession) {
        session.clear_context();
        self.conversation_logger
            .log(ConversationEvent::new(events::CONTEXT_CLEARED, json!({})));
    }

    // ==================== Internals ====================

    pub(super) async fn until_cancelled<F: Future>(&self, future: F) -> Result<F::Output, ChatError> {
        until_cancelled(&self.cancellation_token, future).await
    }

    pub(super) fn fail_turn(&self, guard: &mut TurnGuard, error: &ChatError) {
        warn!(error = %error, "Chat turn failed");
        self.conversation_logger.log(ConversationEvent::new(
            events::CHAT_FAILED,
            json!({ "error": error.to_string() }),
        ));
        guard.finish(AgentState::Error);
    }
}

/// The line streamed when a step failed; only the last result can be a failure.
pub(super) fn step_failure_line(results: &[ToolResult]) -> Option<String> {
    results
        .last()
        .filter(|result| !result.is_success())
        .map(|result| format!("❌ Step failed: {}\n", result.error().unwrap_or("unknown error")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::approval::{ApprovalDecision, ApprovalError, ApprovalRequest};
    use crate::ports::llm_client::{ChatRequest, GatewayError, GenerateRequest, ResponseFormat, TextStream};
    use crate::ports::tool::{Tool, ToolError};
    use async_trait::async_trait;
    use devops_agent_domain::{
        ApprovalId, PlanStep, RiskLevel, Role, SafetyVerdict, ToolDescriptor, ToolInput, ToolParameters,
    };
    use futures::StreamExt;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    // ==================== Mocks ====================

    /// How the mock answers one `chat_stream` call
    enum ScriptedReply {
        Chunks(Vec<&'static str>),
        Error(GatewayError),
        /// Stream some chunks, then fail
        BreaksAfter(Vec<&'static str>, GatewayError),
        /// Never yields anything
        Hang,
    }

    /// LLM client that returns scripted plans and replies in order
    struct ScriptedLlm {
        plans: Mutex<VecDeque<Result<String, GatewayError>>>,
        replies: Mutex<VecDeque<ScriptedReply>>,
        generate_requests: Mutex<Vec<GenerateRequest>>,
        chat_requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedLlm {
        fn new() -> Self {
            Self {
                plans: Mutex::new(VecDeque::new()),
                replies: Mutex::new(VecDeque::new()),
                generate_requests: Mutex::new(Vec::new()),
                chat_requests: Mutex::new(Vec::new()),
            }
        }

        fn with_plan(self, response: impl Into<String>) -> Self {
            self.plans.lock().unwrap().push_back(Ok(response.into()));
            self
        }

        fn with_plan_error(self, error: GatewayError) -> Self {
            self.plans.lock().unwrap().push_back(Err(error));
            self
        }

        fn with_reply(self, chunks: Vec<&'static str>) -> Self {
            self.with_script(ScriptedReply::Chunks(chunks))
        }

        fn with_script(self, reply: ScriptedReply) -> Self {
            self.replies.lock().unwrap().push_back(reply);
            self
        }

        fn generate_requests(&self) -> Vec<GenerateRequest> {
            self.generate_requests.lock().unwrap().clone()
        }

        fn chat_requests(&self) -> Vec<ChatRequest> {
            self.chat_requests.lock().unwrap().clone()
        }

        /// User prompt of the n-th chat request
        fn chat_prompt(&self, index: usize) -> String {
            self.chat_requests()[index].messages[1].content.clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn generate(&self, request: GenerateRequest) -> Result<String, GatewayError> {
            self.generate_requests.lock().unwrap().push(request);
            self.plans
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("{}".to_string()))
        }

        async fn chat_stream(&self, request: ChatRequest) -> Result<TextStream, GatewayError> {
            self.chat_requests.lock().unwrap().push(request);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(ScriptedReply::Chunks(vec!["(default reply)"]));

            let to_items = |chunks: Vec<&'static str>| {
                chunks
                    .into_iter()
                    .map(|c| Ok(c.to_string()))
                    .collect::<Vec<Result<String, GatewayError>>>()
            };
            match reply {
                ScriptedReply::Chunks(chunks) => Ok(futures::stream::iter(to_items(chunks)).boxed()),
                ScriptedReply::Error(e) => Err(e),
                ScriptedReply::BreaksAfter(chunks, e) => {
                    let mut items = to_items(chunks);
                    items.push(Err(e));
                    Ok(futures::stream::iter(items).boxed())
                }
                ScriptedReply::Hang => Ok(futures::stream::pending().boxed()),
            }
        }
    }

    /// Tool with a fixed classification that records every execution
    struct RecordingTool {
        name: &'static str,
        risk: RiskLevel,
        outcome: Result<ToolResult, ToolError>,
        calls: Mutex<Vec<ToolInput>>,
    }

    impl RecordingTool {
        fn new(name: &'static str, risk: RiskLevel) -> Arc<Self> {
            Self::with_outcome(name, risk, Ok(ToolResult::success(format!("{} output", name))))
        }

        fn with_outcome(
            name: &'static str,
            risk: RiskLevel,
            outcome: Result<ToolResult, ToolError>,
        ) -> Arc<Self> {
            Arc::new(Self {
                name,
                risk,
                outcome,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Tool for RecordingTool {
        fn name(&self) -> &str {
            self.name
        }

        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new(self.name, format!("{} tool", self.name))
        }

        fn risk_level(&self, _operation: &str, _parameters: &ToolParameters) -> RiskLevel {
            self.risk
        }

        fn build_input(&self, operation: &str, parameters: &ToolParameters) -> Result<ToolInput, ToolError> {
            Ok(ToolInput::new(operation, parameters.clone()))
        }

        async fn execute(&self, input: ToolInput) -> Result<ToolResult, ToolError> {
            self.calls.lock().unwrap().push(input);
            self.outcome.clone()
        }
    }

    struct MapRegistry {
        tools: HashMap<String, Arc<dyn Tool>>,
    }

    impl MapRegistry {
        fn new(tools: &[Arc<RecordingTool>]) -> Self {
            let tools = tools
                .iter()
                .map(|t| (t.name.to_string(), Arc::clone(t) as Arc<dyn Tool>))
                .collect();
            Self { tools }
        }
    }

    impl ToolRegistryPort for MapRegistry {
        fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
            self.tools.get(name).cloned()
        }

        fn list_all(&self) -> Vec<ToolDescriptor> {
            let mut all: Vec<_> = self.tools.values().map(|t| t.descriptor()).collect();
            all.sort_by(|a, b| a.name.cmp(&b.name));
            all
        }
    }

    struct RecordingLogger {
        events: Mutex<Vec<&'static str>>,
    }

    impl RecordingLogger {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
            })
        }

        fn events(&self) -> Vec<&'static str> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ConversationLogger for RecordingLogger {
        fn log(&self, event: ConversationEvent) {
            self.events.lock().unwrap().push(event.event_type);
        }
    }

    /// Approval port returning a pre-configured decision
    struct ScriptedApproval {
        decision: Result<ApprovalDecision, ApprovalError>,
        requests: Mutex<Vec<ApprovalRequest>>,
    }

    impl ScriptedApproval {
        fn new(decision: Result<ApprovalDecision, ApprovalError>) -> Arc<Self> {
            Arc::new(Self {
                decision,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ApprovalPort for ScriptedApproval {
        async fn request_approval(&self, request: &ApprovalRequest) -> Result<ApprovalDecision, ApprovalError> {
            self.requests.lock().unwrap().push(request.clone());
            self.decision.clone()
        }
    }

    /// Blocks any parameter mentioning `rm -rf`
    struct RmFilter;

    impl CommandFilter for RmFilter {
        fn check(&self, command: &str) -> devops_agent_domain::SafetyVerdict {
            if command.contains("rm -rf") {
                SafetyVerdict::new(RiskLevel::Blocked, "recursive delete")
            } else {
                SafetyVerdict::safe()
            }
        }
    }

    // ==================== Helpers ====================

    fn orchestrator(llm: &Arc<ScriptedLlm>, tools: &[Arc<RecordingTool>], config: AgentConfig) -> AgentOrchestrator {
        AgentOrchestrator::new(llm.clone(), Arc::new(MapRegistry::new(tools)), config)
    }

    async fn run(
        orchestrator: &AgentOrchestrator,
        session: &mut ChatSession,
        input: &str,
    ) -> Vec<Result<String, ChatError>> {
        orchestrator.chat(session, input).collect().await
    }

    fn text(items: &[Result<String, ChatError>]) -> String {
        items.iter().filter_map(|item| item.as_ref().ok()).cloned().collect()
    }

    fn plan_with_steps(steps: serde_json::Value) -> String {
        json!({
            "goal": "Inspect the environment",
            "needs_tools": true,
            "steps": steps,
            "risk_assessment": "read_only"
        })
        .to_string()
    }

    fn step(tool: &str, operation: &str) -> serde_json::Value {
        json!({"tool": tool, "operation": operation, "parameters": {}, "reason": "test"})
    }

    // ==================== Direct answers ====================

    #[tokio::test]
    async fn test_zero_step_plan_answers_directly() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .with_plan(r#"{"goal": "Explain pods", "needs_tools": false, "steps": [], "risk_assessment": "safe"}"#)
                .with_reply(vec!["A pod is ", "the smallest unit."]),
        );
        let docker = RecordingTool::new("docker", RiskLevel::ReadOnly);
        let orchestrator = orchestrator(&llm, &[docker.clone()], AgentConfig::default());
        let mut session = ChatSession::new();

        let items = run(&orchestrator, &mut session, "what is a pod?").await;

        assert_eq!(text(&items), "A pod is the smallest unit.");
        assert!(items.iter().all(|item| item.is_ok()));
        assert_eq!(docker.call_count(), 0);
        assert_eq!(session.get_state(), AgentState::Idle);

        let request = &llm.chat_requests()[0];
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, AgentPromptTemplate::system());
        assert_eq!(request.messages[1].content, "what is a pod?");
        assert_eq!(request.temperature, 0.5);

        let history = session.get_conversation_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role(), Role::User);
        assert_eq!(history[0].content(), "what is a pod?");
        assert_eq!(history[1].role(), Role::Assistant);
        assert_eq!(history[1].content(), "A pod is the smallest unit.");
    }

    #[tokio::test]
    async fn test_malformed_plan_falls_back_to_direct_answer() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .with_plan("Sure, let me check the containers for you!")
                .with_reply(vec!["Here is how to list containers."]),
        );
        let docker = RecordingTool::new("docker", RiskLevel::ReadOnly);
        let logger = RecordingLogger::new();
        let orchestrator = orchestrator(&llm, &[docker.clone()], AgentConfig::default())
            .with_conversation_logger(logger.clone());
        let mut session = ChatSession::new();

        let items = run(&orchestrator, &mut session, "list containers").await;

        assert_eq!(text(&items), "Here is how to list containers.");
        assert_eq!(docker.call_count(), 0);
        assert_eq!(llm.chat_prompt(0), "list containers");
        assert!(logger.events().contains(&events::PLAN_PARSE_FAILED));
    }

    #[tokio::test]
    async fn test_plan_degrades_on_malformed_json() {
        let llm = Arc::new(ScriptedLlm::new().with_plan("{not json"));
        let orchestrator = orchestrator(&llm, &[], AgentConfig::default());

        let plan = orchestrator.plan("check disk usage").await.unwrap();
        assert_eq!(plan.estimated_steps(), 0);
        assert_eq!(plan.risk_assessment, devops_agent_domain::RiskAssessment::Safe);
        assert_eq!(plan.goal, "check disk usage");
    }

    #[tokio::test]
    async fn test_plan_request_uses_json_format_and_catalog() {
        let llm = Arc::new(ScriptedLlm::new().with_plan(r#"{"steps": []}"#));
        let docker = RecordingTool::new("docker", RiskLevel::ReadOnly);
        let config = AgentConfig::default();
        let orchestrator = orchestrator(&llm, &[docker], config.clone());

        orchestrator.plan("list containers").await.unwrap();

        let request = &llm.generate_requests()[0];
        assert_eq!(request.format, ResponseFormat::Json);
        assert_eq!(request.temperature, config.planning_temperature);
        assert_eq!(request.model, config.model);
        assert!(request.prompt.contains("User Request: list containers"));
        assert!(request.prompt.contains("\"name\": \"docker\""));
    }

    #[tokio::test]
    async fn test_clarifying_questions_are_surfaced() {
        let llm = Arc::new(
            ScriptedLlm::new().with_plan(r#"{"goal": "Restart", "steps": [], "clarifying_questions": ["Which namespace?"]}"#),
        );
        let orchestrator = orchestrator(&llm, &[], AgentConfig::default());
        let mut session = ChatSession::new();

        let items = run(&orchestrator, &mut session, "restart the service").await;

        assert!(text(&items).contains("- Which namespace?"));
        assert!(llm.chat_requests().is_empty());
        assert_eq!(session.get_state(), AgentState::Idle);
        assert_eq!(session.get_conversation_history()[1].role(), Role::Assistant);
    }

    #[tokio::test]
    async fn test_clarifying_questions_can_be_ignored() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .with_plan(r#"{"clarifying_questions": ["Which namespace?"]}"#)
                .with_reply(vec!["Restarting usually means..."]),
        );
        let config = AgentConfig::default().with_clarification(ClarificationPolicy::AnswerDirectly);
        let orchestrator = orchestrator(&llm, &[], config);
        let mut session = ChatSession::new();

        let items = run(&orchestrator, &mut session, "restart the service").await;

        assert_eq!(text(&items), "Restarting usually means...");
        assert_eq!(llm.chat_prompt(0), "restart the service");
    }

    // ==================== Tool execution ====================

    #[tokio::test]
    async fn test_list_containers_scenario() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .with_plan(plan_with_steps(json!([
                    {"tool": "docker", "operation": "ps", "parameters": {"all": false}, "reason": "List running containers"}
                ])))
                .with_reply(vec!["Two containers are running: web and db."]),
        );
        let docker = RecordingTool::with_outcome(
            "docker",
            RiskLevel::ReadOnly,
            Ok(ToolResult::success("web\ndb").with_risk_level(RiskLevel::ReadOnly)),
        );
        let logger = RecordingLogger::new();
        let orchestrator = orchestrator(&llm, &[docker.clone()], AgentConfig::default())
            .with_conversation_logger(logger.clone());
        let mut session = ChatSession::new();

        let items = run(&orchestrator, &mut session, "list all running containers").await;

        assert_eq!(text(&items), "Two containers are running: web and db.");
        assert_eq!(docker.call_count(), 1);
        let input = docker.calls.lock().unwrap()[0].clone();
        assert_eq!(input.operation, "ps");
        assert_eq!(input.parameters["all"], false);

        let synthesis = llm.chat_prompt(0);
        assert!(synthesis.contains("Goal: Inspect the environment"));
        assert!(synthesis.contains("Step 1:"));
        assert!(synthesis.contains("Data: web\ndb"));

        let history = session.get_conversation_history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].role(), Role::Tool);
        assert_eq!(history[1].metadata()["tool"], "docker");
        assert_eq!(history[1].metadata()["operation"], "ps");
        assert_eq!(history[1].metadata()["success"], true);
        assert_eq!(history[1].metadata()["risk_level"], "read_only");
        assert_eq!(history[2].content(), "Two containers are running: web and db.");
        assert_eq!(session.get_state(), AgentState::Idle);

        assert_eq!(
            logger.events(),
            vec![
                events::CHAT_STARTED,
                events::PLAN_CREATED,
                events::STEP_EXECUTED,
                events::CHAT_COMPLETED
            ]
        );
    }

    #[tokio::test]
    async fn test_fail_fast_stops_after_failed_step() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .with_plan(plan_with_steps(json!([
                    step("git", "status"),
                    step("kubectl", "get"),
                    step("helm", "list")
                ])))
                .with_reply(vec!["Summary"]),
        );
        let git = RecordingTool::new("git", RiskLevel::ReadOnly);
        let kubectl = RecordingTool::with_outcome(
            "kubectl",
            RiskLevel::ReadOnly,
            Ok(ToolResult::failure("connection refused")),
        );
        let helm = RecordingTool::new("helm", RiskLevel::ReadOnly);
        let orchestrator = orchestrator(&llm, &[git.clone(), kubectl.clone(), helm.clone()], AgentConfig::default());
        let mut session = ChatSession::new();

        let items = run(&orchestrator, &mut session, "check everything").await;

        assert_eq!(git.call_count(), 1);
        assert_eq!(kubectl.call_count(), 1);
        assert_eq!(helm.call_count(), 0);
        assert_eq!(items[0], Ok("❌ Step failed: connection refused\n".to_string()));
        assert_eq!(text(&items), "❌ Step failed: connection refused\nSummary");

        let synthesis = llm.chat_prompt(0);
        assert!(synthesis.contains("Step 2:"));
        assert!(synthesis.contains("Success: false"));
        assert!(!synthesis.contains("Step 3:"));
    }

    #[tokio::test]
    async fn test_blocked_operation_never_executes() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .with_plan(plan_with_steps(json!([step("postgres", "drop_database")])))
                .with_reply(vec!["I refused to drop the database."]),
        );
        let postgres = RecordingTool::new("postgres", RiskLevel::Blocked);
        let orchestrator = orchestrator(&llm, &[postgres.clone()], AgentConfig::default());
        let mut session = ChatSession::new();

        let items = run(&orchestrator, &mut session, "delete the production database").await;

        assert_eq!(postgres.call_count(), 0);
        assert!(text(&items).starts_with("❌ Step failed: Operation 'drop_database' is blocked for safety\n"));
        let history = session.get_conversation_history();
        assert_eq!(history[1].metadata()["success"], false);
        assert_eq!(history[1].metadata()["risk_level"], "blocked");
    }

    #[tokio::test]
    async fn test_execute_step_reports_blocked_risk_level() {
        let llm = Arc::new(ScriptedLlm::new());
        let postgres = RecordingTool::new("postgres", RiskLevel::Blocked);
        let orchestrator = orchestrator(&llm, &[postgres.clone()], AgentConfig::default());
        let session = ChatSession::new();

        let execution = orchestrator
            .execute_step(&session, "goal", &PlanStep::new("postgres", "drop_database"), ApprovalGate::Approved)
            .await
            .unwrap();

        assert!(!execution.result.success);
        assert_eq!(execution.result.risk_level, Some(RiskLevel::Blocked));
        assert_eq!(postgres.call_count(), 0);
    }

    #[tokio::test]
    async fn test_command_filter_escalates_to_blocked() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .with_plan(plan_with_steps(json!([
                    {"tool": "shell", "operation": "run", "parameters": {"command": "rm -rf /var/lib"}}
                ])))
                .with_reply(vec!["Refused."]),
        );
        let shell = RecordingTool::new("shell", RiskLevel::ReadOnly);
        let orchestrator =
            orchestrator(&llm, &[shell.clone()], AgentConfig::default()).with_command_filter(Arc::new(RmFilter));
        let mut session = ChatSession::new();

        let items = run(&orchestrator, &mut session, "clean up disk").await;

        assert_eq!(shell.call_count(), 0);
        assert!(text(&items).contains("Operation 'run' is blocked for safety"));
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_step() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .with_plan(plan_with_steps(json!([step("terraform", "plan")])))
                .with_reply(vec!["No terraform available."]),
        );
        let orchestrator = orchestrator(&llm, &[], AgentConfig::default());
        let mut session = ChatSession::new();

        let items = run(&orchestrator, &mut session, "plan infra").await;

        assert_eq!(items[0], Ok("❌ Step failed: Tool 'terraform' not found\n".to_string()));
        let history = session.get_conversation_history();
        assert!(history[1].metadata()["risk_level"].is_null());
    }

    #[tokio::test]
    async fn test_tool_error_becomes_failed_step() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .with_plan(plan_with_steps(json!([step("docker", "logs")])))
                .with_reply(vec!["The command failed."]),
        );
        let docker = RecordingTool::with_outcome(
            "docker",
            RiskLevel::ReadOnly,
            Err(ToolError::ExecutionFailed("exit status 1".to_string())),
        );
        let orchestrator = orchestrator(&llm, &[docker.clone()], AgentConfig::default());
        let mut session = ChatSession::new();

        let items = run(&orchestrator, &mut session, "show logs").await;

        assert_eq!(docker.call_count(), 1);
        assert_eq!(items[0], Ok("❌ Step failed: Execution failed: exit status 1\n".to_string()));
        assert_eq!(session.get_conversation_history()[1].metadata()["risk_level"], "read_only");
        assert_eq!(session.get_state(), AgentState::Idle);
    }

    // ==================== Approval ====================

    #[tokio::test]
    async fn test_approval_required_runs_when_auto_execute_enabled() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .with_plan(plan_with_steps(json!([step("docker", "restart")])))
                .with_reply(vec!["Restarted."]),
        );
        let docker = RecordingTool::new("docker", RiskLevel::RequiresApproval);
        let orchestrator = orchestrator(&llm, &[docker.clone()], AgentConfig::default());
        let mut session = ChatSession::new();

        let items = run(&orchestrator, &mut session, "restart web").await;

        assert_eq!(docker.call_count(), 1);
        assert_eq!(text(&items), "Restarted.");
        assert!(session.pending_approvals().is_empty());
    }

    #[tokio::test]
    async fn test_approval_required_is_parked_when_auto_execute_disabled() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .with_plan(plan_with_steps(json!([step("docker", "restart"), step("kubectl", "get")])))
                .with_reply(vec!["Restart needs approval."])
                .with_reply(vec!["Restarted and verified."]),
        );
        let docker = RecordingTool::new("docker", RiskLevel::RequiresApproval);
        let kubectl = RecordingTool::new("kubectl", RiskLevel::ReadOnly);
        let logger = RecordingLogger::new();
        let config = AgentConfig::default().with_auto_execute(false);
        let orchestrator = orchestrator(&llm, &[docker.clone(), kubectl.clone()], config)
            .with_conversation_logger(logger.clone());
        let mut session = ChatSession::new();

        let items = run(&orchestrator, &mut session, "restart web").await;

        assert_eq!(docker.call_count(), 0);
        assert_eq!(kubectl.call_count(), 0);
        assert_eq!(items[0], Ok("❌ Step failed: Operation 'restart' requires approval\n".to_string()));
        assert_eq!(session.get_state(), AgentState::Idle);
        assert!(logger.events().contains(&events::APPROVAL_PARKED));

        let pending = session.pending_approvals();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, ApprovalId(1));
        assert_eq!(pending[0].step.label(), "docker.restart");
        assert_eq!(pending[0].remaining.len(), 1);
        assert_eq!(pending[0].risk_level, RiskLevel::RequiresApproval);

        let items: Vec<_> = orchestrator
            .resume_approved(&mut session, ApprovalId(1))
            .collect()
            .await;

        assert_eq!(text(&items), "Restarted and verified.");
        assert_eq!(docker.call_count(), 1);
        assert_eq!(kubectl.call_count(), 1);
        assert!(session.pending_approvals().is_empty());
        assert_eq!(session.get_state(), AgentState::Idle);
        assert!(llm.chat_prompt(1).contains("Step 2:"));
    }

    #[tokio::test]
    async fn test_empty_approval_list_still_parks_gated_step() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .with_plan(plan_with_steps(json!([step("docker", "restart")])))
                .with_reply(vec!["Needs approval."]),
        );
        let docker = RecordingTool::new("docker", RiskLevel::RequiresApproval);
        let config = AgentConfig::default()
            .with_auto_execute(false)
            .with_require_approval_for(vec![]);
        let orchestrator = orchestrator(&llm, &[docker.clone()], config);
        let mut session = ChatSession::new();

        run(&orchestrator, &mut session, "restart web").await;

        assert_eq!(docker.call_count(), 0);
        assert_eq!(session.pending_approvals().len(), 1);
    }

    #[tokio::test]
    async fn test_resume_unknown_approval() {
        let llm = Arc::new(ScriptedLlm::new());
        let orchestrator = orchestrator(&llm, &[], AgentConfig::default());
        let mut session = ChatSession::new();

        let items: Vec<_> = orchestrator
            .resume_approved(&mut session, ApprovalId(7))
            .collect()
            .await;

        assert_eq!(items, vec![Err(ChatError::ApprovalNotFound(ApprovalId(7)))]);
        assert_eq!(session.get_state(), AgentState::Idle);
    }

    #[tokio::test]
    async fn test_resumed_step_is_still_refused_when_blocked() {
        let llm = Arc::new(ScriptedLlm::new().with_reply(vec!["Refused."]));
        let shell = RecordingTool::new("shell", RiskLevel::RequiresApproval);
        let config = AgentConfig::default().with_auto_execute(false);
        let orchestrator =
            orchestrator(&llm, &[shell.clone()], config).with_command_filter(Arc::new(RmFilter));
        let mut session = ChatSession::new();
        let id = session.park(
            "Clean up",
            PlanStep::new("shell", "run").with_param("command", "rm -rf /"),
            vec![],
            RiskLevel::RequiresApproval,
        );

        let items: Vec<_> = orchestrator.resume_approved(&mut session, id).collect().await;

        assert_eq!(shell.call_count(), 0);
        assert!(text(&items).contains("is blocked for safety"));
    }

    #[tokio::test]
    async fn test_cancelled_resume_keeps_approval_parked() {
        let llm = Arc::new(ScriptedLlm::new());
        let docker = RecordingTool::new("docker", RiskLevel::RequiresApproval);
        let token = CancellationToken::new();
        let config = AgentConfig::default().with_auto_execute(false);
        let orchestrator = orchestrator(&llm, &[docker.clone()], config).with_cancellation(token.clone());
        let mut session = ChatSession::new();
        let id = session.park(
            "Restart web",
            PlanStep::new("docker", "restart"),
            vec![],
            RiskLevel::RequiresApproval,
        );

        // Dropped before it was ever polled
        drop(orchestrator.resume_approved(&mut session, id));
        assert_eq!(session.pending_approvals().len(), 1);

        token.cancel();
        let items: Vec<_> = orchestrator.resume_approved(&mut session, id).collect().await;

        assert_eq!(items, vec![Err(ChatError::Cancelled)]);
        assert_eq!(docker.call_count(), 0);
        assert_eq!(session.pending_approvals().len(), 1);
        assert_eq!(session.pending_approvals()[0].id, id);
        assert_eq!(session.get_state(), AgentState::Error);
    }

    #[tokio::test]
    async fn test_reject_pending_records_rejection() {
        let llm = Arc::new(ScriptedLlm::new());
        let orchestrator = orchestrator(&llm, &[], AgentConfig::default());
        let mut session = ChatSession::new();
        let id = session.park(
            "Restart web",
            PlanStep::new("docker", "restart"),
            vec![],
            RiskLevel::RequiresApproval,
        );

        let rejected = orchestrator.reject_pending(&mut session, id).unwrap();
        assert_eq!(rejected.step.operation, "restart");
        assert!(session.pending_approvals().is_empty());

        let history = session.get_conversation_history();
        let last = history.last().unwrap();
        assert_eq!(last.role(), Role::Tool);
        assert_eq!(last.metadata()["success"], false);
        assert_eq!(last.metadata()["risk_level"], "requires_approval");

        assert_eq!(
            orchestrator.reject_pending(&mut session, id).unwrap_err(),
            ChatError::ApprovalNotFound(id)
        );
    }

    #[tokio::test]
    async fn test_approval_port_approves() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .with_plan(plan_with_steps(json!([step("docker", "restart")])))
                .with_reply(vec!["Restarted."]),
        );
        let docker = RecordingTool::new("docker", RiskLevel::RequiresApproval);
        let approval = ScriptedApproval::new(Ok(ApprovalDecision::Approve));
        let orchestrator = orchestrator(&llm, &[docker.clone()], AgentConfig::default().with_auto_execute(false))
            .with_approval(approval.clone());
        let mut session = ChatSession::new();

        let items = run(&orchestrator, &mut session, "restart web").await;

        assert_eq!(text(&items), "Restarted.");
        assert_eq!(docker.call_count(), 1);
        let requests = approval.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].goal, "Inspect the environment");
        assert_eq!(requests[0].risk_level, RiskLevel::RequiresApproval);
        assert!(session.pending_approvals().is_empty());
    }

    #[tokio::test]
    async fn test_approval_port_rejects() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .with_plan(plan_with_steps(json!([step("docker", "restart")])))
                .with_reply(vec!["Not restarted."]),
        );
        let docker = RecordingTool::new("docker", RiskLevel::RequiresApproval);
        let approval = ScriptedApproval::new(Ok(ApprovalDecision::Reject));
        let orchestrator = orchestrator(&llm, &[docker.clone()], AgentConfig::default().with_auto_execute(false))
            .with_approval(approval);
        let mut session = ChatSession::new();

        let items = run(&orchestrator, &mut session, "restart web").await;

        assert_eq!(docker.call_count(), 0);
        assert_eq!(
            items[0],
            Ok("❌ Step failed: Operation 'restart' was rejected by the approver\n".to_string())
        );
        assert!(session.pending_approvals().is_empty());
    }

    #[tokio::test]
    async fn test_approval_port_error_fails_step() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .with_plan(plan_with_steps(json!([step("docker", "restart")])))
                .with_reply(vec!["Could not ask."]),
        );
        let docker = RecordingTool::new("docker", RiskLevel::RequiresApproval);
        let approval = ScriptedApproval::new(Err(ApprovalError::IoError("terminal closed".to_string())));
        let orchestrator = orchestrator(&llm, &[docker.clone()], AgentConfig::default().with_auto_execute(false))
            .with_approval(approval);
        let mut session = ChatSession::new();

        let items = run(&orchestrator, &mut session, "restart web").await;

        assert_eq!(docker.call_count(), 0);
        assert_eq!(items[0], Ok("❌ Step failed: I/O error: terminal closed\n".to_string()));
    }

    #[tokio::test]
    async fn test_read_only_never_asks_for_approval() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .with_plan(plan_with_steps(json!([step("docker", "ps")])))
                .with_reply(vec!["ok"]),
        );
        let docker = RecordingTool::new("docker", RiskLevel::ReadOnly);
        let approval = ScriptedApproval::new(Ok(ApprovalDecision::Reject));
        let orchestrator = orchestrator(&llm, &[docker.clone()], AgentConfig::default().with_auto_execute(false))
            .with_approval(approval.clone());
        let mut session = ChatSession::new();

        run(&orchestrator, &mut session, "list containers").await;

        assert_eq!(docker.call_count(), 1);
        assert!(approval.requests.lock().unwrap().is_empty());
    }

    // ==================== Failures and cancellation ====================

    #[tokio::test]
    async fn test_gateway_error_during_planning() {
        let llm = Arc::new(
            ScriptedLlm::new().with_plan_error(GatewayError::ConnectionError("connection refused".to_string())),
        );
        let orchestrator = orchestrator(&llm, &[], AgentConfig::default());
        let mut session = ChatSession::new();

        let items = run(&orchestrator, &mut session, "hello").await;

        assert_eq!(
            items,
            vec![Err(ChatError::Gateway(GatewayError::ConnectionError(
                "connection refused".to_string()
            )))]
        );
        assert_eq!(session.get_state(), AgentState::Error);
        assert!(llm.chat_requests().is_empty());
        assert_eq!(session.get_conversation_history().len(), 1);
    }

    #[tokio::test]
    async fn test_gateway_error_opening_reply_stream() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .with_plan("{}")
                .with_script(ScriptedReply::Error(GatewayError::ModelNotAvailable("qwen2.5:7b".to_string()))),
        );
        let orchestrator = orchestrator(&llm, &[], AgentConfig::default());
        let mut session = ChatSession::new();

        let items = run(&orchestrator, &mut session, "hello").await;

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(ChatError::Gateway(GatewayError::ModelNotAvailable(_)))));
        assert_eq!(session.get_state(), AgentState::Error);
    }

    #[tokio::test]
    async fn test_gateway_error_mid_stream() {
        let llm = Arc::new(ScriptedLlm::new().with_plan("{}").with_script(ScriptedReply::BreaksAfter(
            vec!["partial "],
            GatewayError::RequestFailed("stream reset".to_string()),
        )));
        let orchestrator = orchestrator(&llm, &[], AgentConfig::default());
        let mut session = ChatSession::new();

        let items = run(&orchestrator, &mut session, "hello").await;

        assert_eq!(items[0], Ok("partial ".to_string()));
        assert!(matches!(items[1], Err(ChatError::Gateway(_))));
        assert_eq!(items.len(), 2);
        assert_eq!(session.get_state(), AgentState::Error);
        // The partial answer is not recorded
        assert_eq!(session.get_conversation_history().len(), 1);
    }

    #[tokio::test]
    async fn test_new_turn_starts_from_error_state() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .with_plan_error(GatewayError::Timeout)
                .with_plan("{}")
                .with_reply(vec!["Back online."]),
        );
        let orchestrator = orchestrator(&llm, &[], AgentConfig::default());
        let mut session = ChatSession::new();

        run(&orchestrator, &mut session, "hello").await;
        assert_eq!(session.get_state(), AgentState::Error);

        let items = run(&orchestrator, &mut session, "hello again").await;
        assert_eq!(text(&items), "Back online.");
        assert_eq!(session.get_state(), AgentState::Idle);
    }

    #[tokio::test]
    async fn test_cancelled_before_planning() {
        let llm = Arc::new(ScriptedLlm::new());
        let token = CancellationToken::new();
        token.cancel();
        let orchestrator = orchestrator(&llm, &[], AgentConfig::default()).with_cancellation(token);
        let mut session = ChatSession::new();

        let items = run(&orchestrator, &mut session, "hello").await;

        assert_eq!(items, vec![Err(ChatError::Cancelled)]);
        assert!(llm.generate_requests().is_empty());
        assert_eq!(session.get_state(), AgentState::Error);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_hanging_stream() {
        let llm = Arc::new(ScriptedLlm::new().with_plan("{}").with_script(ScriptedReply::Hang));
        let token = CancellationToken::new();
        let orchestrator = orchestrator(&llm, &[], AgentConfig::default()).with_cancellation(token.clone());
        let mut session = ChatSession::new();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            token.cancel();
        });
        let items = run(&orchestrator, &mut session, "hello").await;
        canceller.await.unwrap();

        assert_eq!(items, vec![Err(ChatError::Cancelled)]);
        assert_eq!(session.get_state(), AgentState::Error);
    }

    #[tokio::test]
    async fn test_dropping_stream_resets_state_to_idle() {
        let llm = Arc::new(ScriptedLlm::new().with_plan("{}").with_reply(vec!["first", "second"]));
        let orchestrator = orchestrator(&llm, &[], AgentConfig::default());
        let mut session = ChatSession::new();
        let state = session.subscribe_state();

        {
            let mut stream = Box::pin(orchestrator.chat(&mut session, "hello"));
            assert_eq!(stream.next().await, Some(Ok("first".to_string())));
            assert_eq!(*state.borrow(), AgentState::Responding);
        }

        assert_eq!(session.get_state(), AgentState::Idle);
        // Only the user message made it into the log
        assert_eq!(session.get_conversation_history().len(), 1);
    }

    // ==================== Context ====================

    #[tokio::test]
    async fn test_clear_context_empties_history() {
        let llm = Arc::new(ScriptedLlm::new().with_plan("{}").with_reply(vec!["hi"]));
        let logger = RecordingLogger::new();
        let orchestrator =
            orchestrator(&llm, &[], AgentConfig::default()).with_conversation_logger(logger.clone());
        let mut session = ChatSession::new();

        run(&orchestrator, &mut session, "hello").await;
        assert_eq!(session.get_conversation_history().len(), 2);

        orchestrator.clear_context(&mut session);
        assert!(session.get_conversation_history().is_empty());
        assert_eq!(logger.events().last(), Some(&events::CONTEXT_CLEARED));
    }

    #[test]
    fn test_step_failure_line() {
        assert_eq!(step_failure_line(&[]), None);
        assert_eq!(step_failure_line(&[ToolResult::success("ok")]), None);
        assert_eq!(
            step_failure_line(&[ToolResult::success("ok"), ToolResult::failure("boom")]),
            Some("❌ Step failed: boom\n".to_string())
        );
    }
}
