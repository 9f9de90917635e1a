//! Responding phase: stream the final answer and close the turn.

use super::session::{ChatSession, TurnGuard};
use super::types::Reply;
use super::{AgentOrchestrator, ChatError};
use crate::ports::conversation_logger::{ConversationEvent, events};
use crate::ports::llm_client::{ChatMessage, ChatRequest, TextStream};
use async_stream::stream;
use devops_agent_domain::{AgentMessage, AgentPromptTemplate, AgentState, ExecutionPlan, ToolResult};
use futures::{Stream, StreamExt};
use serde_json::json;
use tracing::info;

impl AgentOrchestrator {
    /// Stream `reply`, then append the full text as one assistant message
    /// and return the session to `idle`.
    ///
    /// `preamble` is streamed first (the step failure line, if any).
    pub(super) fn respond<'a>(
        &'a self,
        session: &'a mut ChatSession,
        mut guard: TurnGuard,
        preamble: Option<String>,
        reply: Reply,
    ) -> impl Stream<Item = Result<String, ChatError>> + Send + use<'a> {
        stream! {
            let mut response = String::new();
            if let Some(line) = preamble {
                response.push_str(&line);
                yield Ok(line);
            }

            session.set_state(AgentState::Responding);
            let opened: Result<TextStream, ChatError> = match reply {
                Reply::Text(text) => Ok(futures::stream::iter([Ok(text)]).boxed()),
                Reply::Direct(user_input) => self.open_stream(self.direct_request(&user_input)).await,
                Reply::Synthesis { plan, results } => {
                    self.open_stream(self.synthesis_request(&plan, &results)).await
                }
            };
            let mut chunks = match opened {
                Ok(chunks) => chunks,
                Err(e) => {
                    self.fail_turn(&mut guard, &e);
                    yield Err(e);
                    return;
                }
            };

            loop {
                match self.next_chunk(&mut chunks).await {
                    Ok(Some(chunk)) => {
                        response.push_str(&chunk);
                        yield Ok(chunk);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        self.fail_turn(&mut guard, &e);
                        yield Err(e);
                        return;
                    }
                }
            }

            info!(response_len = response.len(), "Chat completed");
            self.conversation_logger.log(ConversationEvent::new(
                events::CHAT_COMPLETED,
                json!({ "response": response }),
            ));
            session.push_message(AgentMessage::assistant(response));
            guard.finish(AgentState::Idle);
        }
    }

    /// System prompt plus the bare user input
    fn direct_request(&self, user_input: &str) -> ChatRequest {
        self.chat_request(user_input.to_string())
    }

    /// System prompt plus the per-step synthesis prompt
    fn synthesis_request(&self, plan: &ExecutionPlan, results: &[ToolResult]) -> ChatRequest {
        self.chat_request(AgentPromptTemplate::synthesis(plan, results))
    }

    fn chat_request(&self, user_prompt: String) -> ChatRequest {
        ChatRequest::new(
            &self.config.model,
            vec![
                ChatMessage::system(AgentPromptTemplate::system()),
                ChatMessage::user(user_prompt),
            ],
        )
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens)
    }

    async fn open_stream(&self, request: ChatRequest) -> Result<TextStream, ChatError> {
        Ok(self.until_cancelled(self.llm.chat_stream(request)).await??)
    }

    async fn next_chunk(&self, chunks: &mut TextStream) -> Result<Option<String>, ChatError> {
        let next = self.until_cancelled(chunks.next()).await?;
        Ok(next.transpose()?)
    }
}
