//! Per-conversation state.

use devops_agent_domain::{AgentMessage, AgentState, ApprovalId, PendingApproval, PlanStep, RiskLevel};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// One conversation: its state, message log and parked approvals.
///
/// [`AgentOrchestrator::chat`](super::AgentOrchestrator::chat) borrows the
/// session mutably for as long as its stream lives, so a session can only
/// have one turn in flight.
#[derive(Debug)]
pub struct ChatSession {
    state: Arc<watch::Sender<AgentState>>,
    messages: Vec<AgentMessage>,
    pending: Vec<PendingApproval>,
    next_approval_id: u64,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        let (state, _) = watch::channel(AgentState::Idle);
        Self {
            state: Arc::new(state),
            messages: Vec::new(),
            pending: Vec::new(),
            next_approval_id: 1,
        }
    }

    /// Current state snapshot
    pub fn get_state(&self) -> AgentState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change, including those made
    /// while a turn's stream is being consumed.
    pub fn subscribe_state(&self) -> watch::Receiver<AgentState> {
        self.state.subscribe()
    }

    /// Copy of the conversation log
    pub fn get_conversation_history(&self) -> Vec<AgentMessage> {
        self.messages.clone()
    }

    /// Empty the conversation log. State and pending approvals are kept.
    pub fn clear_context(&mut self) {
        let cleared = self.messages.len();
        self.messages.clear();
        info!(cleared, "Context cleared");
    }

    pub fn pending_approvals(&self) -> &[PendingApproval] {
        &self.pending
    }

    // ==================== Turn bookkeeping ====================

    pub(super) fn set_state(&self, state: AgentState) {
        self.state.send_replace(state);
    }

    pub(super) fn push_message(&mut self, message: AgentMessage) {
        self.messages.push(message);
    }

    pub(super) fn park(
        &mut self,
        goal: &str,
        step: PlanStep,
        remaining: Vec<PlanStep>,
        risk_level: RiskLevel,
    ) -> ApprovalId {
        let id = ApprovalId(self.next_approval_id);
        self.next_approval_id += 1;
        self.pending
            .push(PendingApproval::new(id, goal, step, remaining, risk_level));
        id
    }

    pub(super) fn take_pending(&mut self, id: ApprovalId) -> Option<PendingApproval> {
        let index = self.pending.iter().position(|p| p.id == id)?;
        Some(self.pending.remove(index))
    }
}

/// Resets the session to `idle` if a turn's stream is dropped before the
/// turn finished.
pub(super) struct TurnGuard {
    state: Arc<watch::Sender<AgentState>>,
    armed: bool,
}

impl TurnGuard {
    pub fn new(session: &ChatSession) -> Self {
        Self {
            state: Arc::clone(&session.state),
            armed: true,
        }
    }

    /// Record the final state of the turn and disarm the guard.
    pub fn finish(&mut self, state: AgentState) {
        self.state.send_replace(state);
        self.armed = false;
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_replace(AgentState::Idle);
        }
    }
}
