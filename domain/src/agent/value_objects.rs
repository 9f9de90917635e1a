//! Agent domain value objects

use super::plan::PlanStep;
use crate::tool::entities::RiskLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a parked approval, unique within one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApprovalId(pub u64);

impl std::fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ApprovalId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_start_matches('#').parse().map(ApprovalId)
    }
}

/// A step that was refused for lack of approval, parked so that a human
/// can approve it later and resume the rest of the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingApproval {
    pub id: ApprovalId,
    /// Goal of the plan the step belongs to
    pub goal: String,
    /// The gated step
    pub step: PlanStep,
    /// Steps that came after the gated one and never ran
    pub remaining: Vec<PlanStep>,
    pub risk_level: RiskLevel,
    pub requested_at: DateTime<Utc>,
}

impl PendingApproval {
    pub fn new(
        id: ApprovalId,
        goal: impl Into<String>,
        step: PlanStep,
        remaining: Vec<PlanStep>,
        risk_level: RiskLevel,
    ) -> Self {
        Self {
            id,
            goal: goal.into(),
            step,
            remaining,
            risk_level,
            requested_at: Utc::now(),
        }
    }

    /// One-line description for listings
    pub fn summary(&self) -> String {
        let mut summary = format!("#{} {} [{}]", self.id, self.step.label(), self.risk_level);
        if !self.step.reason.is_empty() {
            summary.push_str(&format!(" - {}", self.step.reason));
        }
        if !self.remaining.is_empty() {
            summary.push_str(&format!(" (+{} more steps)", self.remaining.len()));
        }
        summary
    }
}
