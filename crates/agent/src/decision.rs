use crate::Action;
use jester_core::{HandEvaluation, Phase, StateDelta};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DecisionKind {
    /// Solved exactly by enumeration. Never escalated.
    Mechanical,
    Strategic,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DecisionOutcome {
    Rule,
    Advisory { rationale: String },
    /// The advisory consult failed and the rule candidate was adopted.
    Fallback { error: String },
    SafeDefault { reason: String },
}

impl DecisionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rule => "rule",
            Self::Advisory { .. } => "advisory",
            Self::Fallback { .. } => "fallback",
            Self::SafeDefault { .. } => "safe_default",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub phase: Phase,
    pub action: Action,
    pub outcome: DecisionOutcome,
    pub kind: DecisionKind,
    pub confidence: f64,
    pub rationale: String,
    #[serde(default)]
    pub evaluation: Option<HandEvaluation>,
    /// Accumulator changes the game should commit once the action is applied.
    #[serde(default)]
    pub state_deltas: Vec<StateDelta>,
    #[serde(default)]
    pub escalated: bool,
    #[serde(default)]
    pub advisory_attempts: u32,
    #[serde(default)]
    pub degraded: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl Decision {
    pub(crate) fn new(phase: Phase, kind: DecisionKind, action: Action) -> Self {
        Self {
            phase,
            action,
            outcome: DecisionOutcome::Rule,
            kind,
            confidence: 1.0,
            rationale: String::new(),
            evaluation: None,
            state_deltas: Vec::new(),
            escalated: false,
            advisory_attempts: 0,
            degraded: false,
            warnings: Vec::new(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} {} [{}] confidence {:.2}: {}",
            self.phase.label(),
            self.action.short_label(),
            self.outcome.label(),
            self.confidence,
            self.rationale
        )
    }
}
