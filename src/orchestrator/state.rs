//! Composition and delivery lifecycle states

use std::fmt;

use serde::Serialize;

/// Lifecycle of one composition and its delivery attempt.
///
/// `Idle → TypeSelected → Bound → Composed → Dispatched → (Sent | Failed) → Completed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Idle,
    TypeSelected,
    Bound,
    Composed,
    Dispatched,
    Sent,
    Failed,
    Completed,
}

impl OrchestratorState {
    /// Whether `next` directly follows `self`
    pub fn can_transition_to(self, next: OrchestratorState) -> bool {
        use OrchestratorState::*;

        matches!(
            (self, next),
            (_, TypeSelected)
                | (TypeSelected, Bound)
                | (Bound, Bound)
                | (Bound, Composed)
                | (Composed, Dispatched)
                | (Dispatched, Sent)
                | (Dispatched, Failed)
                | (Sent, Completed)
                | (Failed, Completed)
        )
    }

    /// Whether no further transitions follow, short of a new message type
    pub fn is_terminal(self) -> bool {
        self == OrchestratorState::Completed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrchestratorState::Idle => "idle",
            OrchestratorState::TypeSelected => "type_selected",
            OrchestratorState::Bound => "bound",
            OrchestratorState::Composed => "composed",
            OrchestratorState::Dispatched => "dispatched",
            OrchestratorState::Sent => "sent",
            OrchestratorState::Failed => "failed",
            OrchestratorState::Completed => "completed",
        }
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the states a single delivery attempt moves through
#[derive(Debug)]
pub(crate) struct StateTrace {
    current: OrchestratorState,
}

impl StateTrace {
    pub(crate) fn starting_at(state: OrchestratorState) -> Self {
        Self { current: state }
    }

    pub(crate) fn current(&self) -> OrchestratorState {
        self.current
    }

    /// Move to `next`, logging the transition
    pub(crate) fn advance(&mut self, next: OrchestratorState) {
        debug_assert!(
            self.current.can_transition_to(next),
            "illegal transition {} -> {}",
            self.current,
            next
        );
        tracing::debug!(from = %self.current, to = %next, "State transition");
        self.current = next;
    }
}
