//! Orchestration FSM State Definitions

use std::fmt;

/// Orchestration states of a single transfer attempt
///
/// ```text
/// IDLE → SUBMITTING → SUCCEEDED
///            ↓   ↑
///            ↓ RETRYING
///            ↓   ↑
///       AWAITING_FUNDING → CANCELLED
///            ↓
///          FAILED
/// ```
///
/// Terminal states: SUCCEEDED, FAILED, CANCELLED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrchestrationState {
    /// Attempt created, nothing sent yet
    Idle,

    /// Intent request in flight
    Submitting,

    /// Wallet balance below requirement, polling for incoming funds
    AwaitingFunding,

    /// Funds arrived, original request about to be resubmitted
    Retrying,

    /// Terminal: intent executed
    Succeeded,

    /// Terminal: business error, transport error or exhausted recovery
    Failed,

    /// Terminal: user cancelled while awaiting funds
    Cancelled,
}

impl OrchestrationState {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrchestrationState::Succeeded
                | OrchestrationState::Failed
                | OrchestrationState::Cancelled
        )
    }

    /// Check whether `next` is a legal successor of `self`
    pub fn can_transition_to(&self, next: OrchestrationState) -> bool {
        use OrchestrationState::*;
        matches!(
            (*self, next),
            (Idle, Submitting)
                | (Submitting, Succeeded)
                | (Submitting, AwaitingFunding)
                | (Submitting, Failed)
                | (AwaitingFunding, Retrying)
                | (AwaitingFunding, Cancelled)
                | (AwaitingFunding, Failed)
                | (Retrying, Submitting)
        )
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            OrchestrationState::Idle => "IDLE",
            OrchestrationState::Submitting => "SUBMITTING",
            OrchestrationState::AwaitingFunding => "AWAITING_FUNDING",
            OrchestrationState::Retrying => "RETRYING",
            OrchestrationState::Succeeded => "SUCCEEDED",
            OrchestrationState::Failed => "FAILED",
            OrchestrationState::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrchestrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
