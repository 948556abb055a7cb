//! Transfer Orchestration FSM
//!
//! Turns a natural-language transfer request into a terminal outcome, with
//! automatic recovery when the wallet is short of funds.
//!
//! # State Machine
//!
//! ```text
//! IDLE → SUBMITTING ──executed──────────→ SUCCEEDED
//!            │  ↑
//!            │  └── RETRYING ←─funded─┐
//!            │                        │
//!            ├─insufficient funds→ AWAITING_FUNDING ──cancel──→ CANCELLED
//!            │                        │
//!            └─business/transport──→ FAILED ←──wait expired──┘
//! ```
//!
//! # Invariants
//!
//! 1. **Outcome, not error**: a well-formed "insufficient funds" reply is a
//!    transport success and never reaches an error path
//! 2. **Shape independence**: the FSM only branches on the normalized
//!    [`IntentOutcome`], never on raw response JSON
//! 3. **One attempt per user**: `submit` is rejected while that user has a live
//!    attempt; the guard is released on every terminal transition
//! 4. **Same request on retry**: re-submission reuses the original message and
//!    user ID, after the funding context is dropped

pub mod adapters;
pub mod coordinator;
pub mod error;
pub mod normalizer;
pub mod state;
pub mod token;
pub mod types;
pub mod waiter;


// Re-exports for convenience
pub use adapters::{BalanceProbe, HttpBalanceProbe, HttpIntentGateway, IntentGateway};
pub use coordinator::{
    AttemptHandle, AttemptReport, AttemptResult, OrchestrationEvent, TransferOrchestrator,
    TransitionDetail,
};
pub use error::{FailureReason, OrchestratorError, TransportError, TransportErrorKind};
pub use normalizer::normalize;
pub use state::OrchestrationState;
pub use token::{TokenResolver, scan_ticker};
pub use types::{
    AttemptId, BalanceSample, ExecutedTransfer, FundingContext, InsufficientFunds, IntentOutcome,
    TransferRequest,
};
pub use waiter::FundingWaiter;
