//! Intent Transfer - Conversational Transfer Orchestration
//!
//! Submits natural-language transfer requests to an intent-processing
//! endpoint and, when the wallet is short of funds, waits for a top-up and
//! re-submits the same request automatically.
//!
//! # Modules
//!
//! - [`config`] - YAML application configuration
//! - [`logging`] - tracing subscriber setup
//! - [`transfer`] - Orchestration FSM, response normalizer, funding waiter

pub mod config;
pub mod logging;
pub mod transfer;

// Convenient re-exports at crate root
pub use config::{AppConfig, ConfigError};
pub use transfer::{
    AttemptHandle, AttemptReport, AttemptResult, FailureReason, IntentOutcome,
    OrchestrationEvent, OrchestrationState, OrchestratorError, TransferOrchestrator,
    TransferRequest, TransitionDetail, TransportError,
};
