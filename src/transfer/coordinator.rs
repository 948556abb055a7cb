//! Transfer Orchestrator
//!
//! Drives one attempt per user through the orchestration FSM:
//! submit → (insufficient funds → wait for funding → resubmit)* → terminal.
//! Each attempt runs as its own tokio task and reports through an event
//! channel; cancel and "funds received" come back in as external signals.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::{FutureExt, StreamExt};
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::adapters::{BalanceProbe, HttpBalanceProbe, HttpIntentGateway, IntentGateway};
use super::error::{FailureReason, OrchestratorError, TransportError};
use super::state::OrchestrationState;
use super::token::TokenResolver;
use super::types::{
    AttemptId, BalanceSample, ExecutedTransfer, FundingContext, IntentOutcome, TransferRequest,
};
use super::waiter::FundingWaiter;
use crate::config::{AppConfig, OrchestratorConfig};

/// Payload attached to a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionDetail {
    None,
    /// Normalized outcome that ended the attempt successfully
    Outcome(IntentOutcome),
    /// Entering AWAITING_FUNDING
    Funding(FundingContext),
    /// The sample that satisfied the funding requirement
    Funded(BalanceSample),
    /// Why the attempt failed
    Failure(FailureReason),
}

/// Event consumed by the presentation boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationEvent {
    Transition {
        attempt_id: AttemptId,
        from: OrchestrationState,
        to: OrchestrationState,
        detail: TransitionDetail,
    },
    /// Progress while awaiting funds
    BalanceObserved {
        attempt_id: AttemptId,
        sample: BalanceSample,
    },
}

/// Terminal result of an attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    Succeeded(ExecutedTransfer),
    Failed(FailureReason),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptReport {
    pub attempt_id: AttemptId,
    pub user_id: String,
    pub result: AttemptResult,
    /// Requests sent to the intent endpoint, retries included
    pub submissions: u32,
}

impl AttemptReport {
    pub fn state(&self) -> OrchestrationState {
        match self.result {
            AttemptResult::Succeeded(_) => OrchestrationState::Succeeded,
            AttemptResult::Failed(_) => OrchestrationState::Failed,
            AttemptResult::Cancelled => OrchestrationState::Cancelled,
        }
    }
}

/// Signals shared between a running attempt and whoever controls it
#[derive(Clone)]
struct AttemptSignals {
    attempt_id: AttemptId,
    cancel: CancellationToken,
    nudge: Arc<Notify>,
}

type ActiveAttempts = Arc<DashMap<String, AttemptSignals>>;

/// Clears the per-user in-progress entry; runs on every exit path
struct ActiveGuard {
    active: ActiveAttempts,
    user_id: String,
    attempt_id: AttemptId,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let attempt_id = self.attempt_id;
        self.active
            .remove_if(&self.user_id, |_, signals| signals.attempt_id == attempt_id);
    }
}

/// Controller for one running attempt
pub struct AttemptHandle {
    attempt_id: AttemptId,
    events: mpsc::UnboundedReceiver<OrchestrationEvent>,
    state: watch::Receiver<OrchestrationState>,
    signals: AttemptSignals,
    task: JoinHandle<AttemptReport>,
}

impl AttemptHandle {
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    /// Current state as last published by the orchestrator
    pub fn state(&self) -> OrchestrationState {
        *self.state.borrow()
    }

    /// Receive the next event; `None` once the attempt is over and drained
    pub async fn next_event(&mut self) -> Option<OrchestrationEvent> {
        self.events.recv().await
    }

    /// Request cancellation; honored while awaiting funds
    pub fn cancel(&self) {
        self.signals.cancel.cancel();
    }

    /// User says funds were sent: check the balance without waiting for the next tick
    ///
    /// Ignored unless the attempt is awaiting funds.
    pub fn funds_received(&self) {
        self.signals.nudge.notify_one();
    }

    /// Wait for the terminal report
    pub async fn join(self) -> Result<AttemptReport, JoinError> {
        self.task.await
    }
}

struct OrchestratorInner {
    gateway: Arc<dyn IntentGateway>,
    waiter: FundingWaiter,
    tokens: TokenResolver,
    config: OrchestratorConfig,
    active: ActiveAttempts,
}

/// Transfer Orchestrator - owns the state of every attempt it starts
///
/// Cheap to clone; clones share the same per-user guard.
#[derive(Clone)]
pub struct TransferOrchestrator {
    inner: Arc<OrchestratorInner>,
}

impl TransferOrchestrator {
    pub fn new(
        gateway: Arc<dyn IntentGateway>,
        waiter: FundingWaiter,
        tokens: TokenResolver,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                gateway,
                waiter,
                tokens,
                config,
                active: Arc::new(DashMap::new()),
            }),
        }
    }

    /// Wire the HTTP adapters described by `config`
    pub fn from_config(config: &AppConfig) -> Result<Self, TransportError> {
        let gateway: Arc<dyn IntentGateway> = Arc::new(HttpIntentGateway::new(&config.intent)?);
        let probe: Arc<dyn BalanceProbe> = Arc::new(HttpBalanceProbe::new(&config.balance)?);
        Ok(Self::new(
            gateway,
            FundingWaiter::new(probe, &config.funding),
            TokenResolver::from_config(&config.tokens),
            config.orchestrator.clone(),
        ))
    }

    /// Start a new attempt for `request.user_id`
    ///
    /// Rejected without side effects when that user already has a live attempt.
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, request: TransferRequest) -> Result<AttemptHandle, OrchestratorError> {
        if request.message.trim().is_empty() {
            return Err(OrchestratorError::InvalidRequest("message is empty".into()));
        }
        if request.user_id.trim().is_empty() {
            return Err(OrchestratorError::InvalidRequest("userId is empty".into()));
        }

        let signals = AttemptSignals {
            attempt_id: AttemptId::new(),
            cancel: CancellationToken::new(),
            nudge: Arc::new(Notify::new()),
        };

        match self.inner.active.entry(request.user_id.clone()) {
            Entry::Occupied(existing) => {
                debug!(
                    user_id = %request.user_id,
                    live_attempt = %existing.get().attempt_id,
                    "Rejecting submit: attempt already in progress"
                );
                return Err(OrchestratorError::AlreadyInProgress {
                    user_id: request.user_id,
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(signals.clone());
            }
        }

        let guard = ActiveGuard {
            active: Arc::clone(&self.inner.active),
            user_id: request.user_id.clone(),
            attempt_id: signals.attempt_id,
        };

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(OrchestrationState::Idle);

        info!(
            attempt_id = %signals.attempt_id,
            user_id = %request.user_id,
            "Transfer attempt created"
        );

        let runner = AttemptRunner {
            inner: Arc::clone(&self.inner),
            attempt_id: signals.attempt_id,
            request,
            state: OrchestrationState::Idle,
            state_tx,
            events: events_tx,
            cancel: signals.cancel.clone(),
            nudge: Arc::clone(&signals.nudge),
            guard: Some(guard),
            submissions: 0,
        };

        Ok(AttemptHandle {
            attempt_id: signals.attempt_id,
            events: events_rx,
            state: state_rx,
            signals,
            task: tokio::spawn(runner.run()),
        })
    }

    /// Whether `user_id` has a live attempt
    pub fn is_in_progress(&self, user_id: &str) -> bool {
        self.inner.active.contains_key(user_id)
    }

    /// Cancel the live attempt of `user_id`, if any
    pub fn cancel(&self, user_id: &str) -> bool {
        match self.inner.active.get(user_id) {
            Some(signals) => {
                signals.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Forward a "funds received" acknowledgement to the live attempt of `user_id`
    pub fn funds_received(&self, user_id: &str) -> bool {
        match self.inner.active.get(user_id) {
            Some(signals) => {
                signals.nudge.notify_one();
                true
            }
            None => false,
        }
    }
}

enum FundingResult {
    Funded(BalanceSample),
    Cancelled,
    TimedOut(Duration),
}

/// Task-local driver of a single attempt
struct AttemptRunner {
    inner: Arc<OrchestratorInner>,
    attempt_id: AttemptId,
    request: TransferRequest,
    state: OrchestrationState,
    state_tx: watch::Sender<OrchestrationState>,
    events: mpsc::UnboundedSender<OrchestrationEvent>,
    cancel: CancellationToken,
    nudge: Arc<Notify>,
    guard: Option<ActiveGuard>,
    submissions: u32,
}

impl AttemptRunner {
    async fn run(mut self) -> AttemptReport {
        let max_retries = self.inner.config.max_auto_retries;
        let mut retries = 0u32;

        self.transition(OrchestrationState::Submitting, TransitionDetail::None);

        loop {
            self.submissions += 1;
            let processed = self.inner.gateway.process(&self.request).await;
            let outcome = match processed {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(
                        attempt_id = %self.attempt_id,
                        gateway = self.inner.gateway.name(),
                        error = %e,
                        "Intent submission failed at transport level"
                    );
                    return self.fail(FailureReason::Transport(e));
                }
            };

            debug!(
                attempt_id = %self.attempt_id,
                outcome = outcome.label(),
                submission = self.submissions,
                "Intent outcome received"
            );

            let funds = match outcome {
                IntentOutcome::Executed(executed) => return self.succeed(executed),
                IntentOutcome::BusinessError { message } => {
                    return self.fail(FailureReason::Business(message));
                }
                IntentOutcome::InsufficientFunds(funds) => funds,
            };

            if retries >= max_retries {
                warn!(
                    attempt_id = %self.attempt_id,
                    retries,
                    shortfall = %funds.shortfall(),
                    "Insufficient funds after automatic retries"
                );
                return self.fail(FailureReason::RetryLimitExceeded { retries });
            }

            let token = self
                .inner
                .tokens
                .resolve(funds.token(), &self.request.message);
            let context = FundingContext::from_outcome(&funds, token);
            info!(
                attempt_id = %self.attempt_id,
                poll_interval_ms = self.inner.waiter.poll_interval().as_millis() as u64,
                max_wait_secs = self.inner.waiter.max_wait().as_secs(),
                "{}",
                context
            );

            // Only acknowledgements sent while awaiting funds count
            let _ = self.nudge.notified().now_or_never();

            self.transition(
                OrchestrationState::AwaitingFunding,
                TransitionDetail::Funding(context.clone()),
            );

            let funding = self.await_funding(&context).await;
            drop(context);

            match funding {
                FundingResult::Funded(sample) => {
                    retries += 1;
                    self.transition(OrchestrationState::Retrying, TransitionDetail::Funded(sample));
                    self.transition(OrchestrationState::Submitting, TransitionDetail::None);
                }
                FundingResult::Cancelled => return self.finish(AttemptResult::Cancelled),
                FundingResult::TimedOut(waited) => {
                    return self.fail(FailureReason::FundingTimeout { waited });
                }
            }
        }
    }

    async fn await_funding(&self, context: &FundingContext) -> FundingResult {
        let started = Instant::now();
        let samples = self.inner.waiter.watch(context, &self.cancel, &self.nudge);
        futures::pin_mut!(samples);

        while let Some(sample) = samples.next().await {
            if self.cancel.is_cancelled() {
                break;
            }
            let funded = context.is_satisfied_by(&sample);
            self.emit(OrchestrationEvent::BalanceObserved {
                attempt_id: self.attempt_id,
                sample: sample.clone(),
            });
            if funded {
                return FundingResult::Funded(sample);
            }
        }

        if self.cancel.is_cancelled() {
            info!(attempt_id = %self.attempt_id, "Funding wait cancelled by user");
            FundingResult::Cancelled
        } else {
            FundingResult::TimedOut(started.elapsed())
        }
    }

    fn succeed(self, executed: ExecutedTransfer) -> AttemptReport {
        self.finish(AttemptResult::Succeeded(executed))
    }

    fn fail(self, reason: FailureReason) -> AttemptReport {
        self.finish(AttemptResult::Failed(reason))
    }

    /// Enter the terminal state
    ///
    /// The in-progress entry is cleared before the terminal event goes out, so
    /// a consumer reacting to that event can submit again immediately.
    fn finish(mut self, result: AttemptResult) -> AttemptReport {
        drop(self.guard.take());

        let (to, detail) = match &result {
            AttemptResult::Succeeded(executed) => (
                OrchestrationState::Succeeded,
                TransitionDetail::Outcome(IntentOutcome::Executed(executed.clone())),
            ),
            AttemptResult::Failed(reason) => (
                OrchestrationState::Failed,
                TransitionDetail::Failure(reason.clone()),
            ),
            AttemptResult::Cancelled => (OrchestrationState::Cancelled, TransitionDetail::None),
        };
        self.transition(to, detail);

        AttemptReport {
            attempt_id: self.attempt_id,
            user_id: self.request.user_id,
            result,
            submissions: self.submissions,
        }
    }

    fn transition(&mut self, to: OrchestrationState, detail: TransitionDetail) {
        let from = self.state;
        if !from.can_transition_to(to) {
            error!(
                attempt_id = %self.attempt_id,
                from = %from,
                to = %to,
                "Illegal orchestration transition"
            );
        }
        debug_assert!(
            from.can_transition_to(to),
            "illegal transition {from} -> {to}"
        );

        self.state = to;
        self.state_tx.send_replace(to);

        match &detail {
            TransitionDetail::Failure(reason) => info!(
                attempt_id = %self.attempt_id,
                user_id = %self.request.user_id,
                from = %from,
                to = %to,
                kind = reason.kind(),
                reason = %reason,
                "Attempt state changed"
            ),
            _ => info!(
                attempt_id = %self.attempt_id,
                user_id = %self.request.user_id,
                from = %from,
                to = %to,
                "Attempt state changed"
            ),
        }

        self.emit(OrchestrationEvent::Transition {
            attempt_id: self.attempt_id,
            from,
            to,
            detail,
        });
    }

    fn emit(&self, event: OrchestrationEvent) {
        // Receiver gone means nobody is watching; the attempt still completes
        let _ = self.events.send(event);
    }
}
