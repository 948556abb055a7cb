//! Funding Waiter
//!
//! Polls the balance probe until the wallet covers the required amount, the
//! wait bound expires, or the attempt is cancelled.

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use futures::stream;
use tokio::sync::Notify;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::adapters::BalanceProbe;
use super::types::{BalanceSample, FundingContext};
use crate::config::FundingConfig;

struct WatchState {
    first: bool,
    done: bool,
    deadline: Instant,
}

/// Balance polling for one funding context at a time
pub struct FundingWaiter {
    probe: Arc<dyn BalanceProbe>,
    poll_interval: Duration,
    max_wait: Duration,
}

impl FundingWaiter {
    pub fn new(probe: Arc<dyn BalanceProbe>, config: &FundingConfig) -> Self {
        Self::with_timing(probe, config.poll_interval(), config.max_wait())
    }

    pub fn with_timing(
        probe: Arc<dyn BalanceProbe>,
        poll_interval: Duration,
        max_wait: Duration,
    ) -> Self {
        Self {
            probe,
            poll_interval,
            max_wait,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Lazily poll the balance of `context`
    ///
    /// Nothing is probed until the stream is polled, and every call starts a
    /// fresh sequence with its own deadline. The first probe runs immediately;
    /// later ones wait `poll_interval` or until `nudge` fires. The stream ends
    /// after the first sufficient sample, on cancellation, or at the deadline.
    /// A probe already in flight is never interrupted, but its reading is
    /// discarded and no new probe starts once `cancel` is set.
    ///
    /// Probe failures are logged and polling continues.
    pub fn watch<'a>(
        &'a self,
        context: &'a FundingContext,
        cancel: &'a CancellationToken,
        nudge: &'a Notify,
    ) -> impl Stream<Item = BalanceSample> + Send + 'a {
        let state = WatchState {
            first: true,
            done: false,
            deadline: Instant::now() + self.max_wait,
        };

        stream::unfold(state, move |mut state| async move {
            if state.done {
                return None;
            }

            loop {
                if !state.first {
                    let remaining = state.deadline.saturating_duration_since(Instant::now());
                    tokio::select! {
                        _ = cancel.cancelled() => return None,
                        _ = nudge.notified() => {
                            debug!(address = %context.address, "Funds reported sent, checking balance now");
                        }
                        _ = sleep(self.poll_interval.min(remaining)) => {}
                    }
                }
                state.first = false;

                if cancel.is_cancelled() {
                    return None;
                }
                if Instant::now() >= state.deadline {
                    warn!(
                        address = %context.address,
                        token = %context.token,
                        max_wait_secs = self.max_wait.as_secs(),
                        "Funding wait expired"
                    );
                    return None;
                }

                let checked = self.probe.check(&context.address, &context.token).await;
                if cancel.is_cancelled() {
                    debug!(address = %context.address, "Cancelled while probing, discarding reading");
                    return None;
                }

                match checked {
                    Ok(amount) => {
                        let sample = BalanceSample::new(context.token.clone(), amount);
                        state.done = context.is_satisfied_by(&sample);
                        if state.done {
                            info!(
                                address = %context.address,
                                token = %context.token,
                                balance = %amount,
                                required = %context.required_amount,
                                "Funding requirement met"
                            );
                        } else {
                            debug!(
                                address = %context.address,
                                balance = %amount,
                                required = %context.required_amount,
                                "Balance still below requirement"
                            );
                        }
                        return Some((sample, state));
                    }
                    Err(e) => {
                        warn!(
                            probe = self.probe.name(),
                            address = %context.address,
                            error = %e,
                            "Balance probe failed, continuing to poll"
                        );
                    }
                }
            }
        })
    }
}
