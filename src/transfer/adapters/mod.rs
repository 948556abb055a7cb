//! External Collaborator Adapters
//!
//! Narrow interfaces to the intent-processing endpoint and the balance-check
//! endpoint. Only network/HTTP failures are errors; business non-success is a
//! value.

pub mod balance;
pub mod intent;

pub use balance::HttpBalanceProbe;
pub use intent::HttpIntentGateway;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::error::{TransportError, TransportErrorKind};
use super::types::{IntentOutcome, TransferRequest};
use crate::config::EndpointConfig;

/// Sends a transfer message to the intent endpoint
#[async_trait]
pub trait IntentGateway: Send + Sync {
    /// Get adapter name for logging
    fn name(&self) -> &'static str;

    /// Process one request and return the normalized outcome
    ///
    /// `Err` only for transport failures; insufficient funds and business
    /// errors come back as `Ok`.
    async fn process(&self, request: &TransferRequest) -> Result<IntentOutcome, TransportError>;
}

/// Reads a wallet balance
#[async_trait]
pub trait BalanceProbe: Send + Sync {
    /// Get adapter name for logging
    fn name(&self) -> &'static str;

    /// Current non-negative balance of `token` at `address`
    ///
    /// Unknown tokens and addresses report zero rather than failing.
    async fn check(&self, address: &str, token: &str) -> Result<Decimal, TransportError>;
}

fn build_client(
    endpoint: &'static str,
    config: &EndpointConfig,
) -> Result<reqwest::Client, TransportError> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .build()
        .map_err(|e| {
            TransportError::new(
                TransportErrorKind::Connect,
                endpoint,
                format!("Failed to create HTTP client: {}", e),
            )
        })
}


#[cfg(test)]
pub use mock::{MockBalanceProbe, MockIntentGateway};
