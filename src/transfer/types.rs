//! Transfer Core Types
//!
//! Type definitions for the transfer orchestration FSM.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Attempt ID type - ULID-based unique identifier
///
/// One per `submit`; automatic retries stay under the same attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptId(ulid::Ulid);

impl AttemptId {
    /// Generate a new unique AttemptId
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AttemptId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

/// Natural-language transfer request as posted to the intent endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Free-text instruction, e.g. "Send 100 TON to Samir"
    pub message: String,
    /// Caller identity; at most one live attempt per user
    pub user_id: String,
}

impl TransferRequest {
    pub fn new(message: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            user_id: user_id.into(),
        }
    }
}

/// Details of an executed intent
///
/// Both response shapes report different subsets, so every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutedTransfer {
    pub tx_hash: Option<String>,
    pub amount_in: Option<Decimal>,
    pub amount_out: Option<Decimal>,
    pub token: Option<String>,
    pub route: Option<String>,
}

/// Wallet balance below what the intent needs
///
/// Constructed only through [`InsufficientFunds::new`], which enforces
/// `shortfall == required_amount - current_balance > 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsufficientFunds {
    wallet_address: String,
    token: Option<String>,
    current_balance: Decimal,
    required_amount: Decimal,
    shortfall: Decimal,
    funding_instructions: Option<String>,
}

impl InsufficientFunds {
    /// Build and validate an insufficient-funds report
    ///
    /// Returns a diagnostic when the amounts are negative or already cover the
    /// requirement.
    pub fn new(
        wallet_address: impl Into<String>,
        token: Option<String>,
        current_balance: Decimal,
        required_amount: Decimal,
        funding_instructions: Option<String>,
    ) -> Result<Self, String> {
        if current_balance.is_sign_negative() && !current_balance.is_zero() {
            return Err(format!("currentBalance is negative: {current_balance}"));
        }
        if required_amount.is_sign_negative() && !required_amount.is_zero() {
            return Err(format!("requiredAmount is negative: {required_amount}"));
        }
        let shortfall = required_amount - current_balance;
        if shortfall <= Decimal::ZERO {
            return Err(format!(
                "insufficient_funds reported but balance {current_balance} covers {required_amount}"
            ));
        }
        Ok(Self {
            wallet_address: wallet_address.into(),
            token: token.filter(|t| !t.trim().is_empty()),
            current_balance,
            required_amount,
            shortfall,
            funding_instructions,
        })
    }

    pub fn wallet_address(&self) -> &str {
        &self.wallet_address
    }

    /// Token symbol if the endpoint reported one
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn current_balance(&self) -> Decimal {
        self.current_balance
    }

    pub fn required_amount(&self) -> Decimal {
        self.required_amount
    }

    pub fn shortfall(&self) -> Decimal {
        self.shortfall
    }

    pub fn funding_instructions(&self) -> Option<&str> {
        self.funding_instructions.as_deref()
    }
}

/// Normalized result of processing an intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentOutcome {
    Executed(ExecutedTransfer),
    InsufficientFunds(InsufficientFunds),
    BusinessError { message: String },
}

impl IntentOutcome {
    pub fn business(message: impl Into<String>) -> Self {
        IntentOutcome::BusinessError {
            message: message.into(),
        }
    }

    /// Short label for logging
    pub fn label(&self) -> &'static str {
        match self {
            IntentOutcome::Executed(_) => "EXECUTED",
            IntentOutcome::InsufficientFunds(_) => "INSUFFICIENT_FUNDS",
            IntentOutcome::BusinessError { .. } => "BUSINESS_ERROR",
        }
    }
}

/// Data needed to wait for and verify incoming funds
///
/// Owned by exactly one attempt; dropped on cancel or before the retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingContext {
    pub address: String,
    /// Always resolved, falling back to the message scan and the native symbol
    pub token: String,
    pub current_balance: Decimal,
    pub required_amount: Decimal,
    pub shortfall: Decimal,
    pub funding_instructions: Option<String>,
}

impl FundingContext {
    /// Derive the context from an insufficient-funds outcome and a resolved token
    pub fn from_outcome(outcome: &InsufficientFunds, token: String) -> Self {
        Self {
            address: outcome.wallet_address().to_string(),
            token,
            current_balance: outcome.current_balance(),
            required_amount: outcome.required_amount(),
            shortfall: outcome.shortfall(),
            funding_instructions: outcome.funding_instructions().map(str::to_string),
        }
    }

    /// Sufficiency predicate: matching token and `amount >= required_amount`
    pub fn is_satisfied_by(&self, sample: &BalanceSample) -> bool {
        sample.token.eq_ignore_ascii_case(&self.token) && sample.amount >= self.required_amount
    }
}

/// One observed balance during the funding wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSample {
    pub token: String,
    pub amount: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl BalanceSample {
    pub fn new(token: impl Into<String>, amount: Decimal) -> Self {
        Self {
            token: token.into(),
            amount,
            observed_at: Utc::now(),
        }
    }
}

impl fmt::Display for FundingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Funding[{}] token={} balance={} required={} shortfall={}",
            self.address, self.token, self.current_balance, self.required_amount, self.shortfall
        )
    }
}
