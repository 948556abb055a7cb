//! Intent Response Normalization
//!
//! The intent endpoint answers in two interchangeable shapes:
//!
//! ```text
//! success shape:  { success, data: { status?, walletAddress?, currentBalance?, requiredAmount?, ... } }
//! transfer shape: { type: "transfer", data: { status, transferDetails?: { from, amount, token }, error? } }
//! ```
//!
//! Both are mapped onto one [`IntentOutcome`] here so the coordinator never
//! looks at raw JSON. A payload missing required fields for its shape becomes
//! `BusinessError` with a diagnostic.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::types::{ExecutedTransfer, InsufficientFunds, IntentOutcome};

const STATUS_INSUFFICIENT_FUNDS: &str = "insufficient_funds";
const STATUS_EXECUTED: &str = "executed";
const TYPE_TRANSFER: &str = "transfer";

#[derive(Deserialize, Debug)]
struct RawResponse {
    #[serde(rename = "type")]
    kind: Option<String>,
    success: Option<bool>,
    data: Option<RawData>,
    message: Option<Value>,
    error: Option<Value>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct RawData {
    status: Option<String>,
    wallet_address: Option<String>,
    token: Option<String>,
    current_balance: Option<Value>,
    required_amount: Option<Value>,
    shortfall: Option<Value>,
    funding_instructions: Option<Value>,
    transfer_details: Option<RawTransferDetails>,
    tx_hash: Option<Value>,
    amount_in: Option<Value>,
    amount_out: Option<Value>,
    route: Option<Value>,
    message: Option<Value>,
    error: Option<Value>,
}

#[derive(Deserialize, Debug, Default)]
struct RawTransferDetails {
    from: Option<String>,
    amount: Option<Value>,
    token: Option<String>,
}

/// Map a decoded intent response onto an [`IntentOutcome`]
///
/// Pure and total: every JSON value yields exactly one variant.
pub fn normalize(body: &Value) -> IntentOutcome {
    let raw = match RawResponse::deserialize(body) {
        Ok(raw) => raw,
        Err(e) => return malformed(format!("unexpected payload: {e}")),
    };

    let routed = match (raw.kind.as_deref(), raw.success) {
        (Some(TYPE_TRANSFER), _) => from_transfer_shape(raw),
        (Some(other), _) => Err(format!("unsupported intent type `{other}`")),
        (None, Some(success)) => from_success_shape(success, raw),
        (None, None) => Err("neither `success` nor `type` present".to_string()),
    };

    routed.unwrap_or_else(malformed)
}

fn malformed(diagnostic: String) -> IntentOutcome {
    warn!(diagnostic = %diagnostic, "Malformed intent response");
    IntentOutcome::business(format!("Malformed intent response: {diagnostic}"))
}

fn from_success_shape(success: bool, raw: RawResponse) -> Result<IntentOutcome, String> {
    let data = raw.data.unwrap_or_default();

    if data.status.as_deref() == Some(STATUS_INSUFFICIENT_FUNDS) {
        return insufficient_from(&data).map(IntentOutcome::InsufficientFunds);
    }

    if success {
        return executed_from(&data).map(IntentOutcome::Executed);
    }

    Ok(IntentOutcome::business(
        error_message(data.error.as_ref())
            .or_else(|| data.message.as_ref().and_then(text_of))
            .or_else(|| error_message(raw.error.as_ref()))
            .or_else(|| raw.message.as_ref().and_then(text_of))
            .unwrap_or_else(|| "Intent processing failed".to_string()),
    ))
}

fn from_transfer_shape(raw: RawResponse) -> Result<IntentOutcome, String> {
    let data = raw
        .data
        .ok_or_else(|| "transfer response without `data`".to_string())?;

    match data.status.as_deref() {
        Some(STATUS_INSUFFICIENT_FUNDS) => {
            insufficient_from(&data).map(IntentOutcome::InsufficientFunds)
        }
        Some(STATUS_EXECUTED) => executed_from(&data).map(IntentOutcome::Executed),
        status => match error_message(data.error.as_ref())
            .or_else(|| data.message.as_ref().and_then(text_of))
        {
            Some(message) => Ok(IntentOutcome::business(message)),
            None => match status {
                Some(s) => Err(format!("unknown transfer status `{s}`")),
                None => Err("transfer response without `status`".to_string()),
            },
        },
    }
}

fn insufficient_from(data: &RawData) -> Result<InsufficientFunds, String> {
    let details = data.transfer_details.as_ref();

    let wallet_address = data
        .wallet_address
        .clone()
        .or_else(|| details.and_then(|d| d.from.clone()))
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| "insufficient_funds without `walletAddress`".to_string())?;

    let token = data
        .token
        .clone()
        .or_else(|| details.and_then(|d| d.token.clone()));

    let current_balance =
        decimal_field("currentBalance", data.current_balance.as_ref())?.unwrap_or(Decimal::ZERO);
    let reported_shortfall = decimal_field("shortfall", data.shortfall.as_ref())?;

    let required_amount = match decimal_field("requiredAmount", data.required_amount.as_ref())? {
        Some(required) => required,
        None => match reported_shortfall {
            Some(shortfall) => current_balance
                .checked_add(shortfall)
                .ok_or_else(|| "amount out of range".to_string())?,
            None => decimal_field("transferDetails.amount", details.and_then(|d| d.amount.as_ref()))?
                .ok_or_else(|| "insufficient_funds without `requiredAmount`".to_string())?,
        },
    };

    let funds = InsufficientFunds::new(
        wallet_address,
        token,
        current_balance,
        required_amount,
        data.funding_instructions.as_ref().and_then(text_of),
    )?;

    if let Some(reported) = reported_shortfall
        && reported != funds.shortfall()
    {
        debug!(
            reported = %reported,
            derived = %funds.shortfall(),
            "Ignoring inconsistent shortfall from endpoint"
        );
    }

    Ok(funds)
}

fn executed_from(data: &RawData) -> Result<ExecutedTransfer, String> {
    let details = data.transfer_details.as_ref();

    let amount_in = match decimal_field("amountIn", data.amount_in.as_ref())? {
        Some(amount) => Some(amount),
        None => decimal_field("transferDetails.amount", details.and_then(|d| d.amount.as_ref()))?,
    };

    Ok(ExecutedTransfer {
        tx_hash: data.tx_hash.as_ref().and_then(text_of),
        amount_in,
        amount_out: decimal_field("amountOut", data.amount_out.as_ref())?,
        token: data
            .token
            .clone()
            .or_else(|| details.and_then(|d| d.token.clone())),
        route: data.route.as_ref().and_then(route_of),
    })
}

/// Parse a JSON number or numeric string as a decimal
///
/// Numbers go through their shortest textual form so `0.68894` stays exact.
fn decimal_field(name: &str, value: Option<&Value>) -> Result<Option<Decimal>, String> {
    let text = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => return Err(format!("`{name}` is not numeric: {other}")),
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Some)
        .map_err(|_| format!("`{name}` is not numeric: {text}"))
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn error_message(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Object(map) => map
            .get("message")
            .and_then(text_of)
            .or_else(|| Some(Value::Object(map.clone()).to_string())),
        other => text_of(other),
    }
}

fn route_of(value: &Value) -> Option<String> {
    match value {
        Value::Array(hops) => {
            let hops: Vec<String> = hops.iter().filter_map(text_of).collect();
            (!hops.is_empty()).then(|| hops.join(" -> "))
        }
        other => text_of(other),
    }
}
