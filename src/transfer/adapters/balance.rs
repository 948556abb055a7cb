//! Balance Endpoint Adapter
//!
//! GET `?address=..&token=..` → `{ success, data: { balance } }`.
//! Missing, non-numeric or negative balances read as zero.

use std::str::FromStr;

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{BalanceProbe, build_client};
use crate::config::EndpointConfig;
use crate::transfer::error::{TransportError, TransportErrorKind};

const ENDPOINT: &str = "balance";

#[derive(Deserialize, Debug, Default)]
struct BalanceResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<BalanceData>,
}

#[derive(Deserialize, Debug, Default)]
struct BalanceData {
    #[serde(default)]
    balance: Value,
}

/// reqwest-backed [`BalanceProbe`]
pub struct HttpBalanceProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpBalanceProbe {
    pub fn new(config: &EndpointConfig) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(ENDPOINT, config)?,
            url: config.url.clone(),
        })
    }
}

/// Interpret the `balance` field, defaulting to zero
pub fn parse_balance(value: &Value) -> Decimal {
    let parsed = match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    };

    match parsed {
        Some(amount) if amount >= Decimal::ZERO => amount,
        _ => Decimal::ZERO,
    }
}

#[async_trait]
impl BalanceProbe for HttpBalanceProbe {
    fn name(&self) -> &'static str {
        "http-balance"
    }

    async fn check(&self, address: &str, token: &str) -> Result<Decimal, TransportError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("address", address), ("token", token)])
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(ENDPOINT, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(address, token, "Balance endpoint does not know address, reading zero");
            return Ok(Decimal::ZERO);
        }
        if !status.is_success() {
            warn!(status = status.as_u16(), address, token, "Balance endpoint returned error status");
            return Err(TransportError::new(
                TransportErrorKind::HttpStatus(status.as_u16()),
                ENDPOINT,
                format!("balance check failed with status {}", status),
            ));
        }

        let body: BalanceResponse = response
            .json()
            .await
            .map_err(|e| TransportError::from_reqwest(ENDPOINT, e))?;

        if !body.success {
            debug!(address, token, "Balance endpoint reported no success, reading zero");
            return Ok(Decimal::ZERO);
        }

        Ok(body
            .data
            .map(|d| parse_balance(&d.balance))
            .unwrap_or(Decimal::ZERO))
    }
}
