//! Intent Endpoint Adapter
//!
//! POSTs `{ message, userId }` to the intent-processing endpoint and normalizes
//! the reply.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::{IntentGateway, build_client};
use crate::config::EndpointConfig;
use crate::transfer::error::{TransportError, TransportErrorKind};
use crate::transfer::normalizer::normalize;
use crate::transfer::types::{IntentOutcome, TransferRequest};

const ENDPOINT: &str = "intent";

/// reqwest-backed [`IntentGateway`]
pub struct HttpIntentGateway {
    client: reqwest::Client,
    url: String,
}

impl HttpIntentGateway {
    pub fn new(config: &EndpointConfig) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(ENDPOINT, config)?,
            url: config.url.clone(),
        })
    }
}

/// A 4xx carrying one of the known reply shapes is a business answer
fn is_business_reply(body: &Value) -> bool {
    body.get("success").is_some_and(Value::is_boolean) || body.get("type").is_some()
}

#[async_trait]
impl IntentGateway for HttpIntentGateway {
    fn name(&self) -> &'static str {
        "http-intent"
    }

    async fn process(&self, request: &TransferRequest) -> Result<IntentOutcome, TransportError> {
        debug!(url = %self.url, user_id = %request.user_id, "Posting intent");

        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(ENDPOINT, e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(ENDPOINT, e))?;
        let body: Option<Value> = serde_json::from_slice(&bytes).ok();

        if status.is_success() {
            return body.map(|b| normalize(&b)).ok_or_else(|| {
                TransportError::new(
                    TransportErrorKind::Decode,
                    ENDPOINT,
                    format!("Response body is not JSON ({} bytes)", bytes.len()),
                )
            });
        }

        match body {
            Some(body) if status.is_client_error() && is_business_reply(&body) => {
                debug!(status = status.as_u16(), "Business reply carried by client-error status");
                Ok(normalize(&body))
            }
            _ => {
                warn!(status = status.as_u16(), url = %self.url, "Intent endpoint returned error status");
                Err(TransportError::new(
                    TransportErrorKind::HttpStatus(status.as_u16()),
                    ENDPOINT,
                    status
                        .canonical_reason()
                        .unwrap_or("unexpected status")
                        .to_string(),
                ))
            }
        }
    }
}
