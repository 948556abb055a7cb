//! HTTP adapters against a local mock server

use std::str::FromStr;

use intent_transfer::config::{AppConfig, EndpointConfig};
use intent_transfer::transfer::{
    BalanceProbe, HttpBalanceProbe, HttpIntentGateway, IntentGateway, IntentOutcome,
    OrchestrationState, TransferOrchestrator, TransferRequest, TransportErrorKind,
};
use rust_decimal::Decimal;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, method, path, query_param},
};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("intent_transfer=debug")
        .try_init();
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn gateway(server: &MockServer) -> HttpIntentGateway {
    HttpIntentGateway::new(&EndpointConfig::new(format!("{}/intent", server.uri()))).unwrap()
}

fn probe(server: &MockServer) -> HttpBalanceProbe {
    HttpBalanceProbe::new(&EndpointConfig::new(format!("{}/balance", server.uri()))).unwrap()
}

fn samir() -> TransferRequest {
    TransferRequest::new("Send 100 TON to Samir", "u1")
}

// ============================================================================
// Intent endpoint
// ============================================================================

#[tokio::test]
async fn test_intent_posts_message_and_user_id() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/intent"))
        .and(body_json(json!({ "message": "Send 100 TON to Samir", "userId": "u1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "txHash": "0xfeed", "amountIn": "100", "token": "TON" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    match gateway(&server).process(&samir()).await? {
        IntentOutcome::Executed(executed) => {
            assert_eq!(executed.tx_hash.as_deref(), Some("0xfeed"));
            assert_eq!(executed.amount_in, Some(dec("100")));
        }
        other => panic!("expected executed, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_intent_transfer_shape_insufficient_funds() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/intent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "transfer",
            "data": {
                "status": "insufficient_funds",
                "walletAddress": "0xabc",
                "currentBalance": 0.68894,
                "requiredAmount": 100,
                "fundingInstructions": "Send TON to 0xabc"
            }
        })))
        .mount(&server)
        .await;

    match gateway(&server).process(&samir()).await? {
        IntentOutcome::InsufficientFunds(funds) => {
            assert_eq!(funds.wallet_address(), "0xabc");
            assert_eq!(funds.shortfall(), dec("99.31106"));
            assert_eq!(funds.funding_instructions(), Some("Send TON to 0xabc"));
        }
        other => panic!("expected insufficient funds, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_intent_business_reply_on_client_error_status() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/intent"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "error": "Recipient not found"
        })))
        .mount(&server)
        .await;

    let outcome = gateway(&server).process(&samir()).await.unwrap();
    assert_eq!(outcome, IntentOutcome::business("Recipient not found"));
}

#[tokio::test]
async fn test_intent_server_error_is_transport_error() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/intent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = gateway(&server).process(&samir()).await.unwrap_err();
    assert_eq!(err.kind, TransportErrorKind::HttpStatus(500));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_intent_non_json_body_is_decode_error() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/intent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = gateway(&server).process(&samir()).await.unwrap_err();
    assert_eq!(err.kind, TransportErrorKind::Decode);
    assert_eq!(err.code(), "DECODE");
}

#[tokio::test]
async fn test_intent_json_missing_fields_is_business_error() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/intent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "hello": "world" })))
        .mount(&server)
        .await;

    let outcome = gateway(&server).process(&samir()).await.unwrap();
    assert!(matches!(outcome, IntentOutcome::BusinessError { .. }));
}

// ============================================================================
// Balance endpoint
// ============================================================================

#[tokio::test]
async fn test_balance_reads_amount() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/balance"))
        .and(query_param("address", "0xabc"))
        .and(query_param("token", "TON"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "balance": "120.5" }
        })))
        .mount(&server)
        .await;

    assert_eq!(probe(&server).check("0xabc", "TON").await?, dec("120.5"));
    Ok(())
}

#[tokio::test]
async fn test_balance_unknown_reads_zero() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/balance"))
        .and(query_param("token", "NOT"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/balance"))
        .and(query_param("token", "USDT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
        .mount(&server)
        .await;

    let probe = probe(&server);
    assert_eq!(probe.check("0xabc", "NOT").await?, Decimal::ZERO);
    assert_eq!(probe.check("0xabc", "USDT").await?, Decimal::ZERO);
    Ok(())
}

#[tokio::test]
async fn test_balance_server_error_is_transport_error() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/balance"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = probe(&server).check("0xabc", "TON").await.unwrap_err();
    assert_eq!(err.kind, TransportErrorKind::HttpStatus(503));
    assert_eq!(err.endpoint, "balance");
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn test_orchestrator_recovers_over_http() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let server = MockServer::start().await;

    // First call: insufficient funds; afterwards: executed
    Mock::given(method("POST"))
        .and(path("/intent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "data": {
                "status": "insufficient_funds",
                "walletAddress": "0xabc",
                "currentBalance": 0.68894,
                "requiredAmount": 100
            }
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/intent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "txHash": "0xfeed" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/balance"))
        .and(query_param("token", "TON"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "balance": 150 }
        })))
        .mount(&server)
        .await;

    let config = AppConfig::from_yaml(&format!(
        r#"
log_level: "debug"
log_dir: "./logs"
log_file: "test.log"
use_json: false
rotation: "never"
intent:
  url: "{uri}/intent"
balance:
  url: "{uri}/balance"
funding:
  poll_interval_ms: 50
  max_wait_secs: 5
"#,
        uri = server.uri()
    ))?;

    let orchestrator = TransferOrchestrator::from_config(&config)?;
    let handle = orchestrator.submit(samir())?;
    let report = handle.join().await?;

    assert_eq!(report.state(), OrchestrationState::Succeeded);
    assert_eq!(report.submissions, 2);
    assert!(!orchestrator.is_in_progress("u1"));
    Ok(())
}
