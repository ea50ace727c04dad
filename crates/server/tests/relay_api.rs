//! E2E tests for the direct relay endpoint (`POST /agent/update`).

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestConfig, TestFixture};
use ticketlens_core::{Diagnosis, GatewayError, OracleError, TicketRef, TicketType};

#[tokio::test]
async fn test_update_diagnoses_latest_article() {
    let fixture = TestFixture::new().await;
    fixture
        .gateway
        .set_latest_article("100", "Cannot log in since the password reset");
    fixture.oracle.set_diagnosis(Diagnosis::new(
        TicketType::Request,
        "Unlock the account and resend the reset link",
    ));

    let response = fixture.post("/agent/update", json!({"ticket_id": 100})).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["ok"], true);
    assert_eq!(response.body["ticket_id"], 100);
    assert_eq!(
        response.body["diagnosis"],
        "Unlock the account and resend the reset link"
    );
    assert_eq!(response.body["type_id"], 14);
    assert_eq!(response.body["response"]["TicketID"], 100);

    let updates = fixture.gateway.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].ticket, TicketRef::from(100));
    assert_eq!(updates[0].update.ticket.type_id, Some(14));
}

#[tokio::test]
async fn test_update_with_body_writes_it_verbatim() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post(
            "/agent/update",
            json!({"ticket_id": "100", "body": "Handled by phone", "title": "Phone support"}),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["diagnosis"], "Handled by phone");
    assert!(response.body.get("type_id").is_none());
    assert!(fixture.oracle.calls().is_empty());

    let updates = fixture.gateway.updates();
    assert_eq!(updates[0].update.article.body, "Handled by phone");
    assert_eq!(updates[0].update.ticket.title, "Phone support");
}

#[tokio::test]
async fn test_update_uses_caller_session() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post(
            "/agent/update",
            json!({"ticket_id": 100, "session_id": "caller-token", "body": "note"}),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(fixture.login.login_count(), 0);
    assert_eq!(fixture.gateway.updates()[0].session_token, "caller-token");
}

#[tokio::test]
async fn test_update_missing_ticket_id_is_bad_request() {
    let fixture = TestFixture::new().await;

    let response = fixture.post("/agent/update", json!({"body": "note"})).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["stage"], "validation");
    assert_eq!(response.body["kind"], "validation_error");
    assert!(fixture.gateway.updates().is_empty());
}

#[tokio::test]
async fn test_update_malformed_json_is_bad_request() {
    let fixture = TestFixture::new().await;

    let response = fixture.post_raw("/agent/update", "{not json").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["stage"], "validation");
}

#[tokio::test]
async fn test_update_without_content_reports_stage() {
    let fixture = TestFixture::new().await;

    let response = fixture.post("/agent/update", json!({"ticket_id": 100})).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["stage"], "content");
    assert_eq!(response.body["kind"], "content_unavailable");
    assert!(fixture.gateway.updates().is_empty());
}

#[tokio::test]
async fn test_update_oracle_failure_reports_stage() {
    let fixture = TestFixture::new().await;
    fixture.gateway.set_latest_article("100", "Printer jammed");
    fixture
        .oracle
        .fail_next(OracleError::Malformed("not json".to_string()));

    let response = fixture.post("/agent/update", json!({"ticket_id": 100})).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["stage"], "diagnosis");
    assert_eq!(response.body["kind"], "oracle_error");
}

#[tokio::test]
async fn test_update_without_oracle_needs_body() {
    let fixture = TestFixture::with_config(TestConfig {
        without_oracle: true,
        ..Default::default()
    })
    .await;
    fixture.gateway.set_latest_article("100", "Printer jammed");

    let response = fixture.post("/agent/update", json!({"ticket_id": 100})).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["stage"], "diagnosis");

    let response = fixture
        .post("/agent/update", json!({"ticket_id": 100, "body": "manual"}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_failed_write_returns_diagnosis() {
    let fixture = TestFixture::new().await;
    fixture.gateway.set_latest_article("100", "VPN drops every hour");
    fixture.gateway.fail_next_update(GatewayError::Timeout);

    let response = fixture.post("/agent/update", json!({"ticket_id": 100})).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["stage"], "write_back");
    assert_eq!(response.body["kind"], "backend_write_error");
    assert_eq!(response.body["diagnosis"]["diagnosis"], "Mock diagnosis");
    assert_eq!(response.body["diagnosis"]["type_id"], 10);
}

#[tokio::test]
async fn test_backend_error_object_is_reported() {
    let fixture = TestFixture::new().await;
    fixture.gateway.set_update_response(json!({
        "Error": {
            "ErrorCode": "TicketUpdate.AccessDenied",
            "ErrorMessage": "TicketUpdate: User does not have access to the ticket!"
        }
    }));

    let response = fixture
        .post("/agent/update", json!({"ticket_id": 100, "body": "note"}))
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["stage"], "write_back");
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("TicketUpdate.AccessDenied"));
}

#[tokio::test]
async fn test_health_reports_oracle() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["oracle_configured"], true);
}

#[tokio::test]
async fn test_config_hides_password() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/config").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["znuny"]["password_configured"], true);
    assert!(response.body["znuny"].get("password").is_none());
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_relay_counters() {
    let fixture = TestFixture::new().await;
    fixture
        .post("/agent/update", json!({"ticket_id": 100, "body": "note"}))
        .await;

    let (status, text) = fixture.get_text("/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("http_requests_total"));
}
