// Integration tests for `ApiClient` using wiremock.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use gopark_api::types::{Ticket, TicketType};
use gopark_api::{ApiClient, Error, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let base = format!("{}/api/v1", server.uri());
    let client =
        ApiClient::from_reqwest(&base, reqwest::Client::new(), Duration::from_secs(5)).unwrap();
    (server, client)
}

fn zone_json(id: &str, occupied: u32) -> serde_json::Value {
    json!({
        "id": id,
        "name": "Zone A",
        "categoryId": "cat_premium",
        "gateIds": ["gate_1"],
        "totalSlots": 100,
        "occupied": occupied,
        "free": 100 - occupied,
        "reserved": 15,
        "availableForVisitors": 65,
        "availableForSubscribers": 20,
        "rateNormal": 5.0,
        "rateSpecial": 8.5,
        "open": true
    })
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_list_zones_for_gate() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/master/zones"))
        .and(query_param("gateId", "gate_1"))
        .and(header("accept", "application/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([zone_json("zone_a", 10)])),
        )
        .mount(&server)
        .await;

    // Built through TransportConfig so the default Accept header is present.
    let client = ApiClient::new(
        &format!("{}/api/v1/", server.uri()),
        &TransportConfig::default(),
    )
    .unwrap();

    let zones = client.list_zones(Some("gate_1")).await.unwrap();
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].id, "zone_a");
    assert_eq!(zones[0].occupied, 10);
}

#[tokio::test]
async fn test_none_query_params_are_skipped() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/master/zones"))
        .respond_with(|req: &Request| {
            if req.url.query().is_some() {
                ResponseTemplate::new(400)
            } else {
                ResponseTemplate::new(200).set_body_json(json!([]))
            }
        })
        .mount(&server)
        .await;

    let zones = client.list_zones(None).await.unwrap();
    assert!(zones.is_empty());
}

#[tokio::test]
async fn test_bearer_token_is_sent_after_set_token() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/admin/reports/parking-state"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    client.set_token(SecretString::from("secret-token".to_string()));
    let report = client.parking_state_report().await.unwrap();
    assert!(report.is_empty());
}

#[tokio::test]
async fn test_login_returns_user_and_token() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(body_json(json!({ "username": "emp1", "password": "pass1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": { "id": "emp1", "username": "emp1", "role": "employee" },
            "token": "tok-123"
        })))
        .mount(&server)
        .await;

    let login = client.login("emp1", "pass1").await.unwrap();
    assert_eq!(login.token, "tok-123");
    assert_eq!(login.user.role, gopark_api::types::Role::Employee);
    assert!(!client.has_token());
}

#[tokio::test]
async fn test_check_in_returns_zone_state() {
    let (server, client) = setup().await;

    let ticket = Ticket {
        id: "t-1".into(),
        ticket_type: TicketType::Visitor,
        zone_id: "zone_a".into(),
        gate_id: "gate_1".into(),
        checkin_at: "2026-03-01T09:30:00Z".into(),
        checkout_at: None,
        subscription_id: None,
    };

    Mock::given(method("POST"))
        .and(path("/api/v1/tickets/checkin"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ticket": {
                "id": "t-1",
                "type": "visitor",
                "zoneId": "zone_a",
                "gateId": "gate_1",
                "checkinAt": "2026-03-01T09:30:00Z",
                "checkoutAt": null
            },
            "zoneState": zone_json("zone_a", 11)
        })))
        .mount(&server)
        .await;

    let resp = client.check_in(&ticket).await.unwrap();
    assert_eq!(resp.ticket.id, "t-1");
    assert_eq!(resp.zone_state.occupied, 11);
}

#[tokio::test]
async fn test_set_zone_open_sends_flag() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/admin/zones/zone_a/open"))
        .and(body_json(json!({ "open": false })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "zoneId": "zone_a", "open": false })),
        )
        .mount(&server)
        .await;

    let state = client.set_zone_open("zone_a", false).await.unwrap();
    assert_eq!(state.zone_id, "zone_a");
    assert!(!state.open);
}

#[tokio::test]
async fn test_delete_accepts_empty_body() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/admin/rush-hours/rh_1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    client.delete_rush_hour("rh_1").await.unwrap();
}

// ── Error-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_error_message_taken_from_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/tickets/checkout"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Ticket not found" })),
        )
        .mount(&server)
        .await;

    let err = client.check_out("missing", false).await.unwrap_err();
    assert!(err.is_not_found());
    match err {
        Error::Api {
            status,
            message,
            payload,
        } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Ticket not found");
            assert_eq!(payload.unwrap()["message"], "Ticket not found");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_error_message_falls_back_to_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/master/gates"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client.list_gates().await.unwrap_err();
    assert!(err.is_transient());
    match err {
        Error::Api {
            status,
            message,
            payload,
        } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Request failed with 500");
            assert!(payload.is_none());
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_conflict_on_full_zone() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/tickets/checkin"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "message": "Zone is full" })),
        )
        .mount(&server)
        .await;

    let ticket = Ticket {
        id: "t-2".into(),
        ticket_type: TicketType::Visitor,
        zone_id: "zone_a".into(),
        gate_id: "gate_1".into(),
        checkin_at: "2026-03-01T09:30:00Z".into(),
        checkout_at: None,
        subscription_id: None,
    };

    let err = client.check_in(&ticket).await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    let client = ApiClient::from_reqwest(
        &format!("{}/api/v1", server.uri()),
        reqwest::Client::new(),
        Duration::from_millis(100),
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/v1/master/gates"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = client.list_gates().await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_bad_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/master/gates"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"not\":\"a list\"}"))
        .mount(&server)
        .await;

    let err = client.list_gates().await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }));
}
