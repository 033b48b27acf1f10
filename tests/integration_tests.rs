use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceExt;

use garagebook::config::AppConfig;
use garagebook::db;
use garagebook::handlers;
use garagebook::services::settings::DbSettings;
use garagebook::state::AppState;

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
    }
}

fn test_state() -> Arc<AppState> {
    let config = test_config();
    let conn = db::init_db(":memory:").unwrap();
    let db = Arc::new(Mutex::new(conn));
    Arc::new(AppState {
        db: Arc::clone(&db),
        config,
        settings: Box::new(DbSettings::new(db)),
    })
}

fn test_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/public/appointments/availability",
            get(handlers::public::get_availability),
        )
        .route(
            "/public/appointments",
            post(handlers::public::create_appointment),
        )
        .route(
            "/api/admin/appointments",
            get(handlers::admin::get_appointments),
        )
        .route(
            "/api/admin/appointments/:id/confirm",
            post(handlers::admin::confirm_appointment),
        )
        .route(
            "/api/admin/appointments/:id/cancel",
            post(handlers::admin::cancel_appointment),
        )
        .route("/api/admin/settings", get(handlers::admin::get_settings))
        .route(
            "/api/admin/settings",
            post(handlers::admin::update_settings),
        )
        .with_state(state)
}

async fn send(
    state: &Arc<AppState>,
    request: Request<Body>,
) -> (StatusCode, serde_json::Value) {
    let res = test_app(state.clone()).oneshot(request).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn availability_request(date: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/public/appointments/availability?date={date}"))
        .body(Body::empty())
        .unwrap()
}

fn booking_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/public/appointments")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn booking_body(name: &str, phone: &str, date: &str, slot_key: &str) -> serde_json::Value {
    serde_json::json!({
        "client_full_name": name,
        "client_phone": phone,
        "date": date,
        "slot_key": slot_key,
    })
}

async fn enable_night(state: &Arc<AppState>) {
    let (status, _) = send(
        state,
        Request::builder()
            .method("POST")
            .uri("/api/admin/settings")
            .header("Authorization", "Bearer test-token")
            .header("Content-Type", "application/json")
            .body(Body::from(r#"{"night_enabled":true}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let state = test_state();
    let (status, json) = send(
        &state,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

// ── Availability ──

#[tokio::test]
async fn test_availability_requires_date() {
    let state = test_state();
    let (status, json) = send(
        &state,
        Request::builder()
            .uri("/public/appointments/availability")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "VALIDATION");
}

#[tokio::test]
async fn test_availability_rejects_malformed_date() {
    let state = test_state();
    let (status, json) = send(&state, availability_request("2025-13-40")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "VALIDATION");
}

#[tokio::test]
async fn test_monday_availability() {
    let state = test_state();
    // 2025-03-10 is a Monday
    let (status, json) = send(&state, availability_request("2025-03-10")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["date"], "2025-03-10");
    assert_eq!(json["night"], false);
    assert_eq!(json["capacity"], 3);

    let slots = json["slots"].as_array().unwrap();
    let keys: Vec<&str> = slots.iter().map(|s| s["key"].as_str().unwrap()).collect();
    assert_eq!(keys, vec!["08-10", "10-30_12", "12-30_14", "14-16", "16-30_18"]);
    for slot in slots {
        assert_eq!(slot["booked"], 0);
        assert_eq!(slot["available"], 3);
        assert_eq!(slot["capacity"], 3);
    }
    assert_eq!(slots[0]["start"], "2025-03-10T08:00:00");
    assert_eq!(slots[0]["duration"], 120);
}

#[tokio::test]
async fn test_weekend_availability_empty_without_night() {
    let state = test_state();
    // 2025-03-15 is a Saturday
    let (status, json) = send(&state, availability_request("2025-03-15")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["night"], false);
    assert!(json["slots"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_night_mode_adds_slots() {
    let state = test_state();
    enable_night(&state).await;

    let (_, json) = send(&state, availability_request("2025-03-15")).await;
    assert_eq!(json["night"], true);
    let keys: Vec<&str> = json["slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["18-30_20", "20-22"]);

    let (_, json) = send(&state, availability_request("2025-03-10")).await;
    assert_eq!(json["slots"].as_array().unwrap().len(), 7);
}

// ── Booking ──

#[tokio::test]
async fn test_booking_end_to_end() {
    let state = test_state();

    let (status, json) = send(
        &state,
        booking_request(booking_body(
            "Maria Perez",
            "0414-713-1270",
            "2025-03-10",
            "08-10",
        )),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["appointment"]["scheduled_at"], "2025-03-10T08:00:00");
    assert_eq!(json["appointment"]["duration_minutes"], 120);
    assert_eq!(json["appointment"]["status"], "scheduled");
    assert!(json["appointment"]["staff_id"].is_null());
    assert_eq!(json["client"]["full_name"], "Maria Perez");
    assert_eq!(json["client"]["phone"], "04147131270");

    let (_, json) = send(&state, availability_request("2025-03-10")).await;
    let slots = json["slots"].as_array().unwrap();
    assert_eq!(slots[0]["key"], "08-10");
    assert_eq!(slots[0]["booked"], 1);
    assert_eq!(slots[0]["available"], 2);
}

#[tokio::test]
async fn test_booking_missing_name() {
    let state = test_state();
    let (status, json) = send(
        &state,
        booking_request(serde_json::json!({
            "client_phone": "04147131270",
            "date": "2025-03-10",
            "slot_key": "08-10",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "VALIDATION");
}

#[tokio::test]
async fn test_booking_invalid_phone() {
    let state = test_state();
    let (status, json) = send(
        &state,
        booking_request(booking_body("Maria Perez", "555-1234", "2025-03-10", "08-10")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_PHONE");
}

#[tokio::test]
async fn test_booking_night_slot_while_disabled() {
    let state = test_state();
    let (status, json) = send(
        &state,
        booking_request(booking_body(
            "Maria Perez",
            "04147131270",
            "2025-03-10",
            "20-22",
        )),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_SLOT");

    enable_night(&state).await;
    let (status, _) = send(
        &state,
        booking_request(booking_body(
            "Maria Perez",
            "04147131270",
            "2025-03-10",
            "20-22",
        )),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

// The capacity check is count-then-insert on a single connection, so only
// sequential exhaustion is guaranteed; two requests racing across
// processes could still overfill a slot.
#[tokio::test]
async fn test_booking_capacity_exhaustion() {
    let state = test_state();

    for phone in ["04140000001", "04140000002", "04140000003"] {
        let (status, _) = send(
            &state,
            booking_request(booking_body("Walk In", phone, "2025-03-10", "14-16")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, json) = send(
        &state,
        booking_request(booking_body("Walk In", "04140000004", "2025-03-10", "14-16")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "NO_CAPACITY");
}

#[tokio::test]
async fn test_cancelled_bookings_free_capacity() {
    let state = test_state();

    let (_, json) = send(
        &state,
        booking_request(booking_body(
            "Maria Perez",
            "04147131270",
            "2025-03-10",
            "08-10",
        )),
    )
    .await;
    let id = json["appointment"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &state,
        Request::builder()
            .method("POST")
            .uri(format!("/api/admin/appointments/{id}/cancel"))
            .header("Authorization", "Bearer test-token")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&state, availability_request("2025-03-10")).await;
    let slots = json["slots"].as_array().unwrap();
    assert_eq!(slots[0]["booked"], 0);
    assert_eq!(slots[0]["available"], 3);
}

#[tokio::test]
async fn test_repeat_customer_reused_by_phone() {
    let state = test_state();

    let (_, first) = send(
        &state,
        booking_request(booking_body(
            "Maria Perez",
            "0414 713 1270",
            "2025-03-10",
            "08-10",
        )),
    )
    .await;
    let (_, second) = send(
        &state,
        booking_request(booking_body(
            "Maria Perez",
            "04147131270",
            "2025-03-11",
            "08-10",
        )),
    )
    .await;

    assert_eq!(first["client"]["id"], second["client"]["id"]);
}

// ── Admin API ──

#[tokio::test]
async fn test_admin_requires_auth() {
    let state = test_state();
    let (status, _) = send(
        &state,
        Request::builder()
            .uri("/api/admin/appointments")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &state,
        Request::builder()
            .uri("/api/admin/appointments")
            .header("Authorization", "Bearer wrong-token")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_list_and_confirm() {
    let state = test_state();

    let (_, created) = send(
        &state,
        booking_request(booking_body(
            "Maria Perez",
            "04147131270",
            "2025-03-10",
            "10-30_12",
        )),
    )
    .await;
    let id = created["appointment"]["id"].as_str().unwrap().to_string();

    let (status, json) = send(
        &state,
        Request::builder()
            .uri("/api/admin/appointments")
            .header("Authorization", "Bearer test-token")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["customer_name"], "Maria Perez");
    assert_eq!(rows[0]["customer_phone"], "04147131270");
    assert_eq!(rows[0]["scheduled_at"], "2025-03-10 10:30:00");
    assert_eq!(rows[0]["status"], "scheduled");

    let (status, json) = send(
        &state,
        Request::builder()
            .method("POST")
            .uri(format!("/api/admin/appointments/{id}/confirm"))
            .header("Authorization", "Bearer test-token")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "confirmed");

    // Confirmed appointments still occupy the slot.
    let (_, json) = send(&state, availability_request("2025-03-10")).await;
    let slots = json["slots"].as_array().unwrap();
    assert_eq!(slots[1]["key"], "10-30_12");
    assert_eq!(slots[1]["booked"], 1);
}

#[tokio::test]
async fn test_admin_cancel_unknown_appointment() {
    let state = test_state();
    let (status, json) = send(
        &state,
        Request::builder()
            .method("POST")
            .uri("/api/admin/appointments/nope/cancel")
            .header("Authorization", "Bearer test-token")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_admin_settings_roundtrip() {
    let state = test_state();

    let (status, json) = send(
        &state,
        Request::builder()
            .uri("/api/admin/settings")
            .header("Authorization", "Bearer test-token")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["night_enabled"], false);

    enable_night(&state).await;

    let (_, json) = send(
        &state,
        Request::builder()
            .uri("/api/admin/settings")
            .header("Authorization", "Bearer test-token")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(json["night_enabled"], true);
}
