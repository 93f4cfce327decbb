//! End-to-end HTTP tests over the in-memory store.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use axum::http::{HeaderValue, StatusCode, header::AUTHORIZATION};
use axum_test::{TestRequest, TestServer};
use hotel_core::environment::Clock;
use hotel_core::{Role, RoomStatus, UserId};
use hotel_testing::TestHotel;
use hotel_web::{AppState, build_router};
use serde_json::{Value, json};
use uuid::Uuid;

struct Api {
    hotel: TestHotel,
    server: TestServer,
    guest: Uuid,
    staff: Uuid,
}

impl Api {
    async fn start(rooms: u32) -> Self {
        hotel_testing::init_test_tracing();
        let hotel = TestHotel::deluxe(rooms).await;
        let guest = hotel.session(hotel.guest, Role::Guest).await;
        let staff = hotel.session(UserId::new(), Role::Receptionist).await;
        let server = TestServer::new(build_router(AppState::new(&hotel.env))).unwrap();
        Self {
            hotel,
            server,
            guest,
            staff,
        }
    }

    fn hold_body(&self, check_in: &str, check_out: &str) -> Value {
        json!({
            "room_type_id": self.hotel.deluxe.id,
            "check_in": check_in,
            "check_out": check_out,
            "adults": 2,
        })
    }

    async fn hold(&self, check_in: &str, check_out: &str) -> Value {
        let response = as_user(self.server.post("/reservations"), self.guest)
            .json(&self.hold_body(check_in, check_out))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        response.json::<Value>()
    }
}

fn as_user(request: TestRequest, token: Uuid) -> TestRequest {
    request.add_header(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    )
}

fn booking_from(reservation: &Value, method: &str) -> Value {
    json!({
        "reservation_id": reservation["id"],
        "check_in": reservation["check_in"],
        "check_out": reservation["check_out"],
        "adults": reservation["adults"],
        "children": reservation["children"],
        "rooms": [{
            "room_id": reservation["room_id"],
            "price_per_night": reservation["price_per_night"],
            "nights": reservation["nights"],
            "subtotal": reservation["subtotal"],
        }],
        "subtotal": reservation["subtotal"],
        "tax": reservation["tax"],
        "total_price": reservation["total_price"],
        "payment_method": method,
    })
}

#[tokio::test]
async fn requests_without_a_session_are_unauthorized() {
    let api = Api::start(1).await;

    let response = api.server.get("/reservations/my").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "UNAUTHORIZED");

    let response = as_user(api.server.get("/reservations/my"), Uuid::new_v4()).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn hold_is_priced_and_listed() {
    let api = Api::start(1).await;
    let reservation = api.hold("2026-03-01", "2026-03-03").await;

    assert_eq!(reservation["status"], "pending");
    assert_eq!(reservation["nights"], 2);
    assert_eq!(reservation["price_per_night"], 90.0);
    assert_eq!(reservation["subtotal"], 180.0);
    assert_eq!(reservation["tax"], 27.0);
    assert_eq!(reservation["total_price"], 207.0);
    assert!(reservation["code"].as_str().unwrap().starts_with("RES-"));

    let mine = as_user(api.server.get("/reservations/my"), api.guest).await;
    assert_eq!(mine.status_code(), StatusCode::OK);
    assert_eq!(mine.json::<Value>().as_array().unwrap().len(), 1);

    let path = format!("/reservations/{}", reservation["id"].as_str().unwrap());
    let one = as_user(api.server.get(&path), api.guest).await;
    assert_eq!(one.json::<Value>()["id"], reservation["id"]);
}

#[tokio::test]
async fn bad_input_and_full_house_are_bad_requests() {
    let api = Api::start(1).await;

    let response = as_user(api.server.post("/reservations"), api.guest)
        .json(&json!({ "room_type_id": api.hotel.deluxe.id, "check_out": "2026-03-03" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["message"].as_str().unwrap().contains("check_in"));

    let response = as_user(api.server.post("/reservations"), api.guest)
        .json(&api.hold_body("2026-03-03", "2026-03-01"))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    api.hold("2026-03-01", "2026-03-03").await;
    let response = as_user(api.server.post("/reservations"), api.guest)
        .json(&api.hold_body("2026-03-02", "2026-03-04"))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "NO_AVAILABILITY");

    let response = as_user(api.server.post("/reservations"), api.guest)
        .json(&json!({
            "room_type_id": Uuid::new_v4(),
            "check_in": "2026-03-01",
            "check_out": "2026-03-03",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn guests_cannot_use_staff_routes() {
    let api = Api::start(1).await;

    for request in [
        api.server.get("/reservations"),
        api.server.get("/bookings"),
    ] {
        let response = as_user(request, api.guest).await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    }

    let room = format!("/rooms/{}/status", api.hotel.rooms[0].id);
    let response = as_user(api.server.patch(&room), api.guest)
        .json(&json!({ "status": "cleaning" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = as_user(api.server.get("/reservations?status=pending"), api.staff).await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn cash_booking_then_desk_confirms_payment() {
    let api = Api::start(1).await;
    let reservation = api.hold("2026-03-01", "2026-03-03").await;

    let response = as_user(api.server.post("/bookings"), api.guest)
        .json(&booking_from(&reservation, "Cash"))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let booking = response.json::<Value>();
    assert_eq!(booking["status"], "confirmed_unpaid");
    assert_eq!(booking["total_price"], 207.0);
    let id = booking["id"].as_str().unwrap().to_string();

    let snapshot = api.hotel.store.snapshot().await;
    assert_eq!(
        snapshot.room(api.hotel.rooms[0].id).unwrap().status,
        RoomStatus::Reserved
    );

    let response = as_user(
        api.server.post(&format!("/bookings/{id}/confirm-payment")),
        api.guest,
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = as_user(
        api.server.post(&format!("/bookings/{id}/confirm-payment")),
        api.staff,
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let confirmed = response.json::<Value>();
    assert_eq!(confirmed["booking"]["status"], "confirmed");
    assert_eq!(confirmed["payment"]["status"], "completed");

    let response = as_user(
        api.server.post(&format!("/bookings/{id}/confirm-payment")),
        api.staff,
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let page = as_user(api.server.get("/bookings?status=confirmed&page=1&limit=5"), api.staff)
        .await
        .json::<Value>();
    assert_eq!(page["pagination"]["total"], 1);
    assert_eq!(page["bookings"][0]["id"], booking["id"]);
}

#[tokio::test]
async fn tampered_total_is_rejected() {
    let api = Api::start(1).await;
    let reservation = api.hold("2026-03-01", "2026-03-03").await;

    let mut body = booking_from(&reservation, "Card");
    body["total_price"] = json!(100.0);
    let response = as_user(api.server.post("/bookings"), api.guest)
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "PRICE_MISMATCH");
    assert!(api.hotel.store.snapshot().await.bookings.is_empty());
}

#[tokio::test]
async fn checkout_leaves_room_dirty_until_cleaned() {
    let api = Api::start(1).await;
    let reservation = api.hold("2026-03-01", "2026-03-03").await;
    let booking = as_user(api.server.post("/bookings"), api.guest)
        .json(&booking_from(&reservation, "Card"))
        .await
        .json::<Value>();
    let status = format!("/bookings/{}/status", booking["id"].as_str().unwrap());

    for next in ["checked_in", "checked_out"] {
        let response = as_user(api.server.patch(&status), api.staff)
            .json(&json!({ "status": next }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["status"], next);
    }
    let response = as_user(api.server.patch(&status), api.staff)
        .json(&json!({ "status": "checked_in" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(api.hotel.notifier.count("housekeeping_requested"), 1);

    let room = format!("/rooms/{}/status", api.hotel.rooms[0].id);
    for next in ["cleaning", "available"] {
        let response = as_user(api.server.patch(&room), api.staff)
            .json(&json!({ "status": next }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    let today = api.hotel.clock.now().date_naive();
    let availability = as_user(
        api.server.get(&format!(
            "/room-types/{}/availability?check_in={}&check_out={}",
            api.hotel.deluxe.id,
            today,
            today.succ_opt().unwrap()
        )),
        api.guest,
    )
    .await
    .json::<Value>();
    assert_eq!(availability["rooms"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn guest_cancels_own_hold_only() {
    let api = Api::start(1).await;
    let reservation = api.hold("2026-03-01", "2026-03-03").await;
    let cancel = format!("/reservations/{}/cancel", reservation["id"].as_str().unwrap());

    let stranger = api.hotel.session(UserId::new(), Role::Guest).await;
    let response = as_user(api.server.post(&cancel), stranger).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = as_user(api.server.post(&cancel), api.guest).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "cancelled");

    // The room is free again.
    api.hold("2026-03-01", "2026-03-03").await;
}

#[tokio::test]
async fn probes_report_health() {
    let api = Api::start(0).await;

    let health = api.server.get("/health").await;
    assert_eq!(health.status_code(), StatusCode::OK);
    assert_eq!(health.json::<Value>()["status"], "ok");

    let ready = api.server.get("/ready").await;
    assert_eq!(ready.status_code(), StatusCode::OK);
    assert_eq!(ready.json::<Value>()["database"], true);
    assert!(ready.headers().contains_key("x-request-id"));
}
