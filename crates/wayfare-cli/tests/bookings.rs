//! Integration tests for listing, changing and cancelling bookings.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ACCESS_TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiJ1c2VyLTEiLCJlbWFpbCI6ImFuYUBleGFtcGxlLmNvbSIsImZ1bGxOYW1lIjoiQW5hIExpbWEiLCJleHAiOjQxMDI0NDQ4MDB9.sig";

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "statusCode": 200,
        "message": "OK",
        "data": data
    }))
}

fn hotel_booking(check_in: &str, check_out: &str, guests: u32) -> Value {
    json!({
        "id": "b-1",
        "customer_name": "Ana Lima",
        "customer_email": "ana@example.com",
        "check_in_date": check_in,
        "check_out_date": check_out,
        "guests": guests,
        "rooms": 1,
        "total_price": 360,
        "status": "confirmed",
        "hotel_id": "h1",
        "hotel": {"id": "h1", "name": "Casa Azul", "city": "Lisbon", "currency": "EUR"}
    })
}

/// Mock backend with a signed-in home directory.
async fn signed_in() -> (TempDir, MockServer) {
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/permissions"))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .env("WAYFARE_BASE_URL", server.uri())
        .args(["login", "--access-token", ACCESS_TOKEN])
        .assert()
        .success();

    (home, server)
}

#[tokio::test]
async fn test_list_hotel_bookings() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let (home, server) = signed_in().await;

    Mock::given(method("GET"))
        .and(path("/hotel-bookings/my-bookings"))
        .respond_with(ok(json!({
            "items": [hotel_booking("2099-05-01", "2099-05-04", 2)],
            "total": 1,
            "page": 1,
            "limit": 10
        })))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .env("WAYFARE_BASE_URL", server.uri())
        .args(["bookings", "list", "--hotels"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hotel bookings (1)"))
        .stdout(predicate::str::contains("Casa Azul"))
        .stdout(predicate::str::contains("2099-05-04"))
        .stdout(predicate::str::contains("Flight bookings").not());
}

#[tokio::test]
async fn test_modify_hotel_sends_only_changed_fields() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let (home, server) = signed_in().await;

    Mock::given(method("GET"))
        .and(path("/hotel-bookings/my-bookings"))
        .respond_with(ok(json!({
            "items": [hotel_booking("2099-05-01", "2099-05-04", 2)],
            "total": 1
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/hotel-bookings/b-1"))
        .and(body_partial_json(json!({"guests": 3, "rooms": 2})))
        .respond_with(ok(hotel_booking("2099-05-01", "2099-05-04", 3)))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .env("WAYFARE_BASE_URL", server.uri())
        .args(["bookings", "modify-hotel", "b-1", "--guests", "3", "--rooms", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 guest(s)"));
}

#[tokio::test]
async fn test_modify_unknown_booking_fails() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let (home, server) = signed_in().await;

    Mock::given(method("GET"))
        .and(path("/hotel-bookings/my-bookings"))
        .respond_with(ok(json!({"items": [], "total": 0})))
        .mount(&server)
        .await;

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .env("WAYFARE_BASE_URL", server.uri())
        .args(["bookings", "modify-hotel", "b-404", "--rooms", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Hotel booking 'b-404' not found"));
}

#[tokio::test]
async fn test_modify_without_changes_fails() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let (home, server) = signed_in().await;

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .env("WAYFARE_BASE_URL", server.uri())
        .args(["bookings", "modify-flight", "fb-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to change"));
}

#[tokio::test]
async fn test_cancel_flight_booking() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let (home, server) = signed_in().await;

    Mock::given(method("DELETE"))
        .and(path("/flight-bookings/fb-1"))
        .respond_with(ok(json!({"message": "Booking cancelled"})))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .env("WAYFARE_BASE_URL", server.uri())
        .args(["bookings", "cancel-flight", "fb-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled booking fb-1: Booking cancelled"));
}

#[tokio::test]
async fn test_book_hotel_uses_requested_hotel_id() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let (home, server) = signed_in().await;

    // Detail payload without an `id` field.
    Mock::given(method("GET"))
        .and(path("/hotels/h-7"))
        .respond_with(ok(json!({"name": "Casa Azul", "price": 120, "currency": "EUR"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hotel-bookings/"))
        .and(body_partial_json(json!({"hotelId": "h-7", "guests": 2, "rooms": 1})))
        .respond_with(ok(json!({"id": "b-9", "hotel_id": "h-7", "status": "PENDING"})))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .env("WAYFARE_BASE_URL", server.uri())
        .args([
            "hotels",
            "book",
            "h-7",
            "--name",
            "Ana Lima",
            "--email",
            "ana@example.com",
            "--check-in",
            "2099-05-01",
            "--check-out",
            "2099-05-04",
            "--guests",
            "2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Booked Casa Azul (booking b-9)."));
}
