//! Integration tests for login, whoami and logout.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Unsigned JWT for `Ana Lima <ana@example.com>`, expiring in 2100.
const ACCESS_TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiJ1c2VyLTEiLCJlbWFpbCI6ImFuYUBleGFtcGxlLmNvbSIsImZ1bGxOYW1lIjoiQW5hIExpbWEiLCJleHAiOjQxMDI0NDQ4MDB9.sig";

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "statusCode": 200,
        "message": "OK",
        "data": data
    }))
}

#[test]
fn test_whoami_when_not_logged_in() {
    let home = TempDir::new().unwrap();

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in."));
}

#[test]
fn test_logout_when_not_logged_in() {
    let home = TempDir::new().unwrap();

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in."));
}

#[test]
fn test_bookings_require_login() {
    let home = TempDir::new().unwrap();

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .args(["bookings", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("wayfare login"));
}

#[tokio::test]
async fn test_login_whoami_logout_round() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/permissions"))
        .and(header("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
        .respond_with(ok(json!([
            {"menuName": "Hotel", "actions": {"read": true, "create": true}}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/logout-google"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .env("WAYFARE_BASE_URL", server.uri())
        .args(["login", "--access-token", ACCESS_TOKEN, "--refresh-token", "refresh-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as Ana Lima <ana@example.com>"));

    assert!(home.path().join("cookies.json").exists());

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .env("WAYFARE_BASE_URL", server.uri())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("ana@example.com"))
        .stdout(predicate::str::contains("Expires: 2100-01-01"));

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .env("WAYFARE_BASE_URL", server.uri())
        .arg("permissions")
        .assert()
        .success()
        .stdout(predicate::str::contains("Hotel"))
        .stdout(predicate::str::contains("create, read"));

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .env("WAYFARE_BASE_URL", server.uri())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out."));

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in."));
}

#[tokio::test]
async fn test_expired_session_reports_login_needed() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hotel-bookings/my-bookings"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "statusCode": 401,
            "message": "Unauthorized"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user/refresh-token-google"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/permissions"))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .env("WAYFARE_BASE_URL", server.uri())
        .args(["login", "--access-token", ACCESS_TOKEN, "--refresh-token", "stale"])
        .assert()
        .success();

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .env("WAYFARE_BASE_URL", server.uri())
        .args(["bookings", "list", "--hotels"])
        .assert()
        .failure();

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in."));
}
