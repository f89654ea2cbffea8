//! Integration tests for hotel search paging against a mock backend.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn hotel(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "city": "Lisbon",
        "country": "Portugal",
        "price": 120,
        "currency": "EUR",
        "rating": 4.5,
        "star_rating": 4,
        "has_wifi": true
    })
}

fn page(items: Vec<Value>, total: u64, page: u32) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "statusCode": 200,
        "message": "OK",
        "data": {"items": items, "total": total, "page": page, "limit": 2}
    }))
}

#[tokio::test]
async fn test_search_loads_every_page_with_all() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hotels"))
        .and(query_param("page", "1"))
        .and(query_param("city", "Lisbon"))
        .respond_with(page(vec![hotel("h1", "Casa Azul"), hotel("h2", "Rio Tejo")], 3, 1))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hotels"))
        .and(query_param("page", "2"))
        .respond_with(page(vec![hotel("h3", "Alfama Inn")], 3, 2))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .env("WAYFARE_BASE_URL", server.uri())
        .args(["hotels", "search", "--city", "Lisbon", "--limit", "2", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Casa Azul"))
        .stdout(predicate::str::contains("Alfama Inn"))
        .stdout(predicate::str::contains("3 of 3 hotels"));
}

#[tokio::test]
async fn test_search_stops_after_requested_pages() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hotels"))
        .and(query_param("page", "1"))
        .respond_with(page(vec![hotel("h1", "Casa Azul"), hotel("h2", "Rio Tejo")], 6, 1))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hotels"))
        .and(query_param("page", "2"))
        .respond_with(page(vec![hotel("h3", "Alfama Inn")], 6, 2))
        .expect(0)
        .mount(&server)
        .await;

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .env("WAYFARE_BASE_URL", server.uri())
        .args(["hotels", "search", "--limit", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rio Tejo"))
        .stdout(predicate::str::contains("Alfama Inn").not());
}

#[test]
fn test_search_rejects_inverted_price_range() {
    let home = TempDir::new().unwrap();

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .env("WAYFARE_BASE_URL", "http://127.0.0.1:9")
        .args(["hotels", "search", "--min-price", "300", "--max-price", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid hotel filter"));
}

#[tokio::test]
async fn test_search_surfaces_backend_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hotels"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "statusCode": 500,
            "message": "Database unavailable"
        })))
        .mount(&server)
        .await;

    cargo_bin_cmd!("wayfare")
        .env("WAYFARE_HOME", home.path())
        .env("WAYFARE_BASE_URL", server.uri())
        .args(["hotels", "search"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Database unavailable"));
}
