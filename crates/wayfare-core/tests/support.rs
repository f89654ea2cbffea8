//! Shared helpers for integration tests.

#![allow(dead_code)]

use serde_json::{Value, json};
use wayfare_core::ApiClient;
use wayfare_core::auth::TokenStore;
use wayfare_core::config::CookieNames;
use wiremock::ResponseTemplate;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

pub fn cookie_names() -> CookieNames {
    CookieNames {
        access: ACCESS_COOKIE.to_string(),
        refresh: REFRESH_COOKIE.to_string(),
    }
}

/// In-memory token store holding the given tokens.
pub fn tokens(access: Option<&str>, refresh: Option<&str>) -> TokenStore {
    let store = TokenStore::in_memory(cookie_names());
    if let Some(access) = access {
        store.set_tokens(access, refresh).unwrap();
    }
    store
}

pub fn client(base_url: &str, tokens: TokenStore) -> ApiClient {
    ApiClient::new(base_url, tokens, None).unwrap()
}

/// Backend envelope around `data`.
pub fn envelope(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "statusCode": 200,
        "message": "OK",
        "data": data,
        "timestamp": "2026-10-19T08:00:00.000Z"
    }))
}

pub fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({
        "statusCode": 401,
        "message": "Unauthorized"
    }))
}

/// Refresh response that delivers new tokens in the body.
pub fn refreshed(access: &str, refresh: &str) -> ResponseTemplate {
    ResponseTemplate::new(201).set_body_json(json!({
        "statusCode": 201,
        "message": "Token refreshed",
        "data": {"accessToken": access, "refreshToken": refresh}
    }))
}

pub fn hotel(id: &str, name: &str, city: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "city": city,
        "country": "Portugal",
        "price": 120,
        "currency": "EUR",
        "rating": 4.5,
        "star_rating": 4,
        "has_wifi": true
    })
}

pub fn hotel_page(items: Vec<Value>, total: u64, page: u32, limit: u32) -> Value {
    json!({"items": items, "total": total, "page": page, "limit": limit})
}
