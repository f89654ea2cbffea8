//! End-to-end flows through `Wayfare`: search paging, bookings, logout.

mod support;

use chrono::{Duration, Local};
use serde_json::json;
use support::{client, envelope, hotel, hotel_page, refreshed, tokens, unauthorized};
use wayfare_core::booking::{FlightBookingForm, HotelBookingForm, parse_passenger};
use wayfare_core::config::Config;
use wayfare_core::filters::{FlightFilter, HotelFilter, ListFilter};
use wayfare_core::pager::{Applied, Pager};
use wayfare_core::permissions::Action;
use wayfare_core::{Wayfare, permissions};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn jwt(payload: &serde_json::Value) -> String {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.sig")
}

fn app(server: &MockServer, access: Option<&str>, refresh: Option<&str>) -> Wayfare {
    Wayfare::from_parts(Config::default(), client(&server.uri(), tokens(access, refresh)))
}

#[tokio::test]
async fn test_logout_clears_tokens_user_and_cache() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/logout-google"))
        .respond_with(envelope(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    let token = jwt(&json!({"sub": "u-1", "email": "ana@example.com", "fullName": "Ana Lima"}));
    let app = app(&server, Some(&token), Some("refresh"));
    assert_eq!(app.user().unwrap().name, "Ana Lima");
    app.cache().insert(
        wayfare_core::cache::QueryKey::hotel_bookings(),
        &json!([]),
        std::time::Duration::from_secs(60),
    );

    assert!(app.logout().await.unwrap());

    assert!(app.client().tokens().access_token().is_none());
    assert!(app.client().tokens().refresh_token().is_none());
    assert!(app.user().is_none());
    assert!(!app.is_authenticated());
    assert!(app.cache().is_empty());
}

#[tokio::test]
async fn test_logout_still_clears_locally_when_server_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/logout-google"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let app = app(&server, Some("opaque"), None);
    assert!(app.logout().await.unwrap());
    assert!(app.client().tokens().access_token().is_none());
    assert!(!app.is_authenticated());
}

#[tokio::test]
async fn test_failed_refresh_signs_session_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hotel-bookings/my-bookings"))
        .respond_with(unauthorized())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user/refresh-token-google"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let token = jwt(&json!({"sub": "u-1", "fullName": "Ana Lima"}));
    let app = app(&server, Some(&token), Some("refresh"));
    let mut changes = app.session().subscribe();

    let err = app.hotels().my_bookings().await.unwrap_err();

    assert!(err.is_unauthorized());
    changes.changed().await.unwrap();
    assert!(!changes.borrow().authenticated);
    assert!(app.user().is_none());
}

#[tokio::test]
async fn test_search_pages_then_filter_change_replaces_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hotels"))
        .and(query_param("city", "Lisbon"))
        .and(query_param("page", "1"))
        .respond_with(envelope(hotel_page(
            vec![hotel("1", "Alfama Rooms", "Lisbon"), hotel("2", "Baixa Suites", "Lisbon")],
            3,
            1,
            2,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hotels"))
        .and(query_param("city", "Lisbon"))
        .and(query_param("page", "2"))
        .respond_with(envelope(hotel_page(vec![hotel("3", "Belem Inn", "Lisbon")], 3, 2, 2)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hotels"))
        .and(query_param("city", "Porto"))
        .and(query_param("page", "1"))
        .respond_with(envelope(hotel_page(vec![hotel("9", "Ribeira House", "Porto")], 1, 1, 2)))
        .mount(&server)
        .await;

    let app = app(&server, None, None);
    let hotels = app.hotels();
    let mut pager = Pager::new(2);

    let mut filter = HotelFilter {
        city: Some("Lisbon".to_string()),
        ..HotelFilter::default()
    };
    let first = pager.reset(filter.filter_key());
    pager
        .load(first, |n| hotels.search(&filter, n, 2))
        .await
        .unwrap();
    while let Some(next) = pager.request_more() {
        pager.load(next, |n| hotels.search(&filter, n, 2)).await;
    }
    let names: Vec<&str> = pager.items().iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["Alfama Rooms", "Baixa Suites", "Belem Inn"]);
    assert!(!pager.has_more());

    filter.city = Some("Porto".to_string());
    let fresh = pager.set_filter(&filter.filter_key()).unwrap();
    let applied = pager.load(fresh, |n| hotels.search(&filter, n, 2)).await;
    assert_eq!(applied, Some(Applied::Replaced));
    let names: Vec<&str> = pager.items().iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["Ribeira House"]);
}

#[tokio::test]
async fn test_booking_invalidates_cached_booking_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hotel-bookings/my-bookings"))
        .respond_with(envelope(json!({"items": [], "total": 0, "page": 1, "limit": 10})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hotel-bookings/"))
        .and(body_partial_json(json!({"hotelId": "h-1", "guests": 2, "rooms": 1})))
        .respond_with(envelope(json!({"id": "b-1", "hotel_id": "h-1", "status": "PENDING"})))
        .expect(1)
        .mount(&server)
        .await;

    let app = app(&server, Some("access"), Some("refresh"));
    let hotels = app.hotels();

    hotels.my_bookings().await.unwrap();
    // Served from cache
    hotels.my_bookings().await.unwrap();

    let today = Local::now().date_naive();
    let form = HotelBookingForm {
        customer_name: "Ana Lima".to_string(),
        customer_email: "ana@example.com".to_string(),
        check_in_date: today + Duration::days(7),
        check_out_date: Some(today + Duration::days(9)),
        guests: 2,
        rooms: 1,
        special_requests: None,
        hotel_id: "h-1".to_string(),
    };
    form.validate(today).unwrap();
    let booking = hotels.book(&form).await.unwrap();
    assert_eq!(booking.id, "b-1");

    hotels.my_bookings().await.unwrap();
}

#[tokio::test]
async fn test_permissions_are_filtered_and_cached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/permissions"))
        .respond_with(envelope(json!([
            {"menuName": "Hotels", "actions": {"list": true, "read": true}},
            {"menuName": "Admin", "actions": {"list": false}}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let app = app(&server, Some("access"), None);
    let menus = app.permissions().await.unwrap();
    assert_eq!(menus.len(), 1);
    assert!(permissions::allows(&menus, "hotels", Action::List));

    let again = app.permissions().await.unwrap();
    assert_eq!(again, menus);
}

#[tokio::test]
async fn test_flight_booking_drops_cached_flight_lists() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flights"))
        .and(query_param("departure_airport_code", "LIS"))
        .respond_with(envelope(json!({
            "items": [{"id": "f-1", "flight_number": "TP203", "available_seats": 12}],
            "total": 1,
            "page": 1,
            "limit": 10
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/flight-bookings/"))
        .respond_with(envelope(json!({"id": "fb-1", "flight_id": "f-1", "status": "PENDING"})))
        .expect(1)
        .mount(&server)
        .await;

    let app = app(&server, Some("access"), Some("refresh"));
    let flights = app.flights();
    let filter = FlightFilter {
        departure_airport_code: Some("LIS".to_string()),
        ..FlightFilter::default()
    };

    flights.search(&filter, 1, 10).await.unwrap();
    // Served from cache
    let cached = flights.search(&filter, 1, 10).await.unwrap();
    assert_eq!(cached.items[0].flight_number, "TP203");

    let today = Local::now().date_naive();
    let mut form = FlightBookingForm::new("f-1", today + Duration::days(14), 320.0);
    form.customer_name = "Ana Lima".to_string();
    form.customer_email = "ana@example.com".to_string();
    form.customer_phone = "+351900000000".to_string();
    form.passengers = vec![parse_passenger("Ana Lima:34").unwrap()];
    form.validate(today).unwrap();
    flights.book(&form).await.unwrap();

    flights.search(&filter, 1, 10).await.unwrap();
}

#[tokio::test]
async fn test_refresh_updates_signed_in_user() {
    let server = MockServer::start().await;

    let old = jwt(&json!({"sub": "u-1", "email": "ana@example.com", "fullName": "Ana Lima"}));
    let new = jwt(&json!({"sub": "u-1", "email": "ana@wayfare.test", "fullName": "Ana L. Lima"}));

    Mock::given(method("GET"))
        .and(path("/hotel-bookings/my-bookings"))
        .and(header("authorization", format!("Bearer {old}").as_str()))
        .respond_with(unauthorized())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user/refresh-token-google"))
        .respond_with(refreshed(&new, "refresh-2"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hotel-bookings/my-bookings"))
        .and(header("authorization", format!("Bearer {new}").as_str()))
        .respond_with(envelope(json!({"items": [], "total": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let app = app(&server, Some(old.as_str()), Some("refresh-1"));
    assert_eq!(app.user().unwrap().email, "ana@example.com");

    app.hotels().my_bookings().await.unwrap();

    let user = app.user().unwrap();
    assert_eq!(user.email, "ana@wayfare.test");
    assert_eq!(user.name, "Ana L. Lima");
    assert!(app.is_authenticated());
}
