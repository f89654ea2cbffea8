//! Flights and flight bookings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::hotels::UserRef;
use super::{MessageBody, Page};
use crate::booking::{FlightBookingForm, FlightBookingPatch};
use crate::cache::{DATA_STALE_TIME, QueryCache, QueryKey};
use crate::client::{ApiClient, ApiRequest};
use crate::error::ApiResult;
use crate::filters::{FlightFilter, ListFilter};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Flight {
    pub id: String,
    pub flight_number: String,
    pub airline_name: String,
    pub airline_code: String,
    pub aircraft_type: String,
    pub departure_airport_code: String,
    pub departure_airport_name: String,
    pub departure_city: String,
    pub departure_country: String,
    pub arrival_airport_code: String,
    pub arrival_airport_name: String,
    pub arrival_city: String,
    pub arrival_country: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub duration_minutes: u32,
    pub base_price: f64,
    pub currency: String,
    pub available_seats: u32,
    pub total_seats: u32,
    pub class_type: String,
    pub has_wifi: bool,
    pub has_meal: bool,
    pub has_entertainment: bool,
    pub has_luggage: bool,
    pub status: String,
    pub is_domestic: bool,
    pub duration_formatted: Option<String>,
    pub route: Option<String>,
    pub departure_time_formatted: Option<String>,
    pub arrival_time_formatted: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Flight {
    /// `LIS → JFK`, falling back to the airport codes when no route is sent.
    pub fn route_label(&self) -> String {
        match self.route.as_deref().filter(|r| !r.is_empty()) {
            Some(route) => route.to_string(),
            None => format!("{} → {}", self.departure_airport_code, self.arrival_airport_code),
        }
    }

    /// `7h 25m`, unless the backend already formatted it.
    pub fn duration_label(&self) -> String {
        if let Some(formatted) = self.duration_formatted.as_deref().filter(|d| !d.is_empty()) {
            return formatted.to_string();
        }
        let hours = self.duration_minutes / 60;
        let minutes = self.duration_minutes % 60;
        format!("{hours}h {minutes}m")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassengerType {
    #[default]
    Adult,
    Child,
    Infant,
}

impl PassengerType {
    /// Infant under 2, child under 12.
    pub fn for_age(age: u32) -> Self {
        match age {
            0..=1 => PassengerType::Infant,
            2..=11 => PassengerType::Child,
            _ => PassengerType::Adult,
        }
    }
}

impl fmt::Display for PassengerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PassengerType::Adult => "adult",
            PassengerType::Child => "child",
            PassengerType::Infant => "infant",
        };
        f.write_str(s)
    }
}

impl FromStr for PassengerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adult" => Ok(PassengerType::Adult),
            "child" => Ok(PassengerType::Child),
            "infant" => Ok(PassengerType::Infant),
            other => Err(format!("unknown passenger type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passenger {
    pub full_name: String,
    pub age: u32,
    #[serde(rename = "type", default)]
    pub kind: PassengerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
}

/// Flight embedded in a booking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookedFlightSummary {
    pub id: String,
    pub flight_number: String,
    pub airline_name: String,
    pub airline_code: String,
    pub departure_airport_code: String,
    pub arrival_airport_code: String,
    pub departure_city: String,
    pub arrival_city: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub class_type: String,
    pub route: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightBooking {
    pub id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub departure_date: String,
    pub return_date: Option<String>,
    pub total_price: f64,
    pub currency: String,
    pub taxes_fees: f64,
    pub discounts: f64,
    pub base_price: f64,
    pub passengers: Vec<Passenger>,
    pub class_type: String,
    pub special_requests: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub status: String,
    pub flight_id: String,
    pub flight: Option<BookedFlightSummary>,
    pub user: Option<UserRef>,
    pub created_at: Option<String>,
}

/// Flight endpoints, with cached reads.
#[derive(Debug, Clone, Copy)]
pub struct FlightsApi<'a> {
    client: &'a ApiClient,
    cache: &'a QueryCache,
}

impl<'a> FlightsApi<'a> {
    pub fn new(client: &'a ApiClient, cache: &'a QueryCache) -> Self {
        Self { client, cache }
    }

    /// One page of flights matching `filter`.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn search(&self, filter: &FlightFilter, page: u32, page_size: u32) -> ApiResult<Page<Flight>> {
        let key = QueryKey::flight_list(&filter.filter_key(), page.max(1), filter.page_limit(page_size));
        let request = ApiRequest::get("/flights").with_query(filter.query(page, page_size));
        self.cache
            .get_or_fetch(key, DATA_STALE_TIME, || self.client.data(request))
            .await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn get(&self, id: &str) -> ApiResult<Flight> {
        let path = format!("/flights/{id}");
        self.cache
            .get_or_fetch(QueryKey::flight_detail(id), DATA_STALE_TIME, || {
                self.client.data(ApiRequest::get(path))
            })
            .await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn popular(&self, limit: u32) -> ApiResult<Page<Flight>> {
        let request = ApiRequest::get("/flights/popular")
            .with_query(vec![("limit".to_string(), limit.to_string())]);
        self.cache
            .get_or_fetch(QueryKey::flight_popular(limit), DATA_STALE_TIME, || {
                self.client.data(request)
            })
            .await
    }

    /// Books a flight. Seat counts change, so cached flight lists are dropped.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn book(&self, form: &FlightBookingForm) -> ApiResult<FlightBooking> {
        let request = ApiRequest::post("/flight-bookings/").with_json(form)?;
        let booking = self.client.data(request).await?;
        self.cache.invalidate(&QueryKey::flight_lists());
        Ok(booking)
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn my_bookings(&self) -> ApiResult<Page<FlightBooking>> {
        self.cache
            .get_or_fetch(QueryKey::flight_bookings(), DATA_STALE_TIME, || {
                self.client.data(ApiRequest::get("/flight-bookings/my-bookings"))
            })
            .await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn modify(&self, booking_id: &str, patch: &FlightBookingPatch) -> ApiResult<FlightBooking> {
        let request = ApiRequest::patch(format!("/flight-bookings/{booking_id}")).with_json(patch)?;
        let booking = self.client.data(request).await?;
        self.cache.invalidate(&QueryKey::flight_bookings());
        Ok(booking)
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn cancel(&self, booking_id: &str) -> ApiResult<MessageBody> {
        let request = ApiRequest::delete(format!("/flight-bookings/{booking_id}"));
        let body = self.client.data(request).await?;
        self.cache.invalidate(&QueryKey::flight_bookings());
        Ok(body)
    }
}
