//! Search filters for the hotel and flight lists.
//!
//! Filters serialize to query pairs the way the search forms submit them:
//! unset values, blank strings and unchecked (`false`) flags are left out.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validation::ValidationErrors;

/// Largest page size the backend accepts.
pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("invalid sort order '{other}', expected asc or desc")),
        }
    }
}

/// Common behavior of list filters.
pub trait ListFilter {
    /// Query pairs for the filter criteria, without `page`/`limit`.
    fn criteria(&self) -> Vec<(String, String)>;

    /// Explicit page size, if the filter sets one.
    fn limit(&self) -> Option<u32>;

    /// Checks field ranges and cross-field rules.
    ///
    /// # Errors
    /// Returns every failed rule.
    fn validate(&self) -> Result<(), ValidationErrors>;

    /// Identity of the criteria. A change of key resets the list.
    fn filter_key(&self) -> String {
        self.criteria()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Page size sent to the backend.
    fn page_limit(&self, default_limit: u32) -> u32 {
        self.limit().unwrap_or(default_limit).clamp(1, MAX_LIMIT)
    }

    /// Full query for one page.
    fn query(&self, page: u32, default_limit: u32) -> Vec<(String, String)> {
        let mut pairs = self.criteria();
        pairs.push(("page".to_string(), page.max(1).to_string()));
        pairs.push(("limit".to_string(), self.page_limit(default_limit).to_string()));
        pairs
    }
}

#[derive(Default)]
struct QueryPairs(Vec<(String, String)>);

impl QueryPairs {
    fn text(&mut self, key: &str, value: Option<&String>) {
        if let Some(value) = value.map(|v| v.trim()).filter(|v| !v.is_empty()) {
            self.0.push((key.to_string(), value.to_string()));
        }
    }

    fn number<N: ToString>(&mut self, key: &str, value: Option<N>) {
        if let Some(value) = value {
            self.0.push((key.to_string(), value.to_string()));
        }
    }

    fn flag(&mut self, key: &str, value: Option<bool>) {
        if value == Some(true) {
            self.0.push((key.to_string(), "true".to_string()));
        }
    }

    fn sort(&mut self, sort_by: Option<&String>, order: Option<SortOrder>) {
        self.text("sort_by", sort_by);
        self.number("sort_order", order.map(SortOrder::as_str));
    }
}

fn check_page_and_limit(errors: &mut ValidationErrors, page: Option<u32>, limit: Option<u32>) {
    errors.check(page.is_none_or(|p| p >= 1), "page", "Page must be at least 1");
    errors.check(
        limit.is_none_or(|l| (1..=MAX_LIMIT).contains(&l)),
        "limit",
        "Limit must be between 1 and 100",
    );
}

fn check_range(errors: &mut ValidationErrors, min: Option<f64>, max: Option<f64>, field: &'static str, message: &str) {
    if let (Some(min), Some(max)) = (min, max) {
        errors.check(min <= max, field, message);
    }
}

/// Hotel list filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotelFilter {
    pub search: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_star_rating: Option<f64>,
    pub min_rating: Option<f64>,
    pub has_wifi: Option<bool>,
    pub has_pool: Option<bool>,
    pub has_spa: Option<bool>,
    pub has_gym: Option<bool>,
    pub has_restaurant: Option<bool>,
    pub has_parking: Option<bool>,
    pub has_pet_friendly: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl ListFilter for HotelFilter {
    fn criteria(&self) -> Vec<(String, String)> {
        let mut q = QueryPairs::default();
        q.text("search", self.search.as_ref());
        q.text("city", self.city.as_ref());
        q.text("country", self.country.as_ref());
        q.number("min_price", self.min_price);
        q.number("max_price", self.max_price);
        q.number("min_star_rating", self.min_star_rating);
        q.number("min_rating", self.min_rating);
        q.flag("has_wifi", self.has_wifi);
        q.flag("has_pool", self.has_pool);
        q.flag("has_spa", self.has_spa);
        q.flag("has_gym", self.has_gym);
        q.flag("has_restaurant", self.has_restaurant);
        q.flag("has_parking", self.has_parking);
        q.flag("has_pet_friendly", self.has_pet_friendly);
        q.sort(self.sort_by.as_ref(), self.sort_order);
        q.0
    }

    fn limit(&self) -> Option<u32> {
        self.limit
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_page_and_limit(&mut errors, self.page, self.limit);
        check_range(
            &mut errors,
            self.min_price,
            self.max_price,
            "max_price",
            "Maximum price must be at least the minimum price",
        );
        errors.check(
            self.min_star_rating.is_none_or(|r| (0.0..=5.0).contains(&r)),
            "min_star_rating",
            "Star rating must be between 0 and 5",
        );
        errors.into_result()
    }
}

/// Flight list filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightFilter {
    pub search: Option<String>,
    pub departure_airport_code: Option<String>,
    pub arrival_airport_code: Option<String>,
    pub departure_city: Option<String>,
    pub arrival_city: Option<String>,
    pub departure_country: Option<String>,
    pub arrival_country: Option<String>,
    /// `YYYY-MM-DD`
    pub departure_date: Option<String>,
    pub arrival_date: Option<String>,
    pub min_available_seats: Option<u32>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub airline_name: Option<String>,
    pub airline_code: Option<String>,
    pub aircraft_type: Option<String>,
    pub class_type: Option<String>,
    pub has_wifi: Option<bool>,
    pub has_meal: Option<bool>,
    pub has_entertainment: Option<bool>,
    pub has_luggage: Option<bool>,
    pub is_domestic: Option<bool>,
    pub min_duration: Option<u32>,
    pub max_duration: Option<u32>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl ListFilter for FlightFilter {
    fn criteria(&self) -> Vec<(String, String)> {
        let mut q = QueryPairs::default();
        q.text("search", self.search.as_ref());
        q.text("departure_airport_code", self.departure_airport_code.as_ref());
        q.text("arrival_airport_code", self.arrival_airport_code.as_ref());
        q.text("departure_city", self.departure_city.as_ref());
        q.text("arrival_city", self.arrival_city.as_ref());
        q.text("departure_country", self.departure_country.as_ref());
        q.text("arrival_country", self.arrival_country.as_ref());
        q.text("departure_date", self.departure_date.as_ref());
        q.text("arrival_date", self.arrival_date.as_ref());
        q.number("min_available_seats", self.min_available_seats);
        q.number("min_price", self.min_price);
        q.number("max_price", self.max_price);
        q.text("airline_name", self.airline_name.as_ref());
        q.text("airline_code", self.airline_code.as_ref());
        q.text("aircraft_type", self.aircraft_type.as_ref());
        q.text("class_type", self.class_type.as_ref());
        q.flag("has_wifi", self.has_wifi);
        q.flag("has_meal", self.has_meal);
        q.flag("has_entertainment", self.has_entertainment);
        q.flag("has_luggage", self.has_luggage);
        q.flag("is_domestic", self.is_domestic);
        q.number("min_duration", self.min_duration);
        q.number("max_duration", self.max_duration);
        q.sort(self.sort_by.as_ref(), self.sort_order);
        q.0
    }

    fn limit(&self) -> Option<u32> {
        self.limit
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_page_and_limit(&mut errors, self.page, self.limit);
        errors.check(
            self.min_available_seats.is_none_or(|s| (1..=9).contains(&s)),
            "min_available_seats",
            "Seats must be between 1 and 9",
        );
        check_range(
            &mut errors,
            self.min_price,
            self.max_price,
            "max_price",
            "Maximum price must be at least the minimum price",
        );
        check_range(
            &mut errors,
            self.min_duration.map(f64::from),
            self.max_duration.map(f64::from),
            "max_duration",
            "Maximum duration must be at least the minimum duration",
        );
        for (field, value) in [
            ("departure_date", &self.departure_date),
            ("arrival_date", &self.arrival_date),
        ] {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                errors.check(
                    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
                    field,
                    "Dates must be formatted as YYYY-MM-DD",
                );
            }
        }
        errors.into_result()
    }
}
