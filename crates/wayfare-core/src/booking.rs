//! Booking forms and their validation rules.
//!
//! Hotel bookings are sent as camelCase JSON, flight bookings as
//! snake_case. Modifications are partial: only the fields being changed are
//! sent, but the rules are checked against the booking as it would look
//! after the change.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::{FlightBooking, HotelBooking, Passenger, PassengerType};
use crate::validation::{ValidationErrors, is_valid_email};

pub const MAX_GUESTS: u32 = 10;
pub const MAX_ROOMS: u32 = 5;
pub const MAX_PASSENGERS: usize = 9;
pub const MAX_PASSENGER_AGE: u32 = 120;
pub const DEFAULT_CURRENCY: &str = "USD";

/// Rooms needed to fit `guests` at two guests per room.
pub fn suggested_rooms(guests: u32) -> u32 {
    guests.div_ceil(2).max(1)
}

/// Reads a backend date (`YYYY-MM-DD` or a full timestamp).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// New hotel booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelBookingForm {
    pub customer_name: String,
    pub customer_email: String,
    pub check_in_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out_date: Option<NaiveDate>,
    pub guests: u32,
    pub rooms: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    pub hotel_id: String,
}

impl HotelBookingForm {
    /// Checks every rule; `today` is the local calendar date.
    ///
    /// # Errors
    /// Returns all failed rules.
    pub fn validate(&self, today: NaiveDate) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(!blank(&self.customer_name), "customerName", "Customer name is required");
        errors.check(
            is_valid_email(&self.customer_email),
            "customerEmail",
            "Please enter a valid email address",
        );
        errors.check(self.guests >= 1, "guests", "At least 1 guest is required");
        errors.check(self.guests <= MAX_GUESTS, "guests", "Maximum 10 guests allowed");
        errors.check(self.rooms >= 1, "rooms", "At least 1 room is required");
        errors.check(self.rooms <= MAX_ROOMS, "rooms", "Maximum 5 rooms allowed");
        errors.check(!blank(&self.hotel_id), "hotelId", "Hotel ID is required");

        match self.check_out_date {
            None => errors.push("checkOutDate", "Check-out date is required"),
            Some(check_out) => {
                errors.check(
                    check_out > self.check_in_date,
                    "checkOutDate",
                    "Check-out date must be after check-in date",
                );
                errors.check(
                    check_out > today,
                    "checkOutDate",
                    "Check-out date must be greater than today",
                );
            }
        }

        errors.check(
            self.rooms >= self.guests.div_ceil(2),
            "rooms",
            "Not enough rooms for the number of guests. Please add more rooms.",
        );
        errors.into_result()
    }

    /// Nights between check-in and check-out.
    pub fn nights(&self) -> Option<i64> {
        let nights = (self.check_out_date? - self.check_in_date).num_days();
        (nights > 0).then_some(nights)
    }

    /// Stay price for all rooms at `nightly` per room.
    pub fn total_price(&self, nightly: f64) -> Option<f64> {
        let nights = self.nights()?;
        Some(nights as f64 * nightly * f64::from(self.rooms))
    }
}

/// Partial hotel booking change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelBookingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
}

impl HotelBookingPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The booking as it would be after applying this change.
    ///
    /// # Errors
    /// Fails when the stored booking has no readable check-in date and the
    /// change does not supply one.
    pub fn merged_onto(&self, booking: &HotelBooking) -> Result<HotelBookingForm, ValidationErrors> {
        let check_in = self
            .check_in_date
            .or_else(|| parse_date(&booking.check_in_date));
        let Some(check_in_date) = check_in else {
            let mut errors = ValidationErrors::new();
            errors.push("checkInDate", "Start date is required");
            return Err(errors);
        };
        Ok(HotelBookingForm {
            customer_name: self
                .customer_name
                .clone()
                .unwrap_or_else(|| booking.customer_name.clone()),
            customer_email: self
                .customer_email
                .clone()
                .unwrap_or_else(|| booking.customer_email.clone()),
            check_in_date,
            check_out_date: self
                .check_out_date
                .or_else(|| parse_date(&booking.check_out_date)),
            guests: self.guests.unwrap_or(booking.guests),
            rooms: self.rooms.unwrap_or(booking.rooms),
            special_requests: self
                .special_requests
                .clone()
                .or_else(|| booking.special_requests.clone()),
            hotel_id: booking.hotel_id.clone(),
        })
    }

    /// Validates the merged booking.
    ///
    /// # Errors
    /// Returns all failed rules of the merged booking.
    pub fn validate_against(&self, booking: &HotelBooking, today: NaiveDate) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            let mut errors = ValidationErrors::new();
            errors.push("booking", "Nothing to change");
            return Err(errors);
        }
        self.merged_onto(booking)?.validate(today)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        };
        f.write_str(s)
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "FAILED" => Ok(PaymentStatus::Failed),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            other => Err(format!("unknown payment status '{other}'")),
        }
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// New flight booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightBookingForm {
    pub flight_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub passengers: Vec<Passenger>,
    pub departure_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<NaiveDate>,
    pub base_price: f64,
    #[serde(default)]
    pub taxes_fees: f64,
    #[serde(default)]
    pub discounts: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seat_preferences: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meal_preferences: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
}

impl FlightBookingForm {
    /// Form with defaults for the optional money fields.
    pub fn new(flight_id: impl Into<String>, departure_date: NaiveDate, base_price: f64) -> Self {
        Self {
            flight_id: flight_id.into(),
            customer_name: String::new(),
            customer_email: String::new(),
            customer_phone: String::new(),
            passengers: Vec::new(),
            departure_date,
            return_date: None,
            base_price,
            taxes_fees: 0.0,
            discounts: 0.0,
            currency: default_currency(),
            seat_preferences: Vec::new(),
            meal_preferences: Vec::new(),
            special_requests: None,
            payment_status: PaymentStatus::Pending,
        }
    }

    /// Checks every rule; `today` is the local calendar date.
    ///
    /// # Errors
    /// Returns all failed rules.
    pub fn validate(&self, today: NaiveDate) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(!blank(&self.flight_id), "flight_id", "Flight ID is required");
        errors.check(!blank(&self.customer_name), "customer_name", "Customer name is required");
        errors.check(
            is_valid_email(&self.customer_email),
            "customer_email",
            "Please enter a valid email address",
        );
        errors.check(!blank(&self.customer_phone), "customer_phone", "Phone number is required");
        errors.check(!self.passengers.is_empty(), "passengers", "At least 1 passenger required");
        errors.check(
            self.passengers.len() <= MAX_PASSENGERS,
            "passengers",
            "Maximum 9 passengers allowed",
        );
        for passenger in &self.passengers {
            validate_passenger(passenger, &mut errors);
        }
        errors.check(self.base_price >= 0.0, "base_price", "Base price must be positive");
        errors.check(self.taxes_fees >= 0.0, "taxes_fees", "Taxes and fees must be positive");
        errors.check(self.discounts >= 0.0, "discounts", "Discounts must be positive");
        errors.check(
            self.departure_date >= today,
            "departure_date",
            "Departure date must be today or in the future",
        );
        if let Some(return_date) = self.return_date {
            errors.check(
                return_date > self.departure_date,
                "return_date",
                "Return date must be after departure date",
            );
        }
        errors.into_result()
    }

    /// Fare for all passengers after taxes and discounts.
    pub fn total_price(&self) -> f64 {
        let fare = self.base_price * self.passengers.len() as f64;
        (fare + self.taxes_fees - self.discounts).max(0.0)
    }
}

fn validate_passenger(passenger: &Passenger, errors: &mut ValidationErrors) {
    errors.check(
        !blank(&passenger.full_name),
        "passengers.full_name",
        "Full name is required",
    );
    errors.check(passenger.age <= MAX_PASSENGER_AGE, "passengers.age", "Invalid age");
}

/// Partial flight booking change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightBookingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passengers: Option<Vec<Passenger>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
}

impl FlightBookingPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The booking as it would be after applying this change.
    ///
    /// # Errors
    /// Fails when no departure date can be determined.
    pub fn merged_onto(&self, booking: &FlightBooking) -> Result<FlightBookingForm, ValidationErrors> {
        let departure = self
            .departure_date
            .or_else(|| parse_date(&booking.departure_date));
        let Some(departure_date) = departure else {
            let mut errors = ValidationErrors::new();
            errors.push("departure_date", "Departure date is required");
            return Err(errors);
        };
        let mut form = FlightBookingForm::new(booking.flight_id.clone(), departure_date, booking.base_price);
        form.customer_name = self
            .customer_name
            .clone()
            .unwrap_or_else(|| booking.customer_name.clone());
        form.customer_email = self
            .customer_email
            .clone()
            .unwrap_or_else(|| booking.customer_email.clone());
        form.customer_phone = self
            .customer_phone
            .clone()
            .unwrap_or_else(|| booking.customer_phone.clone());
        form.passengers = self
            .passengers
            .clone()
            .unwrap_or_else(|| booking.passengers.clone());
        form.return_date = self
            .return_date
            .or_else(|| booking.return_date.as_deref().and_then(parse_date));
        form.taxes_fees = booking.taxes_fees;
        form.discounts = booking.discounts;
        if !booking.currency.is_empty() {
            form.currency = booking.currency.clone();
        }
        form.special_requests = self
            .special_requests
            .clone()
            .or_else(|| booking.special_requests.clone());
        form.payment_status = self.payment_status.unwrap_or_default();
        Ok(form)
    }

    /// Validates the merged booking.
    ///
    /// # Errors
    /// Returns all failed rules of the merged booking.
    pub fn validate_against(&self, booking: &FlightBooking, today: NaiveDate) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            let mut errors = ValidationErrors::new();
            errors.push("booking", "Nothing to change");
            return Err(errors);
        }
        self.merged_onto(booking)?.validate(today)
    }
}

/// Parses `name:age[:adult|child|infant]` as typed on the command line.
///
/// # Errors
/// Returns a message when the value does not have that shape.
pub fn parse_passenger(raw: &str) -> Result<Passenger, String> {
    let mut parts = raw.split(':').map(str::trim);
    let name = parts.next().filter(|n| !n.is_empty()).ok_or("passenger name is empty")?;
    let age: u32 = parts
        .next()
        .ok_or("passenger age is missing (expected name:age[:type])")?
        .parse()
        .map_err(|_| format!("invalid passenger age in '{raw}'"))?;
    let kind = match parts.next() {
        Some(kind) => kind.parse::<PassengerType>()?,
        None => PassengerType::for_age(age),
    };
    Ok(Passenger {
        full_name: name.to_string(),
        age,
        kind,
        seat_preference: None,
        meal_preference: None,
        special_requests: None,
    })
}
