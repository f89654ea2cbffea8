//! Typed wrappers over the booking backend's REST endpoints.

pub mod auth;
pub mod flights;
pub mod hotels;

use serde::{Deserialize, Serialize};

pub use auth::AuthApi;
pub use flights::{
    BookedFlightSummary, Flight, FlightBooking, FlightsApi, Passenger, PassengerType,
};
pub use hotels::{Hotel, HotelBooking, HotelSummary, HotelsApi, UserRef};

/// Envelope wrapping every backend response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    pub data: T,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
}

fn first_page() -> u32 {
    1
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        Self {
            items,
            total,
            page,
            limit,
        }
    }

    /// Number of pages for `total` items at `page_size` per page.
    pub fn page_count(total: u64, page_size: u32) -> u64 {
        if page_size == 0 {
            return 0;
        }
        total.div_ceil(u64::from(page_size))
    }
}

/// Body of delete endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub message: String,
}
