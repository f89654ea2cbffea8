//! Hotels and hotel bookings.

use serde::{Deserialize, Serialize};

use super::{MessageBody, Page};
use crate::booking::{HotelBookingForm, HotelBookingPatch};
use crate::cache::{DATA_STALE_TIME, QueryCache, QueryKey};
use crate::client::{ApiClient, ApiRequest};
use crate::error::ApiResult;
use crate::filters::{HotelFilter, ListFilter};

/// Audit reference to a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRef {
    pub id: String,
    pub email: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hotel {
    pub id: String,
    pub name: String,
    pub description: String,
    pub location: String,
    pub city: String,
    pub country: String,
    pub price: f64,
    pub currency: String,
    pub rating: f64,
    pub star_rating: f64,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub has_wifi: bool,
    pub has_pool: bool,
    pub has_spa: bool,
    pub has_gym: bool,
    pub has_restaurant: bool,
    pub has_parking: bool,
    pub has_pet_friendly: bool,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_by: Option<UserRef>,
    pub updated_by: Option<UserRef>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Hotel {
    /// Names of the amenity flags that are set.
    pub fn amenity_flags(&self) -> Vec<&'static str> {
        [
            (self.has_wifi, "wifi"),
            (self.has_pool, "pool"),
            (self.has_spa, "spa"),
            (self.has_gym, "gym"),
            (self.has_restaurant, "restaurant"),
            (self.has_parking, "parking"),
            (self.has_pet_friendly, "pet friendly"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }
}

/// Hotel embedded in a booking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotelSummary {
    pub id: String,
    pub name: String,
    pub location: String,
    pub city: String,
    pub country: String,
    pub price: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotelBooking {
    pub id: String,
    #[serde(alias = "customerName")]
    pub customer_name: String,
    #[serde(alias = "customerEmail")]
    pub customer_email: String,
    #[serde(alias = "checkInDate")]
    pub check_in_date: String,
    #[serde(alias = "checkOutDate")]
    pub check_out_date: String,
    pub guests: u32,
    pub rooms: u32,
    #[serde(alias = "specialRequests")]
    pub special_requests: Option<String>,
    #[serde(alias = "totalPrice")]
    pub total_price: f64,
    pub status: String,
    #[serde(alias = "hotelId")]
    pub hotel_id: String,
    pub hotel: Option<HotelSummary>,
    pub created_at: Option<String>,
}

/// Hotel endpoints, with cached reads.
#[derive(Debug, Clone, Copy)]
pub struct HotelsApi<'a> {
    client: &'a ApiClient,
    cache: &'a QueryCache,
}

impl<'a> HotelsApi<'a> {
    pub fn new(client: &'a ApiClient, cache: &'a QueryCache) -> Self {
        Self { client, cache }
    }

    /// One page of hotels matching `filter`.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn search(&self, filter: &HotelFilter, page: u32, page_size: u32) -> ApiResult<Page<Hotel>> {
        let key = QueryKey::hotel_list(&filter.filter_key(), page.max(1), filter.page_limit(page_size));
        let request = ApiRequest::get("/hotels").with_query(filter.query(page, page_size));
        self.cache
            .get_or_fetch(key, DATA_STALE_TIME, || self.client.data(request))
            .await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn get(&self, id: &str) -> ApiResult<Hotel> {
        let path = format!("/hotels/{id}");
        self.cache
            .get_or_fetch(QueryKey::hotel_detail(id), DATA_STALE_TIME, || {
                self.client.data(ApiRequest::get(path))
            })
            .await
    }

    /// Featured hotels.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn popular(&self, limit: u32) -> ApiResult<Page<Hotel>> {
        let request = ApiRequest::get("/hotels/popular")
            .with_query(vec![("limit".to_string(), limit.to_string())]);
        self.cache
            .get_or_fetch(QueryKey::hotel_popular(limit), DATA_STALE_TIME, || {
                self.client.data(request)
            })
            .await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn book(&self, form: &HotelBookingForm) -> ApiResult<HotelBooking> {
        let request = ApiRequest::post("/hotel-bookings/").with_json(form)?;
        let booking = self.client.data(request).await?;
        self.cache.invalidate(&QueryKey::hotel_bookings());
        Ok(booking)
    }

    /// Bookings of the signed-in user.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn my_bookings(&self) -> ApiResult<Page<HotelBooking>> {
        self.cache
            .get_or_fetch(QueryKey::hotel_bookings(), DATA_STALE_TIME, || {
                self.client.data(ApiRequest::get("/hotel-bookings/my-bookings"))
            })
            .await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn modify(&self, booking_id: &str, patch: &HotelBookingPatch) -> ApiResult<HotelBooking> {
        let request = ApiRequest::patch(format!("/hotel-bookings/{booking_id}")).with_json(patch)?;
        let booking = self.client.data(request).await?;
        self.cache.invalidate(&QueryKey::hotel_bookings());
        Ok(booking)
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn cancel(&self, booking_id: &str) -> ApiResult<MessageBody> {
        let request = ApiRequest::delete(format!("/hotel-bookings/{booking_id}"));
        let body = self.client.data(request).await?;
        self.cache.invalidate(&QueryKey::hotel_bookings());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hotel_decodes_sparse_payload() {
        let hotel: Hotel = serde_json::from_value(serde_json::json!({
            "id": "h-1",
            "name": "Casa Azul",
            "price": 120,
            "has_wifi": true,
            "has_spa": true,
            "created_by": {"id": "u-1", "email": "ops@example.com", "full_name": "Ops"}
        }))
        .unwrap();
        assert_eq!(hotel.name, "Casa Azul");
        assert!((hotel.price - 120.0).abs() < f64::EPSILON);
        assert_eq!(hotel.amenity_flags(), vec!["wifi", "spa"]);
        assert!(hotel.images.is_empty());
        assert_eq!(hotel.created_by.unwrap().full_name, "Ops");
    }

    #[test]
    fn test_booking_accepts_camel_case() {
        let booking: HotelBooking = serde_json::from_value(serde_json::json!({
            "id": "b-1",
            "customerName": "Ana",
            "checkInDate": "2025-06-01",
            "hotelId": "h-1",
            "hotel": {"id": "h-1", "name": "Casa Azul"}
        }))
        .unwrap();
        assert_eq!(booking.customer_name, "Ana");
        assert_eq!(booking.hotel_id, "h-1");
        assert_eq!(booking.hotel.unwrap().name, "Casa Azul");
    }
}
