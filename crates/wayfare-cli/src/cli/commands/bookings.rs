//! Booking command handlers.

use anyhow::{Context, Result};
use chrono::Local;
use wayfare_core::Wayfare;
use wayfare_core::api::{FlightBooking, HotelBooking};
use wayfare_core::booking::{FlightBookingPatch, HotelBookingPatch};

use super::{money, new_table, require_login, short_date};

pub async fn list(app: &Wayfare, hotels: bool, flights: bool) -> Result<()> {
    require_login(app)?;

    if hotels {
        let page = app
            .hotels()
            .my_bookings()
            .await
            .context("load hotel bookings")?;
        println!("Hotel bookings ({})", page.total.max(page.items.len() as u64));
        if page.items.is_empty() {
            println!("  none");
        } else {
            println!("{}", hotel_bookings_table(&page.items));
        }
    }

    if flights {
        if hotels {
            println!();
        }
        let page = app
            .flights()
            .my_bookings()
            .await
            .context("load flight bookings")?;
        println!("Flight bookings ({})", page.total.max(page.items.len() as u64));
        if page.items.is_empty() {
            println!("  none");
        } else {
            println!("{}", flight_bookings_table(&page.items));
        }
    }
    Ok(())
}

fn hotel_bookings_table(bookings: &[HotelBooking]) -> comfy_table::Table {
    let mut table = new_table(vec![
        "ID", "Hotel", "Check-in", "Check-out", "Guests", "Rooms", "Total", "Status",
    ]);
    for booking in bookings {
        let (hotel, currency) = booking
            .hotel
            .as_ref()
            .map_or((booking.hotel_id.as_str(), ""), |h| (h.name.as_str(), h.currency.as_str()));
        table.add_row(vec![
            booking.id.clone(),
            hotel.to_string(),
            short_date(&booking.check_in_date),
            short_date(&booking.check_out_date),
            booking.guests.to_string(),
            booking.rooms.to_string(),
            money(booking.total_price, currency),
            booking.status.clone(),
        ]);
    }
    table
}

fn flight_bookings_table(bookings: &[FlightBooking]) -> comfy_table::Table {
    let mut table = new_table(vec![
        "ID", "Flight", "Route", "Departure", "Return", "Passengers", "Total", "Status",
    ]);
    for booking in bookings {
        let (number, route) = booking.flight.as_ref().map_or_else(
            || (booking.flight_id.clone(), String::new()),
            |f| {
                let route = f.route.clone().filter(|r| !r.is_empty()).unwrap_or_else(|| {
                    format!("{} → {}", f.departure_airport_code, f.arrival_airport_code)
                });
                (f.flight_number.clone(), route)
            },
        );
        table.add_row(vec![
            booking.id.clone(),
            number,
            route,
            short_date(&booking.departure_date),
            booking
                .return_date
                .as_deref()
                .map_or_else(|| "-".to_string(), short_date),
            booking.passengers.len().to_string(),
            money(booking.total_price, &booking.currency),
            booking.status.clone(),
        ]);
    }
    table
}

pub async fn modify_hotel(app: &Wayfare, id: &str, patch: &HotelBookingPatch) -> Result<()> {
    require_login(app)?;
    if patch.is_empty() {
        anyhow::bail!("Nothing to change; pass at least one field to update");
    }

    let hotels = app.hotels();
    let bookings = hotels.my_bookings().await.context("load hotel bookings")?;
    let current = bookings
        .items
        .iter()
        .find(|b| b.id == id)
        .with_context(|| format!("Hotel booking '{id}' not found"))?;
    patch
        .validate_against(current, Local::now().date_naive())
        .context("invalid change")?;

    let updated = hotels
        .modify(id, patch)
        .await
        .with_context(|| format!("update hotel booking '{id}'"))?;
    println!(
        "Updated booking {}: {} to {}, {} guest(s), {} room(s).",
        updated.id,
        short_date(&updated.check_in_date),
        short_date(&updated.check_out_date),
        updated.guests,
        updated.rooms
    );
    Ok(())
}

pub async fn modify_flight(app: &Wayfare, id: &str, patch: &FlightBookingPatch) -> Result<()> {
    require_login(app)?;
    if patch.is_empty() {
        anyhow::bail!("Nothing to change; pass at least one field to update");
    }

    let flights = app.flights();
    let bookings = flights.my_bookings().await.context("load flight bookings")?;
    let current = bookings
        .items
        .iter()
        .find(|b| b.id == id)
        .with_context(|| format!("Flight booking '{id}' not found"))?;
    patch
        .validate_against(current, Local::now().date_naive())
        .context("invalid change")?;

    let updated = flights
        .modify(id, patch)
        .await
        .with_context(|| format!("update flight booking '{id}'"))?;
    println!(
        "Updated booking {}: departs {}, {} passenger(s).",
        updated.id,
        short_date(&updated.departure_date),
        updated.passengers.len()
    );
    Ok(())
}

pub async fn cancel_hotel(app: &Wayfare, id: &str) -> Result<()> {
    require_login(app)?;
    let body = app
        .hotels()
        .cancel(id)
        .await
        .with_context(|| format!("cancel hotel booking '{id}'"))?;
    print_cancelled(id, &body.message);
    Ok(())
}

pub async fn cancel_flight(app: &Wayfare, id: &str) -> Result<()> {
    require_login(app)?;
    let body = app
        .flights()
        .cancel(id)
        .await
        .with_context(|| format!("cancel flight booking '{id}'"))?;
    print_cancelled(id, &body.message);
    Ok(())
}

fn print_cancelled(id: &str, message: &str) {
    if message.is_empty() {
        println!("Cancelled booking {id}.");
    } else {
        println!("Cancelled booking {id}: {message}");
    }
}
