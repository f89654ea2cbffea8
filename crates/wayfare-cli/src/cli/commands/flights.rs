//! Flight command handlers.

use anyhow::{Context, Result};
use chrono::Local;
use wayfare_core::Wayfare;
use wayfare_core::api::Flight;
use wayfare_core::booking::{FlightBookingForm, parse_date};
use wayfare_core::filters::{FlightFilter, ListFilter};

use super::{load_pages, money, new_table, page_size, print_summary, require_login, short_datetime};
use crate::cli::{FlightBookArgs, FlightSearchArgs, PagingArgs};

fn flag(set: bool) -> Option<bool> {
    set.then_some(true)
}

impl From<&FlightSearchArgs> for FlightFilter {
    fn from(args: &FlightSearchArgs) -> Self {
        FlightFilter {
            search: args.search.clone(),
            departure_airport_code: args.from.as_deref().map(str::to_uppercase),
            arrival_airport_code: args.to.as_deref().map(str::to_uppercase),
            departure_city: args.departure_city.clone(),
            arrival_city: args.arrival_city.clone(),
            departure_country: args.departure_country.clone(),
            arrival_country: args.arrival_country.clone(),
            departure_date: args.departure_date.clone(),
            arrival_date: args.arrival_date.clone(),
            min_available_seats: args.seats,
            min_price: args.min_price,
            max_price: args.max_price,
            airline_name: args.airline.clone(),
            airline_code: args.airline_code.clone(),
            aircraft_type: args.aircraft.clone(),
            class_type: args.class_type.clone(),
            has_wifi: flag(args.wifi),
            has_meal: flag(args.meal),
            has_entertainment: flag(args.entertainment),
            has_luggage: flag(args.luggage),
            is_domestic: flag(args.domestic),
            min_duration: args.min_duration,
            max_duration: args.max_duration,
            page: None,
            limit: None,
            sort_by: args.sort_by.clone(),
            sort_order: args.sort_order,
        }
    }
}

fn flight_table(flights: &[Flight]) -> comfy_table::Table {
    let mut table = new_table(vec![
        "ID", "Flight", "Airline", "Route", "Departs", "Duration", "Seats", "Class", "Price",
    ]);
    for flight in flights {
        table.add_row(vec![
            flight.id.clone(),
            flight.flight_number.clone(),
            flight.airline_name.clone(),
            flight.route_label(),
            short_datetime(&flight.departure_time),
            flight.duration_label(),
            format!("{}/{}", flight.available_seats, flight.total_seats),
            flight.class_type.clone(),
            money(flight.base_price, &flight.currency),
        ]);
    }
    table
}

pub async fn search(app: &Wayfare, args: &FlightSearchArgs, paging: &PagingArgs) -> Result<()> {
    let mut filter = FlightFilter::from(args);
    filter.limit = paging.limit;
    filter.validate().context("invalid flight filter")?;

    let size = page_size(app, paging);
    let flights = app.flights();
    let pager = load_pages(
        filter.filter_key(),
        size,
        paging,
        |page| flights.search(&filter, page, size),
        |chunk| {
            if !chunk.is_empty() {
                println!("{}", flight_table(chunk));
            }
        },
    )
    .await?;

    print_summary(&pager, "flights");
    Ok(())
}

pub async fn show(app: &Wayfare, id: &str) -> Result<()> {
    let flight = app
        .flights()
        .get(id)
        .await
        .with_context(|| format!("load flight '{id}'"))?;

    println!(
        "{} {} · {}",
        flight.airline_name,
        flight.flight_number,
        flight.route_label()
    );
    println!(
        "From: {} ({}), {} {}",
        flight.departure_airport_name,
        flight.departure_airport_code,
        flight.departure_city,
        flight.departure_country
    );
    println!(
        "To:   {} ({}), {} {}",
        flight.arrival_airport_name,
        flight.arrival_airport_code,
        flight.arrival_city,
        flight.arrival_country
    );
    println!(
        "Departs {} · arrives {} · {}",
        short_datetime(&flight.departure_time),
        short_datetime(&flight.arrival_time),
        flight.duration_label()
    );
    println!(
        "{} · {} of {} seats free · {}",
        flight.class_type,
        flight.available_seats,
        flight.total_seats,
        money(flight.base_price, &flight.currency)
    );
    if !flight.aircraft_type.is_empty() {
        println!("Aircraft: {}", flight.aircraft_type);
    }

    let extras: Vec<&str> = [
        (flight.has_wifi, "wifi"),
        (flight.has_meal, "meal"),
        (flight.has_entertainment, "entertainment"),
        (flight.has_luggage, "luggage"),
    ]
    .into_iter()
    .filter_map(|(set, name)| set.then_some(name))
    .collect();
    if !extras.is_empty() {
        println!("Included: {}", extras.join(", "));
    }
    if !flight.status.is_empty() {
        println!("Status: {}", flight.status);
    }
    Ok(())
}

pub async fn popular(app: &Wayfare, limit: Option<u32>) -> Result<()> {
    let limit = limit.unwrap_or(app.config().listing.popular_limit).max(1);
    let page = app
        .flights()
        .popular(limit)
        .await
        .context("load popular flights")?;
    if page.items.is_empty() {
        println!("No featured flights right now.");
    } else {
        println!("{}", flight_table(&page.items));
    }
    Ok(())
}

pub async fn book(app: &Wayfare, flight_id: &str, args: FlightBookArgs) -> Result<()> {
    require_login(app)?;
    let flights = app.flights();
    let flight = flights
        .get(flight_id)
        .await
        .with_context(|| format!("load flight '{flight_id}'"))?;

    let departure_date = args
        .departure_date
        .or_else(|| parse_date(&flight.departure_time))
        .context("flight has no departure date; pass --departure-date")?;

    let mut form = FlightBookingForm::new(flight_id.to_string(), departure_date, flight.base_price);
    form.customer_name = args.name;
    form.customer_email = args.email;
    form.customer_phone = args.phone;
    form.passengers = args.passengers;
    form.return_date = args.return_date;
    form.taxes_fees = args.taxes;
    form.discounts = args.discounts;
    if let Some(currency) = args.currency {
        form.currency = currency.to_uppercase();
    } else if !flight.currency.is_empty() {
        form.currency = flight.currency.clone();
    }
    form.seat_preferences = args.seat_preferences;
    form.meal_preferences = args.meal_preferences;
    form.special_requests = args.requests.filter(|r| !r.trim().is_empty());
    form.payment_status = args.payment_status;

    form.validate(Local::now().date_naive())
        .context("invalid booking")?;

    println!(
        "{} {} · {} passenger(s) · estimated {}",
        flight.flight_number,
        flight.route_label(),
        form.passengers.len(),
        money(form.total_price(), &form.currency)
    );

    let booking = flights.book(&form).await.context("book flight")?;
    println!("Booked flight {} (booking {}).", flight.flight_number, booking.id);
    if !booking.status.is_empty() {
        println!("Status: {}", booking.status);
    }
    Ok(())
}
