//! Hotel command handlers.

use anyhow::{Context, Result};
use chrono::Local;
use wayfare_core::Wayfare;
use wayfare_core::api::Hotel;
use wayfare_core::booking::{HotelBookingForm, suggested_rooms};
use wayfare_core::filters::{HotelFilter, ListFilter};

use super::{load_pages, money, new_table, page_size, print_summary, require_login};
use crate::cli::{HotelBookArgs, HotelSearchArgs, PagingArgs};

fn flag(set: bool) -> Option<bool> {
    set.then_some(true)
}

impl From<&HotelSearchArgs> for HotelFilter {
    fn from(args: &HotelSearchArgs) -> Self {
        HotelFilter {
            search: args.search.clone(),
            city: args.city.clone(),
            country: args.country.clone(),
            min_price: args.min_price,
            max_price: args.max_price,
            min_star_rating: args.min_stars,
            min_rating: args.min_rating,
            has_wifi: flag(args.wifi),
            has_pool: flag(args.pool),
            has_spa: flag(args.spa),
            has_gym: flag(args.gym),
            has_restaurant: flag(args.restaurant),
            has_parking: flag(args.parking),
            has_pet_friendly: flag(args.pet_friendly),
            page: None,
            limit: None,
            sort_by: args.sort_by.clone(),
            sort_order: args.sort_order,
        }
    }
}

fn hotel_table(hotels: &[Hotel]) -> comfy_table::Table {
    let mut table = new_table(vec![
        "ID", "Name", "City", "Country", "Stars", "Rating", "Price/night", "Amenities",
    ]);
    for hotel in hotels {
        table.add_row(vec![
            hotel.id.clone(),
            hotel.name.clone(),
            hotel.city.clone(),
            hotel.country.clone(),
            format!("{:.0}", hotel.star_rating),
            format!("{:.1}", hotel.rating),
            money(hotel.price, &hotel.currency),
            hotel.amenity_flags().join(", "),
        ]);
    }
    table
}

pub async fn search(app: &Wayfare, args: &HotelSearchArgs, paging: &PagingArgs) -> Result<()> {
    let mut filter = HotelFilter::from(args);
    filter.limit = paging.limit;
    filter.validate().context("invalid hotel filter")?;

    let size = page_size(app, paging);
    let hotels = app.hotels();
    let pager = load_pages(
        filter.filter_key(),
        size,
        paging,
        |page| hotels.search(&filter, page, size),
        |chunk| {
            if !chunk.is_empty() {
                println!("{}", hotel_table(chunk));
            }
        },
    )
    .await?;

    print_summary(&pager, "hotels");
    Ok(())
}

pub async fn show(app: &Wayfare, id: &str) -> Result<()> {
    let hotel = app
        .hotels()
        .get(id)
        .await
        .with_context(|| format!("load hotel '{id}'"))?;

    println!("{}", hotel.name);
    let place = [hotel.address.as_deref(), Some(hotel.city.as_str()), Some(hotel.country.as_str())]
        .into_iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if !place.is_empty() {
        println!("{place}");
    }
    println!(
        "{:.0} stars · rated {:.1} · {} per night",
        hotel.star_rating,
        hotel.rating,
        money(hotel.price, &hotel.currency)
    );
    if !hotel.description.is_empty() {
        println!();
        println!("{}", hotel.description);
    }

    let mut amenities: Vec<String> = hotel.amenity_flags().iter().map(ToString::to_string).collect();
    amenities.extend(hotel.amenities.iter().cloned());
    amenities.dedup();
    if !amenities.is_empty() {
        println!();
        println!("Amenities: {}", amenities.join(", "));
    }

    for (label, value) in [
        ("Phone", &hotel.phone),
        ("Email", &hotel.email),
        ("Website", &hotel.website),
    ] {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            println!("{label}: {value}");
        }
    }
    if !hotel.images.is_empty() {
        println!("Images: {}", hotel.images.len());
    }
    Ok(())
}

pub async fn popular(app: &Wayfare, limit: Option<u32>) -> Result<()> {
    let limit = limit.unwrap_or(app.config().listing.popular_limit).max(1);
    let page = app
        .hotels()
        .popular(limit)
        .await
        .context("load popular hotels")?;
    if page.items.is_empty() {
        println!("No featured hotels right now.");
    } else {
        println!("{}", hotel_table(&page.items));
    }
    Ok(())
}

pub async fn book(app: &Wayfare, hotel_id: &str, args: HotelBookArgs) -> Result<()> {
    require_login(app)?;
    let hotels = app.hotels();
    let hotel = hotels
        .get(hotel_id)
        .await
        .with_context(|| format!("load hotel '{hotel_id}'"))?;

    let form = HotelBookingForm {
        customer_name: args.name,
        customer_email: args.email,
        check_in_date: args.check_in,
        check_out_date: args.check_out,
        guests: args.guests,
        rooms: args.rooms.unwrap_or_else(|| suggested_rooms(args.guests)),
        special_requests: args.requests.filter(|r| !r.trim().is_empty()),
        hotel_id: hotel_id.to_string(),
    };
    form.validate(Local::now().date_naive())
        .context("invalid booking")?;

    if let (Some(nights), Some(total)) = (form.nights(), form.total_price(hotel.price)) {
        println!(
            "{} · {} night(s) · {} room(s) · estimated {}",
            hotel.name,
            nights,
            form.rooms,
            money(total, &hotel.currency)
        );
    }

    let booking = hotels.book(&form).await.context("book hotel")?;
    println!("Booked {} (booking {}).", hotel.name, booking.id);
    if !booking.status.is_empty() {
        println!("Status: {}", booking.status);
    }
    Ok(())
}
