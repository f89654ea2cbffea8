//! CLI command handlers.

pub mod auth;
pub mod bookings;
pub mod config;
pub mod flights;
pub mod hotels;

use std::future::Future;
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use chrono::DateTime;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use wayfare_core::api::Page;
use wayfare_core::filters::MAX_LIMIT;
use wayfare_core::pager::Pager;
use wayfare_core::{ApiResult, Config, Wayfare};

use super::PagingArgs;

/// Loads config, applies the `--base-url` override and opens the session.
pub fn open_app(base_url: Option<&str>) -> Result<Wayfare> {
    let mut config = Config::load().context("load config")?;
    if let Some(url) = base_url {
        config.api.base_url = url.to_string();
    }
    Wayfare::open(config)
}

pub fn require_login(app: &Wayfare) -> Result<()> {
    if !app.is_authenticated() {
        anyhow::bail!("Not logged in. Run `wayfare login` first.");
    }
    Ok(())
}

pub fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn money(amount: f64, currency: &str) -> String {
    if currency.is_empty() {
        format!("{amount:.2}")
    } else {
        format!("{amount:.2} {currency}")
    }
}

/// `2025-06-01T09:30:00.000Z` -> `2025-06-01 09:30`; other input is kept.
pub fn short_datetime(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Date part of a backend date or timestamp.
pub fn short_date(raw: &str) -> String {
    raw.get(..10).unwrap_or(raw).to_string()
}

pub fn page_size(app: &Wayfare, paging: &PagingArgs) -> u32 {
    paging
        .limit
        .unwrap_or_else(|| app.config().page_size())
        .clamp(1, MAX_LIMIT)
}

/// Loads pages per `paging`, rendering each page as it arrives.
///
/// Returns the pager so callers can report totals.
pub async fn load_pages<T, F, Fut, R>(
    filter_key: String,
    page_size: u32,
    paging: &PagingArgs,
    mut fetch: F,
    mut render: R,
) -> Result<Pager<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = ApiResult<Page<T>>>,
    R: FnMut(&[T]),
{
    let mut pager = Pager::new(page_size);
    let first = pager.reset(filter_key);
    let page = fetch(first.page).await?;
    pager.apply(first, page);
    render(pager.items());

    let mut loaded = 1;
    while pager.has_more() {
        let wanted = if paging.all {
            true
        } else if paging.interactive {
            ask_for_more(&pager)?
        } else {
            loaded < paging.pages
        };
        if !wanted {
            break;
        }
        let Some(request) = pager.request_more() else {
            break;
        };
        let before = pager.items().len();
        match fetch(request.page).await {
            Ok(page) => {
                pager.apply(request, page);
            }
            Err(err) => {
                pager.fail(request, err.to_string());
                return Err(err).with_context(|| format!("load page {}", request.page));
            }
        }
        render(&pager.items()[before..]);
        loaded += 1;
    }

    Ok(pager)
}

fn ask_for_more<T>(pager: &Pager<T>) -> Result<bool> {
    print!(
        "Showing {} of {}. Load more? [Y/n] ",
        pager.items().len(),
        pager.total()
    );
    io::stdout().flush().context("flush stdout")?;

    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read answer")?;
    if read == 0 {
        return Ok(false);
    }
    let answer = line.trim().to_ascii_lowercase();
    Ok(answer.is_empty() || answer == "y" || answer == "yes")
}

pub fn print_summary<T>(pager: &Pager<T>, noun: &str) {
    let shown = pager.items().len();
    if shown == 0 {
        println!("No {noun} found.");
        return;
    }
    println!("Showing {shown} of {} {noun}.", pager.total());
    if pager.has_more() {
        println!("More results available: use --pages N, --all or --interactive.");
    }
}
