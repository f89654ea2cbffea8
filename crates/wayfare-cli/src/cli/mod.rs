//! CLI entry and dispatch.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use wayfare_core::api::Passenger;
use wayfare_core::booking::{FlightBookingPatch, HotelBookingPatch, PaymentStatus, parse_passenger};
use wayfare_core::config::paths;
use wayfare_core::filters::SortOrder;

mod commands;

/// Environment variable holding the log filter (e.g. `debug`, `wayfare_core=trace`).
const LOG_ENV: &str = "WAYFARE_LOG";

#[derive(Parser)]
#[command(name = "wayfare")]
#[command(version)]
#[command(about = "Search and book hotels and flights from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend base URL (overrides config)
    #[arg(long, global = true, env = "WAYFARE_BASE_URL", value_name = "URL")]
    base_url: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in with Google and store the session tokens
    Login {
        /// Access token copied after signing in
        #[arg(long, value_name = "TOKEN")]
        access_token: Option<String>,
        /// Refresh token copied after signing in
        #[arg(long, value_name = "TOKEN", requires = "access_token")]
        refresh_token: Option<String>,
        /// Print the sign-in URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
    },
    /// Sign out and forget the stored tokens
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Show the menus and actions you are allowed to use
    Permissions,
    /// Search, inspect and book hotels
    Hotels {
        #[command(subcommand)]
        command: HotelCommands,
    },
    /// Search, inspect and book flights
    Flights {
        #[command(subcommand)]
        command: FlightCommands,
    },
    /// Manage your bookings
    Bookings {
        #[command(subcommand)]
        command: BookingCommands,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// How many pages a search loads.
#[derive(clap::Args, Debug, Clone)]
pub struct PagingArgs {
    /// Number of pages to load
    #[arg(long, default_value_t = 1, value_name = "N")]
    pub pages: u32,
    /// Load every page
    #[arg(long, conflicts_with_all = ["pages", "interactive"])]
    pub all: bool,
    /// Ask before loading each further page
    #[arg(long, short = 'i', conflicts_with = "pages")]
    pub interactive: bool,
    /// Results per page (overrides config)
    #[arg(long, value_name = "N")]
    pub limit: Option<u32>,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct HotelSearchArgs {
    /// Free-text search
    #[arg(long, short = 's')]
    pub search: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub min_price: Option<f64>,
    #[arg(long)]
    pub max_price: Option<f64>,
    #[arg(long, value_name = "STARS")]
    pub min_stars: Option<f64>,
    #[arg(long)]
    pub min_rating: Option<f64>,
    #[arg(long)]
    pub wifi: bool,
    #[arg(long)]
    pub pool: bool,
    #[arg(long)]
    pub spa: bool,
    #[arg(long)]
    pub gym: bool,
    #[arg(long)]
    pub restaurant: bool,
    #[arg(long)]
    pub parking: bool,
    #[arg(long)]
    pub pet_friendly: bool,
    /// Field to sort by (e.g. price, rating)
    #[arg(long)]
    pub sort_by: Option<String>,
    /// asc or desc
    #[arg(long)]
    pub sort_order: Option<SortOrder>,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct FlightSearchArgs {
    /// Free-text search
    #[arg(long, short = 's')]
    pub search: Option<String>,
    /// Departure airport code (e.g. LIS)
    #[arg(long, value_name = "CODE")]
    pub from: Option<String>,
    /// Arrival airport code (e.g. JFK)
    #[arg(long, value_name = "CODE")]
    pub to: Option<String>,
    #[arg(long)]
    pub departure_city: Option<String>,
    #[arg(long)]
    pub arrival_city: Option<String>,
    #[arg(long)]
    pub departure_country: Option<String>,
    #[arg(long)]
    pub arrival_country: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub departure_date: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub arrival_date: Option<String>,
    /// Minimum free seats (1-9)
    #[arg(long, value_name = "N")]
    pub seats: Option<u32>,
    #[arg(long)]
    pub min_price: Option<f64>,
    #[arg(long)]
    pub max_price: Option<f64>,
    #[arg(long)]
    pub airline: Option<String>,
    #[arg(long)]
    pub airline_code: Option<String>,
    #[arg(long)]
    pub aircraft: Option<String>,
    /// Cabin class (e.g. economy, business)
    #[arg(long = "class")]
    pub class_type: Option<String>,
    #[arg(long)]
    pub wifi: bool,
    #[arg(long)]
    pub meal: bool,
    #[arg(long)]
    pub entertainment: bool,
    #[arg(long)]
    pub luggage: bool,
    #[arg(long)]
    pub domestic: bool,
    /// Minimum duration in minutes
    #[arg(long, value_name = "MIN")]
    pub min_duration: Option<u32>,
    /// Maximum duration in minutes
    #[arg(long, value_name = "MIN")]
    pub max_duration: Option<u32>,
    #[arg(long)]
    pub sort_by: Option<String>,
    #[arg(long)]
    pub sort_order: Option<SortOrder>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct HotelBookArgs {
    /// Guest name on the booking
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    /// YYYY-MM-DD
    #[arg(long)]
    pub check_in: NaiveDate,
    /// YYYY-MM-DD
    #[arg(long)]
    pub check_out: Option<NaiveDate>,
    #[arg(long, default_value_t = 1)]
    pub guests: u32,
    /// Defaults to one room per two guests
    #[arg(long)]
    pub rooms: Option<u32>,
    #[arg(long)]
    pub requests: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct FlightBookArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub phone: String,
    /// Passenger as name:age[:adult|child|infant] (repeatable)
    #[arg(long = "passenger", value_name = "NAME:AGE[:TYPE]", value_parser = parse_passenger, required = true)]
    pub passengers: Vec<Passenger>,
    /// Defaults to the flight's departure day
    #[arg(long)]
    pub departure_date: Option<NaiveDate>,
    #[arg(long)]
    pub return_date: Option<NaiveDate>,
    #[arg(long, default_value_t = 0.0)]
    pub taxes: f64,
    #[arg(long, default_value_t = 0.0)]
    pub discounts: f64,
    /// Defaults to the flight's currency
    #[arg(long)]
    pub currency: Option<String>,
    /// Seat preference (repeatable)
    #[arg(long = "seat")]
    pub seat_preferences: Vec<String>,
    /// Meal preference (repeatable)
    #[arg(long = "meal")]
    pub meal_preferences: Vec<String>,
    #[arg(long)]
    pub requests: Option<String>,
    #[arg(long, default_value = "PENDING")]
    pub payment_status: PaymentStatus,
}

#[derive(clap::Subcommand)]
enum HotelCommands {
    /// Search hotels
    Search {
        #[command(flatten)]
        filter: HotelSearchArgs,
        #[command(flatten)]
        paging: PagingArgs,
    },
    /// Show one hotel
    Show {
        #[arg(value_name = "HOTEL_ID")]
        id: String,
    },
    /// Featured hotels
    Popular {
        #[arg(long, value_name = "N")]
        limit: Option<u32>,
    },
    /// Book a hotel
    Book {
        #[arg(value_name = "HOTEL_ID")]
        id: String,
        #[command(flatten)]
        args: HotelBookArgs,
    },
}

#[derive(clap::Subcommand)]
enum FlightCommands {
    /// Search flights
    Search {
        #[command(flatten)]
        filter: FlightSearchArgs,
        #[command(flatten)]
        paging: PagingArgs,
    },
    /// Show one flight
    Show {
        #[arg(value_name = "FLIGHT_ID")]
        id: String,
    },
    /// Featured flights
    Popular {
        #[arg(long, value_name = "N")]
        limit: Option<u32>,
    },
    /// Book a flight
    Book {
        #[arg(value_name = "FLIGHT_ID")]
        id: String,
        #[command(flatten)]
        args: FlightBookArgs,
    },
}

#[derive(clap::Subcommand)]
enum BookingCommands {
    /// List your bookings
    List {
        /// Only hotel bookings
        #[arg(long, conflicts_with = "flights")]
        hotels: bool,
        /// Only flight bookings
        #[arg(long)]
        flights: bool,
    },
    /// Change a hotel booking
    ModifyHotel {
        #[arg(value_name = "BOOKING_ID")]
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        check_in: Option<NaiveDate>,
        #[arg(long)]
        check_out: Option<NaiveDate>,
        #[arg(long)]
        guests: Option<u32>,
        #[arg(long)]
        rooms: Option<u32>,
        #[arg(long)]
        requests: Option<String>,
    },
    /// Change a flight booking
    ModifyFlight {
        #[arg(value_name = "BOOKING_ID")]
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// Replaces all passengers (repeatable)
        #[arg(long = "passenger", value_name = "NAME:AGE[:TYPE]", value_parser = parse_passenger)]
        passengers: Vec<Passenger>,
        #[arg(long)]
        departure_date: Option<NaiveDate>,
        #[arg(long)]
        return_date: Option<NaiveDate>,
        #[arg(long)]
        requests: Option<String>,
        #[arg(long)]
        payment_status: Option<PaymentStatus>,
    },
    /// Cancel a hotel booking
    CancelHotel {
        #[arg(value_name = "BOOKING_ID")]
        id: String,
    },
    /// Cancel a flight booking
    CancelFlight {
        #[arg(value_name = "BOOKING_ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Show the settings in effect
    Show,
    /// Save the backend base URL
    SetUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logging();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

/// Logs go to `<home>/logs/wayfare.log`; stdout stays clean for output.
fn init_logging() -> Option<WorkerGuard> {
    let dir = paths::logs_dir();
    std::fs::create_dir_all(&dir).ok()?;

    let appender = tracing_appender::rolling::never(&dir, "wayfare.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .ok()?;
    Some(guard)
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli { command, base_url } = cli;
    let open = || commands::open_app(base_url.as_deref());

    match command {
        Commands::Login {
            access_token,
            refresh_token,
            no_browser,
        } => {
            commands::auth::login(
                &open()?,
                access_token.as_deref(),
                refresh_token.as_deref(),
                no_browser,
            )
            .await
        }
        Commands::Logout => commands::auth::logout(&open()?).await,
        Commands::Whoami => {
            commands::auth::whoami(&open()?);
            Ok(())
        }
        Commands::Permissions => commands::auth::permissions(&open()?).await,

        Commands::Hotels { command } => {
            let app = open()?;
            match command {
                HotelCommands::Search { filter, paging } => {
                    commands::hotels::search(&app, &filter, &paging).await
                }
                HotelCommands::Show { id } => commands::hotels::show(&app, &id).await,
                HotelCommands::Popular { limit } => commands::hotels::popular(&app, limit).await,
                HotelCommands::Book { id, args } => commands::hotels::book(&app, &id, args).await,
            }
        }

        Commands::Flights { command } => {
            let app = open()?;
            match command {
                FlightCommands::Search { filter, paging } => {
                    commands::flights::search(&app, &filter, &paging).await
                }
                FlightCommands::Show { id } => commands::flights::show(&app, &id).await,
                FlightCommands::Popular { limit } => commands::flights::popular(&app, limit).await,
                FlightCommands::Book { id, args } => commands::flights::book(&app, &id, args).await,
            }
        }

        Commands::Bookings { command } => {
            let app = open()?;
            match command {
                BookingCommands::List { hotels, flights } => {
                    commands::bookings::list(&app, !flights, !hotels).await
                }
                BookingCommands::ModifyHotel {
                    id,
                    name,
                    email,
                    check_in,
                    check_out,
                    guests,
                    rooms,
                    requests,
                } => {
                    let patch = HotelBookingPatch {
                        customer_name: name,
                        customer_email: email,
                        check_in_date: check_in,
                        check_out_date: check_out,
                        guests,
                        rooms,
                        special_requests: requests,
                    };
                    commands::bookings::modify_hotel(&app, &id, &patch).await
                }
                BookingCommands::ModifyFlight {
                    id,
                    name,
                    email,
                    phone,
                    passengers,
                    departure_date,
                    return_date,
                    requests,
                    payment_status,
                } => {
                    let patch = FlightBookingPatch {
                        customer_name: name,
                        customer_email: email,
                        customer_phone: phone,
                        passengers: (!passengers.is_empty()).then_some(passengers),
                        departure_date,
                        return_date,
                        special_requests: requests,
                        payment_status,
                    };
                    commands::bookings::modify_flight(&app, &id, &patch).await
                }
                BookingCommands::CancelHotel { id } => {
                    commands::bookings::cancel_hotel(&app, &id).await
                }
                BookingCommands::CancelFlight { id } => {
                    commands::bookings::cancel_flight(&app, &id).await
                }
            }
        }

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Show => commands::config::show(),
            ConfigCommands::SetUrl { url } => commands::config::set_url(&url),
        },
    }
}
