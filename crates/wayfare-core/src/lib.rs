//! Client library for the Wayfare hotel and flight booking backend.
//!
//! Session tokens live in a cookie jar. Every request is authenticated with
//! the access token and recovers once from an expired session by refreshing
//! it. On top of that sit typed endpoints, search filters, booking forms,
//! an infinite-scroll pager and a small query cache.

pub mod api;
pub mod app;
pub mod auth;
pub mod booking;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod filters;
pub mod pager;
pub mod permissions;
pub mod validation;

pub use app::Wayfare;
pub use client::{ApiClient, ApiRequest};
pub use config::Config;
pub use error::{ApiError, ApiErrorKind, ApiResult};
