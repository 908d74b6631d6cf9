//! REST client module for the Phone Spot content API.
//!
//! This module provides the `ContentClient` for fetching the site document
//! (service categories, navbar entries, hero slider) and the `ApiError`
//! taxonomy every fetch failure is reported with.

pub mod client;
pub mod error;

pub use client::{ContentClient, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use error::ApiError;
