//! phonespot-core - shared library for the Phone Spot site content.
//!
//! - `api`: HTTP client for the content endpoint and its error taxonomy
//! - `models`: raw API records and the shapes the rendering layer consumes
//! - `cache`: stale-while-revalidate loader over a pluggable key/value store
//! - `config`: application configuration
//! - `resources`: the site's cached resources wired onto the loader

pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod resources;

pub use api::{ApiError, ContentClient};
pub use cache::{Binding, CacheStore, FetchState, LoaderConfig, ResourceLoader};
pub use config::Config;
