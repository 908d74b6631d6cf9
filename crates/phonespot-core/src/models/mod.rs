//! Data models for the Phone Spot content API.
//!
//! Each record comes in two shapes:
//!
//! - Raw API records (`RawCategory`, `RawSlide`) exactly as the endpoint
//!   returns them, inside a `ContentDocument`
//! - Consumer records (`Category`, `Slide`) that the rendering layer reads
//!   and the cache stores
//!
//! The mapping between the two is pure and lives next to each model.

pub mod category;
pub mod content;
pub mod slide;

pub use category::{Category, CategoryRoute, RawCategory};
pub use content::ContentDocument;
pub use slide::{RawSlide, Slide};

/// Join the API base URL and a relative asset path with exactly one slash.
pub fn asset_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}
