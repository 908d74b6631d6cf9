use serde::{Deserialize, Serialize};

use super::asset_url;

/// Hero slider record as returned by the content API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSlide {
    #[serde(default)]
    pub title_one: String,
    #[serde(default)]
    pub title_two: String,
    #[serde(default)]
    pub image: String,
}

/// Hero banner content with the image resolved against the API host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Slide {
    pub title_one: String,
    pub title_two: String,
    pub image_url: String,
}

impl Slide {
    pub fn from_raw(raw: &RawSlide, base_url: &str) -> Self {
        Self {
            title_one: raw.title_one.clone(),
            title_two: raw.title_two.clone(),
            image_url: asset_url(base_url, &raw.image),
        }
    }

    /// Alt text for the banner image falls back to the headline.
    pub fn alt_text(&self) -> &str {
        &self.title_one
    }
}
