use serde::{Deserialize, Serialize};

use super::asset_url;

/// Category record as returned by the content API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCategory {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub short_description: String,
}

/// Where a category link points.
///
/// The service cards route into `/services/<slug>`, while the navbar
/// dropdown keeps the bare slug and lets the router resolve it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryRoute {
    ServicePage,
    Bare,
}

impl CategoryRoute {
    pub fn link(&self, slug: &str) -> String {
        match self {
            CategoryRoute::ServicePage => format!("/services/{}", slug),
            CategoryRoute::Bare => slug.to_string(),
        }
    }
}

/// Category as consumed by the rendering layer and stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Category {
    pub name: String,
    pub slug: String,
    pub image: String,
    #[serde(rename = "shortDescription")]
    pub short_description: String,
}

impl Category {
    pub fn from_raw(raw: &RawCategory, base_url: &str, route: CategoryRoute) -> Self {
        Self {
            name: raw.name.clone(),
            slug: route.link(&raw.slug),
            image: asset_url(base_url, &raw.image),
            short_description: raw.short_description.clone(),
        }
    }

    pub fn map_all(raw: &[RawCategory], base_url: &str, route: CategoryRoute) -> Vec<Self> {
        raw.iter()
            .map(|c| Self::from_raw(c, base_url, route))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen_repair() -> RawCategory {
        RawCategory {
            name: "Screen Repair".to_string(),
            slug: "screen-repair".to_string(),
            image: "img/s.png".to_string(),
            short_description: "Fix cracked screens".to_string(),
        }
    }

    #[test]
    fn test_service_page_mapping() {
        let cat = Category::from_raw(&screen_repair(), "https://base.test", CategoryRoute::ServicePage);
        assert_eq!(cat.name, "Screen Repair");
        assert_eq!(cat.slug, "/services/screen-repair");
        assert_eq!(cat.image, "https://base.test/img/s.png");
        assert_eq!(cat.short_description, "Fix cracked screens");
    }

    #[test]
    fn test_bare_route_keeps_slug() {
        let cat = Category::from_raw(&screen_repair(), "https://base.test", CategoryRoute::Bare);
        assert_eq!(cat.slug, "screen-repair");
    }

    #[test]
    fn test_serializes_camel_case_description() {
        let cat = Category::from_raw(&screen_repair(), "https://base.test", CategoryRoute::ServicePage);
        let json = serde_json::to_value(&cat).unwrap();
        assert_eq!(json["shortDescription"], "Fix cracked screens");
        assert!(json.get("short_description").is_none());
    }

    #[test]
    fn test_raw_category_missing_fields_default() {
        let raw: RawCategory = serde_json::from_str(r#"{"name": "Batteries"}"#).unwrap();
        assert_eq!(raw.name, "Batteries");
        assert!(raw.slug.is_empty());
        assert!(raw.short_description.is_empty());
    }
}
