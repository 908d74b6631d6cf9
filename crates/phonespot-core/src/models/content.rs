use serde::{Deserialize, Deserializer, Serialize};

use super::{Category, CategoryRoute, RawCategory, RawSlide, Slide};

/// Top-level document served by `GET /api`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentDocument {
    #[serde(default)]
    pub categories: Vec<RawCategory>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub slider: Vec<RawSlide>,
}

// The endpoint has served `slider` both as a single object and as a list.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<RawSlide>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<RawSlide>),
        One(RawSlide),
        Null(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(slides) => slides,
        OneOrMany::One(slide) => vec![slide],
        OneOrMany::Null(()) => Vec::new(),
    })
}

impl ContentDocument {
    pub fn categories(&self, base_url: &str, route: CategoryRoute) -> Vec<Category> {
        Category::map_all(&self.categories, base_url, route)
    }

    /// The hero banner shows only the first slide.
    pub fn hero_slide(&self, base_url: &str) -> Option<Slide> {
        self.slider.first().map(|raw| Slide::from_raw(raw, base_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document_with_slider_object() {
        let json = r#"{
            "categories": [
                {"name": "Screen Repair", "slug": "screen-repair", "image": "img/s.png", "short_description": "Fix cracked screens", "id": 4}
            ],
            "slider": {"title_one": "Broken phone?", "title_two": "We fix it", "image": "img/hero.png"},
            "testimonials": []
        }"#;
        let doc: ContentDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.categories.len(), 1);
        assert_eq!(doc.slider.len(), 1);

        let slide = doc.hero_slide("https://base.test").unwrap();
        assert_eq!(slide.title_one, "Broken phone?");
        assert_eq!(slide.image_url, "https://base.test/img/hero.png");
    }

    #[test]
    fn test_parse_document_with_slider_array() {
        let json = r#"{"slider": [{"title_one": "First"}, {"title_one": "Second"}]}"#;
        let doc: ContentDocument = serde_json::from_str(json).unwrap();
        assert!(doc.categories.is_empty());
        assert_eq!(doc.hero_slide("https://base.test").unwrap().title_one, "First");
    }

    #[test]
    fn test_parse_document_with_empty_slider() {
        let doc: ContentDocument = serde_json::from_str(r#"{"slider": []}"#).unwrap();
        assert!(doc.slider.is_empty());
    }

    #[test]
    fn test_parse_document_with_null_slider() {
        let doc: ContentDocument = serde_json::from_str(r#"{"slider": null}"#).unwrap();
        assert!(doc.hero_slide("https://base.test").is_none());
    }

    #[test]
    fn test_categories_mapping() {
        let json = r#"{"categories": [{"name": "Screen Repair", "slug": "screen-repair", "image": "img/s.png", "short_description": "Fix cracked screens"}]}"#;
        let doc: ContentDocument = serde_json::from_str(json).unwrap();
        let cats = doc.categories("https://base.test", CategoryRoute::ServicePage);
        assert_eq!(cats[0].slug, "/services/screen-repair");
        assert_eq!(cats[0].image, "https://base.test/img/s.png");
    }

    #[test]
    fn test_categories_wrong_shape_is_error() {
        let result = serde_json::from_str::<ContentDocument>(r#"{"categories": "oops"}"#);
        assert!(result.is_err());
    }
}
