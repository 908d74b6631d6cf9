//! The site's cached resources.
//!
//! Each page section reads one resource through its own cache key, all
//! cut from the same content document:
//!
//! - `cachedCategories`: service cards, linking to `/services/<slug>`
//! - `navCategories`: navbar dropdown, bare slugs
//! - `sliderData`: hero banner

use crate::api::ContentClient;
use crate::cache::{Binding, CacheStore, LoaderConfig, ResourceLoader};
use crate::models::{Category, Slide};

pub const SERVICE_CATEGORIES_KEY: &str = "cachedCategories";
pub const NAV_CATEGORIES_KEY: &str = "navCategories";
pub const HERO_SLIDE_KEY: &str = "sliderData";

/// Loaders for every site resource, sharing one client and one store.
#[derive(Clone)]
pub struct SiteResources {
    client: ContentClient,
    categories: ResourceLoader<Vec<Category>>,
    slides: ResourceLoader<Option<Slide>>,
}

impl SiteResources {
    pub fn new(client: ContentClient, store: CacheStore, config: LoaderConfig) -> Self {
        Self {
            categories: ResourceLoader::new(store.clone(), config.clone()),
            slides: ResourceLoader::new(store, config),
            client,
        }
    }

    pub fn client(&self) -> &ContentClient {
        &self.client
    }

    pub fn store(&self) -> &CacheStore {
        self.categories.store()
    }

    pub fn service_categories(&self) -> Binding<Vec<Category>> {
        let client = self.client.clone();
        Binding::bind(self.categories.clone(), SERVICE_CATEGORIES_KEY, move || {
            let client = client.clone();
            async move { client.fetch_service_categories().await }
        })
    }

    pub fn nav_categories(&self) -> Binding<Vec<Category>> {
        let client = self.client.clone();
        Binding::bind(self.categories.clone(), NAV_CATEGORIES_KEY, move || {
            let client = client.clone();
            async move { client.fetch_nav_categories().await }
        })
    }

    pub fn hero_slide(&self) -> Binding<Option<Slide>> {
        let client = self.client.clone();
        Binding::bind(self.slides.clone(), HERO_SLIDE_KEY, move || {
            let client = client.clone();
            async move { client.fetch_hero_slide().await }
        })
    }
}
