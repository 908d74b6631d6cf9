//! phonespot - print the Phone Spot site content from the terminal.
//!
//! Every section is loaded through the stale-while-revalidate cache, so the
//! last fetched content is shown immediately and refreshed in the
//! background. Works offline once the cache has been filled.

use std::fmt::Display;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use phonespot_core::cache::{FileStorage, MemoryStorage, Storage};
use phonespot_core::models::{Category, Slide};
use phonespot_core::resources::SiteResources;
use phonespot_core::{Binding, CacheStore, Config, ContentClient, FetchState};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "Usage: phonespot [--categories | --nav | --slider | --all] [--clear-cache] [--json]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Section {
    Categories,
    Nav,
    Slider,
}

#[derive(Debug, Default)]
struct Options {
    sections: Vec<Section>,
    clear_cache: bool,
    json: bool,
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut options = Options::default();
    for arg in args {
        match arg.as_str() {
            "--categories" => options.sections.push(Section::Categories),
            "--nav" => options.sections.push(Section::Nav),
            "--slider" => options.sections.push(Section::Slider),
            "--all" => options
                .sections
                .extend([Section::Categories, Section::Nav, Section::Slider]),
            "--clear-cache" => options.clear_cache = true,
            "--json" => options.json = true,
            "-h" | "--help" => anyhow::bail!("{}", USAGE),
            other => anyhow::bail!("Unknown argument: {}\n{}", other, USAGE),
        }
    }
    if options.sections.is_empty() {
        options
            .sections
            .extend([Section::Categories, Section::Nav, Section::Slider]);
    }
    options.sections.sort_unstable();
    options.sections.dedup();
    Ok(options)
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn open_storage(config: &Config) -> Arc<dyn Storage> {
    let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
    match FileStorage::new(cache_dir.clone()) {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            warn!(?cache_dir, error = %e, "Cache directory unavailable, using memory cache");
            Arc::new(MemoryStorage::new())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_args(&args)?;

    init_tracing();
    info!("phonespot starting");

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    }
    .with_env_overrides();

    let store = CacheStore::new(open_storage(&config));
    if options.clear_cache {
        store.clear()?;
        eprintln!("Cache cleared");
    }

    let client = ContentClient::with_base_url(config.api_base_url(), config.request_timeout())?;
    let resources = SiteResources::new(client, store, config.loader_config());

    // Bind everything first so all fetches run concurrently
    let mut categories = options
        .sections
        .contains(&Section::Categories)
        .then(|| resources.service_categories());
    let mut nav = options
        .sections
        .contains(&Section::Nav)
        .then(|| resources.nav_categories());
    let mut slider = options
        .sections
        .contains(&Section::Slider)
        .then(|| resources.hero_slide());

    if let Some(binding) = categories.as_mut() {
        show("Services", binding, &options, print_categories).await;
    }
    if let Some(binding) = nav.as_mut() {
        show("Navbar", binding, &options, print_categories).await;
    }
    if let Some(binding) = slider.as_mut() {
        show("Hero", binding, &options, print_slide).await;
    }

    info!("phonespot shutting down");
    Ok(())
}

/// Print the state a section opens with, then the state it settles on if
/// that differs.
async fn show<T, F>(title: &str, binding: &mut Binding<T>, options: &Options, print: F)
where
    T: serde::Serialize + serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
    F: Fn(&T),
{
    let initial = binding.state();
    let was_loading = initial.is_loading();
    let cached_age = if was_loading { None } else { binding.cache_age() };
    if !options.json {
        println!("== {} ==", title);
        print_state(&initial, &print);
        if let Some(age) = &cached_age {
            println!("(cached {})", age);
        }
    }

    let settled = binding.settled().await;
    let stale = binding.is_stale();
    if options.json {
        let age = if stale { cached_age } else { binding.cache_age() };
        println!("{}", state_json(title, &settled, age.as_deref(), stale));
    } else {
        match settle_note(was_loading, stale) {
            Settled::Stale => println!("(refresh failed, showing cached copy)"),
            Settled::Refreshed => {
                println!("(refreshed)");
                print_state(&settled, &print);
            }
            Settled::Loaded => print_state(&settled, &print),
        }
    }
    println!();
}

#[derive(Debug, PartialEq, Eq)]
enum Settled {
    /// First load finished, successfully or not
    Loaded,
    /// Cached copy replaced by a fresh one
    Refreshed,
    /// Refresh failed, cached copy kept
    Stale,
}

fn settle_note(was_loading: bool, stale: bool) -> Settled {
    if stale {
        Settled::Stale
    } else if was_loading {
        Settled::Loaded
    } else {
        Settled::Refreshed
    }
}

fn print_state<T>(state: &FetchState<T>, print: &impl Fn(&T)) {
    match state {
        FetchState::Idle => println!("(idle)"),
        FetchState::Loading => println!("loading..."),
        FetchState::Ready(value) => print(value),
        FetchState::Error(e) => println!("error: {}", e),
    }
}

fn state_json<T: serde::Serialize>(
    title: &str,
    state: &FetchState<T>,
    cache_age: Option<&str>,
    stale: bool,
) -> serde_json::Value {
    match state {
        FetchState::Ready(value) => json!({
            "section": title,
            "state": "ready",
            "value": value,
            "cache_age": cache_age,
            "stale": stale,
        }),
        FetchState::Error(e) => json!({ "section": title, "state": "error", "error": e.to_string() }),
        FetchState::Loading => json!({ "section": title, "state": "loading" }),
        FetchState::Idle => json!({ "section": title, "state": "idle" }),
    }
}

fn print_categories(categories: &Vec<Category>) {
    if categories.is_empty() {
        println!("(no categories)");
    }
    for category in categories {
        println!("- {} ({})", category.name, category.slug);
        print_field("  ", &category.short_description);
        print_field("  image: ", &category.image);
    }
}

fn print_slide(slide: &Option<Slide>) {
    match slide {
        Some(slide) => {
            println!("{}", slide.title_one);
            print_field("", &slide.title_two);
            print_field("image: ", &slide.image_url);
        }
        None => println!("(no slide)"),
    }
}

fn print_field(prefix: &str, value: impl Display) {
    let value = value.to_string();
    if !value.is_empty() {
        println!("{}{}", prefix, value);
    }
}
