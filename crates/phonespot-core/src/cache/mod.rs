//! Stale-while-revalidate caching for remote resources.
//!
//! Layers, bottom up:
//! - `Storage`: string key/value backends (`MemoryStorage`, `FileStorage`)
//! - `CacheStore`: typed JSON entries on top of a backend, with
//!   malformed/empty entries read back as absent
//! - `ResourceLoader`: serves cached values immediately, refreshes them in
//!   the background and coalesces concurrent fetches per key
//! - `Binding`: the latest `FetchState` for one key, for a rendering layer
//!
//! Entries never expire unless `LoaderConfig::max_age` is set.

pub mod binding;
pub mod entry;
pub mod error;
pub mod loader;
pub mod state;
pub mod storage;
pub mod store;

pub use binding::Binding;
pub use entry::CacheEntry;
pub use error::CacheError;
pub use loader::{LoaderConfig, ResourceLoader, Subscription};
pub use state::FetchState;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::CacheStore;
