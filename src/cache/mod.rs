//! In-memory response cache.
//!
//! Maps a [`CacheKey`] derived from the route and its canonical parameters to the last
//! successful upstream body. Entries expire after a per-route TTL and the store is bounded
//! by `cache.max_entries` with least-recently-used eviction:
//!
//! ```toml
//! [cache]
//! enabled = true
//! default_ttl_seconds = 3600
//! max_entries = 1024
//! ```

mod config;
mod keys;
mod lock;
mod store;

pub use config::CacheConfig;
pub use keys::CacheKey;
pub use store::ResponseStore;
