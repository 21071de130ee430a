//! Result cache for dashboard queries.
//!
//! [`TtlCache`] is a plain keyed store with lazy expiry; [`CacheKey`]
//! derives keys from a query so that logically equal filter selections
//! hit the same entry.
//!
//! # Example
//!
//! ```ignore
//! let cache = TtlCache::new(CacheConfig::default());
//! let key = CacheKey::for_query(&query);
//! if let Some(series) = cache.get(key.as_str()) {
//!     return Ok(series);
//! }
//! let series = source.fetch_series(&query).await?;
//! cache.set(key, series.clone());
//! ```

pub mod key;
pub mod ttl;

pub use key::CacheKey;
pub use ttl::{CacheConfig, CacheStats, TtlCache};
