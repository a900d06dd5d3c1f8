//! Result cache for rendered islands.
//!
//! Rendered HTML is memoized under a key built from the component name and
//! the canonical JSON of its props (see [`cache_key`]), so deep-equal props
//! always hit the same slot whatever their key order. The cache is
//! disabled unless a TTL is configured.
//!
//! Storage is pluggable through [`ResultStore`]; [`InMemoryResultStore`] is
//! the default, and a shared external store can be plugged in for
//! multi-process deployments.
//!
//! ```
//! use reinhardt_islands_cache::ResultCache;
//! use reinhardt_islands_types::{Props, RenderRequest};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache = ResultCache::in_memory(Some(Duration::from_secs(60)));
//! let badge = RenderRequest::new("UserBadge", Props::new());
//! assert_eq!(cache.get(&badge).await, None);
//! cache.put(&badge, "<span>Ada</span>").await;
//! assert_eq!(cache.get(&badge).await.as_deref(), Some("<span>Ada</span>"));
//! # }
//! ```

mod entry;
pub mod error;
pub mod key;
pub mod result_cache;
pub mod statistics;
pub mod store;

pub use error::{CacheError, CacheResult};
pub use key::cache_key;
pub use result_cache::ResultCache;
pub use statistics::CacheStatistics;
pub use store::{InMemoryResultStore, ResultStore};
