//! The result cache.

use crate::key::cache_key;
use crate::statistics::CacheStatistics;
use crate::store::{InMemoryResultStore, ResultStore};
use reinhardt_islands_types::RenderRequest;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Default key namespace.
pub const DEFAULT_NAMESPACE: &str = "reinhardt-islands:";

/// Memoizes rendered island HTML.
///
/// With no TTL the cache is disabled: lookups always miss without touching
/// the store and writes are dropped. Store failures are logged and treated
/// the same way, so the cache can only ever save work, never fail a render.
#[derive(Clone)]
pub struct ResultCache {
	store: Arc<dyn ResultStore>,
	ttl: Option<Duration>,
	namespace: String,
	hits: Arc<AtomicU64>,
	misses: Arc<AtomicU64>,
}

impl fmt::Debug for ResultCache {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResultCache")
			.field("ttl", &self.ttl)
			.field("namespace", &self.namespace)
			.finish_non_exhaustive()
	}
}

impl ResultCache {
	/// Creates a cache over `store`. `ttl: None` disables caching.
	pub fn new(store: Arc<dyn ResultStore>, ttl: Option<Duration>) -> Self {
		Self {
			store,
			ttl,
			namespace: DEFAULT_NAMESPACE.to_string(),
			hits: Arc::new(AtomicU64::new(0)),
			misses: Arc::new(AtomicU64::new(0)),
		}
	}

	/// Creates a cache over a fresh [`InMemoryResultStore`].
	///
	/// With a TTL, expired entries are swept every TTL period when a Tokio
	/// runtime is running.
	pub fn in_memory(ttl: Option<Duration>) -> Self {
		let store = InMemoryResultStore::new();
		if let Some(ttl) = ttl {
			store.start_auto_cleanup(ttl);
		}
		Self::new(Arc::new(store), ttl)
	}

	/// Creates a disabled cache.
	pub fn disabled() -> Self {
		Self::in_memory(None)
	}

	/// Sets the key namespace, so several caches can share one store.
	pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = namespace.into();
		self
	}

	/// Whether lookups can hit.
	pub fn is_enabled(&self) -> bool {
		self.ttl.is_some()
	}

	/// Configured TTL.
	pub fn ttl(&self) -> Option<Duration> {
		self.ttl
	}

	/// Full store key for `request`.
	pub fn key_for(&self, request: &RenderRequest) -> String {
		format!("{}{}", self.namespace, cache_key(request))
	}

	/// Cached HTML for `request`.
	pub async fn get(&self, request: &RenderRequest) -> Option<String> {
		if !self.is_enabled() {
			return None;
		}
		let key = self.key_for(request);
		let found = match self.store.get(&key).await {
			Ok(found) => found,
			Err(error) => {
				tracing::warn!(component = request.name(), %error, "result cache read failed");
				None
			}
		};
		let counter = if found.is_some() { &self.hits } else { &self.misses };
		counter.fetch_add(1, Ordering::Relaxed);
		found
	}

	/// Stores rendered HTML for `request`.
	pub async fn put(&self, request: &RenderRequest, html: &str) {
		let Some(ttl) = self.ttl else {
			return;
		};
		let key = self.key_for(request);
		if let Err(error) = self.store.set(&key, html, Some(ttl)).await {
			tracing::warn!(component = request.name(), %error, "result cache write failed");
		}
	}

	/// Removes every entry in this cache's namespace.
	pub async fn clear(&self) {
		match self.store.clear_prefix(&self.namespace).await {
			Ok(()) => tracing::info!(namespace = %self.namespace, "result cache cleared"),
			Err(error) => tracing::warn!(%error, "result cache clear failed"),
		}
	}

	/// Hit and miss counters.
	pub async fn statistics(&self) -> CacheStatistics {
		let hits = self.hits.load(Ordering::Relaxed);
		let misses = self.misses.load(Ordering::Relaxed);
		CacheStatistics {
			hits,
			misses,
			total_requests: hits + misses,
			entry_count: self.store.entry_count().await,
		}
	}
}
