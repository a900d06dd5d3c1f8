//! Storage backends for rendered HTML.

use crate::entry::CacheEntry;
use crate::error::CacheResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Key/value storage behind [`ResultCache`](crate::ResultCache).
///
/// Implementations must tolerate concurrent reads and writes; last write
/// wins for a key.
#[async_trait]
pub trait ResultStore: Send + Sync {
	/// Returns the stored HTML, or `None` if absent or expired.
	async fn get(&self, key: &str) -> CacheResult<Option<String>>;

	/// Stores HTML under `key`. `None` keeps it until cleared.
	async fn set(&self, key: &str, html: &str, ttl: Option<Duration>) -> CacheResult<()>;

	/// Removes every entry whose key starts with `prefix`.
	async fn clear_prefix(&self, prefix: &str) -> CacheResult<()>;

	/// Number of live entries, if the store can count them cheaply.
	async fn entry_count(&self) -> Option<u64> {
		None
	}
}

type Entries = RwLock<HashMap<String, CacheEntry>>;

/// In-memory store
#[derive(Clone, Default)]
pub struct InMemoryResultStore {
	entries: Arc<Entries>,
}

impl InMemoryResultStore {
	/// Create an empty store
	pub fn new() -> Self {
		Self::default()
	}

	/// Drops expired entries
	pub async fn cleanup_expired(&self) {
		drop_expired(&self.entries).await;
	}

	/// Starts a background task that drops expired entries every
	/// `interval`.
	///
	/// The task holds only a weak reference and ends once the last clone of
	/// the store is dropped. Outside a Tokio runtime nothing is started and
	/// expired entries are only dropped when read.
	pub fn start_auto_cleanup(&self, interval: Duration) {
		let Ok(runtime) = tokio::runtime::Handle::try_current() else {
			tracing::debug!("no async runtime, expired cache entries are dropped on read");
			return;
		};
		let store = Arc::downgrade(&self.entries);
		let period = interval.max(Duration::from_millis(1));
		runtime.spawn(async move {
			let mut timer = tokio::time::interval(period);
			// The first tick completes immediately.
			timer.tick().await;
			loop {
				timer.tick().await;
				let Some(entries) = store.upgrade() else {
					break;
				};
				drop_expired(&entries).await;
			}
		});
	}

	/// Builder form of [`start_auto_cleanup`](Self::start_auto_cleanup).
	pub fn with_auto_cleanup(self, interval: Duration) -> Self {
		self.start_auto_cleanup(interval);
		self
	}
}

async fn drop_expired(entries: &Entries) {
	let mut entries = entries.write().await;
	let before = entries.len();
	entries.retain(|_, entry| !entry.is_expired());
	let dropped = before - entries.len();
	if dropped > 0 {
		tracing::trace!(dropped, "dropped expired cache entries");
	}
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
	async fn get(&self, key: &str) -> CacheResult<Option<String>> {
		{
			let entries = self.entries.read().await;
			match entries.get(key) {
				Some(entry) if !entry.is_expired() => return Ok(Some(entry.html.clone())),
				Some(_) => {}
				None => return Ok(None),
			}
		}
		// Expired: drop it so the map does not grow with dead entries.
		let mut entries = self.entries.write().await;
		if entries.get(key).is_some_and(CacheEntry::is_expired) {
			entries.remove(key);
		}
		Ok(None)
	}

	async fn set(&self, key: &str, html: &str, ttl: Option<Duration>) -> CacheResult<()> {
		let mut entries = self.entries.write().await;
		entries.insert(key.to_string(), CacheEntry::new(html.to_string(), ttl));
		Ok(())
	}

	async fn clear_prefix(&self, prefix: &str) -> CacheResult<()> {
		let mut entries = self.entries.write().await;
		entries.retain(|key, _| !key.starts_with(prefix));
		Ok(())
	}

	async fn entry_count(&self) -> Option<u64> {
		let entries = self.entries.read().await;
		Some(entries.values().filter(|e| !e.is_expired()).count() as u64)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_set_and_get() {
		let store = InMemoryResultStore::new();
		store.set("k", "<p>v</p>", None).await.unwrap();
		assert_eq!(store.get("k").await.unwrap().as_deref(), Some("<p>v</p>"));
		assert_eq!(store.get("missing").await.unwrap(), None);
	}

	#[rstest]
	#[tokio::test]
	async fn test_expired_entries_are_misses() {
		// Arrange
		let store = InMemoryResultStore::new();
		store
			.set("k", "v", Some(Duration::from_millis(10)))
			.await
			.unwrap();

		// Act
		tokio::time::sleep(Duration::from_millis(30)).await;

		// Assert
		assert_eq!(store.get("k").await.unwrap(), None);
		assert_eq!(store.entry_count().await, Some(0));
	}

	#[rstest]
	#[tokio::test]
	async fn test_clear_prefix_only_touches_namespace() {
		let store = InMemoryResultStore::new();
		store.set("islands:A", "a", None).await.unwrap();
		store.set("other:B", "b", None).await.unwrap();

		store.clear_prefix("islands:").await.unwrap();

		assert_eq!(store.get("islands:A").await.unwrap(), None);
		assert_eq!(store.get("other:B").await.unwrap().as_deref(), Some("b"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_cleanup_expired() {
		let store = InMemoryResultStore::new();
		store
			.set("short", "v", Some(Duration::from_millis(5)))
			.await
			.unwrap();
		store.set("long", "v", None).await.unwrap();
		tokio::time::sleep(Duration::from_millis(20)).await;

		store.cleanup_expired().await;

		assert_eq!(store.entries.read().await.len(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_auto_cleanup_drops_unread_expired_entries() {
		// Arrange
		let store = InMemoryResultStore::new().with_auto_cleanup(Duration::from_millis(20));
		for key in ["a", "b", "c"] {
			store
				.set(key, "v", Some(Duration::from_millis(10)))
				.await
				.unwrap();
		}
		store.set("kept", "v", None).await.unwrap();

		// Act
		tokio::time::sleep(Duration::from_millis(120)).await;

		// Assert
		let entries = store.entries.read().await;
		assert_eq!(entries.len(), 1);
		assert!(entries.contains_key("kept"));
	}

	#[rstest]
	fn test_auto_cleanup_outside_runtime_is_a_no_op() {
		let store = InMemoryResultStore::new().with_auto_cleanup(Duration::from_millis(20));
		assert_eq!(Arc::weak_count(&store.entries), 0);
	}
}
