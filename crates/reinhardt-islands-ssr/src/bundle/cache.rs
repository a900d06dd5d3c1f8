use super::artifact::CompiledArtifact;
use super::key::{BundleKey, label_for};
use crate::compiler::ComponentCompiler;
use lru::LruCache;
use parking_lot::Mutex;
use reinhardt_islands_conf::SsrServerSettings;
use reinhardt_islands_types::{IslandError, IslandResult};
use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Bundle cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BundleStatistics {
	/// Entries currently cached.
	pub entries: usize,
	/// Maximum number of entries.
	pub capacity: usize,
	/// Lookups served from the cache.
	pub hits: u64,
	/// Lookups that had to compile.
	pub misses: u64,
	/// Successful compilations.
	pub compiles: u64,
	/// Entries dropped to stay within capacity.
	pub evictions: u64,
}

/// LRU cache of compiled components.
///
/// Lookups and inserts take a short lock; compilation runs outside it, so
/// two threads missing on the same key may both compile. The later insert
/// wins and both artifacts stay valid for their callers.
pub struct BundleCache {
	compiler: Arc<dyn ComponentCompiler>,
	artifact_dir: PathBuf,
	capacity: NonZeroUsize,
	entries: Mutex<LruCache<BundleKey, Arc<CompiledArtifact>>>,
	generation: AtomicU64,
	hits: AtomicU64,
	misses: AtomicU64,
	compiles: AtomicU64,
	evictions: AtomicU64,
}

impl fmt::Debug for BundleCache {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BundleCache")
			.field("artifact_dir", &self.artifact_dir)
			.field("capacity", &self.capacity)
			.field("entries", &self.len())
			.finish_non_exhaustive()
	}
}

impl BundleCache {
	/// Creates a cache holding at most `capacity` bundles (at least one).
	pub fn new(
		compiler: Arc<dyn ComponentCompiler>,
		artifact_dir: impl Into<PathBuf>,
		capacity: usize,
	) -> Self {
		let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
		Self {
			compiler,
			artifact_dir: artifact_dir.into(),
			capacity,
			entries: Mutex::new(LruCache::new(capacity)),
			generation: AtomicU64::new(0),
			hits: AtomicU64::new(0),
			misses: AtomicU64::new(0),
			compiles: AtomicU64::new(0),
			evictions: AtomicU64::new(0),
		}
	}

	/// Creates a cache sized and placed per the service settings.
	pub fn from_settings(compiler: Arc<dyn ComponentCompiler>, settings: &SsrServerSettings) -> Self {
		Self::new(
			compiler,
			settings.artifact_dir.clone(),
			settings.bundle_cache_capacity,
		)
	}

	/// Maximum number of cached bundles.
	pub fn capacity(&self) -> usize {
		self.capacity.get()
	}

	/// Directory compiled artifacts are written to.
	pub fn artifact_dir(&self) -> &Path {
		&self.artifact_dir
	}

	/// Number of cached bundles.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Whether nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Whether `key` is cached. Does not count as a use.
	pub fn contains(&self, key: &BundleKey) -> bool {
		self.entries.lock().contains(key)
	}

	/// Returns the compiled bundle for `key`, compiling it on a miss.
	///
	/// A hit marks the entry as most recently used. A miss compiles the
	/// source, stores the result and evicts the least recently used entry
	/// if the cache is over capacity.
	pub fn get_or_compile(&self, key: &BundleKey) -> IslandResult<Arc<CompiledArtifact>> {
		if let Some(artifact) = self.entries.lock().get(key) {
			self.hits.fetch_add(1, Ordering::Relaxed);
			return Ok(artifact.clone());
		}
		self.misses.fetch_add(1, Ordering::Relaxed);

		let artifact = Arc::new(self.compile(key)?);
		self.compiles.fetch_add(1, Ordering::Relaxed);

		let released = self.entries.lock().push(key.clone(), artifact.clone());
		if let Some((evicted, _)) = &released {
			if evicted != key {
				tracing::info!(bundle = %evicted.path.display(), "evicted compiled bundle");
				self.evictions.fetch_add(1, Ordering::Relaxed);
			}
		}
		// Artifact files are removed here, outside the lock, unless a
		// render still holds them.
		drop(released);

		Ok(artifact)
	}

	fn compile(&self, key: &BundleKey) -> IslandResult<CompiledArtifact> {
		let component = label_for(&key.path);
		let source = std::fs::read_to_string(&key.path).map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				IslandError::ComponentResolution(key.path.display().to_string())
			} else {
				IslandError::Compilation {
					component: component.clone(),
					message: format!("failed to read source: {e}"),
				}
			}
		})?;

		let code = self.compiler.compile(&source, &key.path)?;
		let generation = self.generation.fetch_add(1, Ordering::Relaxed);
		let artifact = CompiledArtifact::write(key.clone(), code, &self.artifact_dir, generation)
			.map_err(|e| IslandError::Compilation {
				component: component.clone(),
				message: format!("failed to write artifact: {e}"),
			})?;
		tracing::debug!(
			component = %component,
			environment = %key.environment,
			artifact = %artifact.file().display(),
			"compiled bundle"
		);
		Ok(artifact)
	}

	/// Drops every cached bundle. Returns how many were dropped.
	pub fn clear(&self) -> usize {
		let drained = std::mem::replace(&mut *self.entries.lock(), LruCache::new(self.capacity));
		let count = drained.len();
		drop(drained);
		tracing::info!(count, "cleared bundle cache");
		count
	}

	/// Drops every cached bundle and removes the artifact directory if it is
	/// left empty.
	pub fn shutdown(&self) {
		self.clear();
		match std::fs::remove_dir(&self.artifact_dir) {
			Ok(()) => tracing::debug!(dir = %self.artifact_dir.display(), "removed artifact directory"),
			Err(e) => tracing::debug!(dir = %self.artifact_dir.display(), error = %e, "artifact directory kept"),
		}
	}

	/// Current counters.
	pub fn statistics(&self) -> BundleStatistics {
		BundleStatistics {
			entries: self.len(),
			capacity: self.capacity.get(),
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			compiles: self.compiles.load(Ordering::Relaxed),
			evictions: self.evictions.load(Ordering::Relaxed),
		}
	}
}
