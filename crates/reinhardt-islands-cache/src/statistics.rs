//! Cache statistics

/// Result cache statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStatistics {
	/// Number of cache hits
	pub hits: u64,
	/// Number of cache misses
	pub misses: u64,
	/// Total number of lookups
	pub total_requests: u64,
	/// Entries currently stored, when the store can tell
	pub entry_count: Option<u64>,
}

impl CacheStatistics {
	/// Calculate hit rate (0.0 to 1.0)
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_islands_cache::CacheStatistics;
	///
	/// let stats = CacheStatistics {
	/// 	hits: 75,
	/// 	misses: 25,
	/// 	total_requests: 100,
	/// 	entry_count: None,
	/// };
	/// assert_eq!(stats.hit_rate(), 0.75);
	/// ```
	pub fn hit_rate(&self) -> f64 {
		if self.total_requests == 0 {
			0.0
		} else {
			self.hits as f64 / self.total_requests as f64
		}
	}

	/// Calculate miss rate (0.0 to 1.0)
	pub fn miss_rate(&self) -> f64 {
		if self.total_requests == 0 {
			0.0
		} else {
			self.misses as f64 / self.total_requests as f64
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_rates_without_requests_are_zero() {
		let stats = CacheStatistics::default();
		assert_eq!(stats.hit_rate(), 0.0);
		assert_eq!(stats.miss_rate(), 0.0);
	}

	#[rstest]
	fn test_miss_rate() {
		let stats = CacheStatistics {
			hits: 1,
			misses: 3,
			total_requests: 4,
			entry_count: Some(1),
		};
		assert_eq!(stats.miss_rate(), 0.75);
	}
}
