//! Result cache errors.

use thiserror::Error;

/// Result type for store operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors raised by a [`ResultStore`](crate::ResultStore).
///
/// The result cache never lets these reach a page render: a failing store
/// read is a miss and a failing write is skipped.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CacheError {
	/// The backing store could not be reached.
	#[error("cache store unavailable: {0}")]
	Unavailable(String),

	/// The backing store returned data it should not hold.
	#[error("corrupt cache entry for '{key}': {reason}")]
	Corrupt {
		/// Cache key.
		key: String,
		/// What was wrong.
		reason: String,
	},
}
