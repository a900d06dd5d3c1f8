//! Service-level errors.
//!
//! Component failures are [`IslandError`](reinhardt_islands_types::IslandError)
//! values carried inside render outcomes. The errors here are the ones that
//! stop the service itself.

use thiserror::Error;

/// Result type for service startup and I/O.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that prevent the SSR service from running.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServerError {
	/// Socket or filesystem failure.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// The rendering engine could not be started.
	#[error("rendering engine unavailable: {0}")]
	Engine(String),

	/// A connection failed at the HTTP layer.
	#[error("HTTP error: {0}")]
	Http(#[from] hyper::Error),
}
