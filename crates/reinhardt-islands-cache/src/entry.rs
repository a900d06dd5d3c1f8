//! Internal cache entry structure

use std::time::{Duration, SystemTime};

/// Stored HTML with expiration
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
	pub(crate) html: String,
	pub(crate) expires_at: Option<SystemTime>,
}

impl CacheEntry {
	pub(crate) fn new(html: String, ttl: Option<Duration>) -> Self {
		let expires_at = ttl.map(|d| SystemTime::now() + d);
		Self { html, expires_at }
	}

	pub(crate) fn is_expired(&self) -> bool {
		match self.expires_at {
			Some(expires_at) => SystemTime::now() >= expires_at,
			None => false,
		}
	}
}
