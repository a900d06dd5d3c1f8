//! Render-side settings.

use crate::env::{Env, EnvError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable prefix for [`IslandsSettings`].
pub const ISLANDS_ENV_PREFIX: &str = "REINHARDT_ISLANDS_";

/// How failed islands appear in the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorDisplay {
	/// A visible diagnostic overlay with the error message.
	#[default]
	Development,
	/// A hidden placeholder carrying only the failure marker attribute.
	Production,
}

impl FromStr for ErrorDisplay {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"development" | "dev" => Ok(Self::Development),
			"production" | "prod" => Ok(Self::Production),
			other => Err(format!("unknown error display mode: {other}")),
		}
	}
}

impl fmt::Display for ErrorDisplay {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Development => f.write_str("development"),
			Self::Production => f.write_str("production"),
		}
	}
}

/// Settings for the render orchestrator and its SSR client.
///
/// # Example
///
/// ```
/// use reinhardt_islands_conf::IslandsSettings;
///
/// let settings = IslandsSettings::default()
/// 	.with_ssr_url("http://ssr.internal:5175")
/// 	.with_cache_ttl_secs(Some(60));
/// assert!(settings.result_cache_enabled());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IslandsSettings {
	/// Base URL of the SSR execution service.
	pub ssr_url: String,
	/// Directory component references are resolved against.
	pub components_dir: PathBuf,
	/// Render flat pages with one batch call.
	pub batch_rendering: bool,
	/// Render nested components as one tree call.
	pub tree_rendering: bool,
	/// Per-call timeout in milliseconds.
	pub request_timeout_ms: u64,
	/// Retries for transport failures.
	pub max_retries: u32,
	/// Initial retry delay in milliseconds, doubled per attempt.
	pub retry_delay_ms: u64,
	/// Largest request body sent to the SSR service.
	pub max_payload_bytes: usize,
	/// Result cache TTL. `None` disables the result cache.
	pub cache_ttl_secs: Option<u64>,
	/// Nesting depth above which a warning is logged.
	pub nesting_depth_warning: usize,
	/// Failure marker style.
	pub error_display: ErrorDisplay,
	/// URL prefix client bundles are served from.
	pub bundle_url_prefix: String,
}

impl Default for IslandsSettings {
	fn default() -> Self {
		Self {
			ssr_url: "http://127.0.0.1:5175".to_string(),
			components_dir: PathBuf::from("app/components"),
			batch_rendering: true,
			tree_rendering: true,
			request_timeout_ms: 5_000,
			max_retries: 1,
			retry_delay_ms: 50,
			max_payload_bytes: 1024 * 1024,
			cache_ttl_secs: None,
			nesting_depth_warning: 3,
			error_display: ErrorDisplay::Development,
			bundle_url_prefix: "/islands/bundles".to_string(),
		}
	}
}

impl IslandsSettings {
	/// Loads settings from `REINHARDT_ISLANDS_*` process environment variables.
	pub fn from_env() -> Result<Self, EnvError> {
		Self::from_env_source(&Env::new().with_prefix(ISLANDS_ENV_PREFIX))
	}

	/// Loads settings from an explicit [`Env`], falling back to defaults.
	pub fn from_env_source(env: &Env) -> Result<Self, EnvError> {
		let defaults = Self::default();
		let error_display = match env.opt_str("ERROR_DISPLAY")? {
			Some(raw) => raw.parse::<ErrorDisplay>().map_err(|reason| EnvError::InvalidValue {
				key: format!("{}ERROR_DISPLAY", env.prefix.as_deref().unwrap_or("")),
				reason,
			})?,
			None => defaults.error_display,
		};
		let max_retries = env.u64_with_default("MAX_RETRIES", Some(defaults.max_retries.into()))?;

		let settings = Self {
			ssr_url: env.str_with_default("SSR_URL", Some(&defaults.ssr_url))?,
			components_dir: env
				.path_with_default("COMPONENTS_DIR", Some(defaults.components_dir))?,
			batch_rendering: env
				.bool_with_default("BATCH_RENDERING", Some(defaults.batch_rendering))?,
			tree_rendering: env.bool_with_default("TREE_RENDERING", Some(defaults.tree_rendering))?,
			request_timeout_ms: env
				.u64_with_default("REQUEST_TIMEOUT_MS", Some(defaults.request_timeout_ms))?,
			max_retries: u32::try_from(max_retries).unwrap_or(u32::MAX),
			retry_delay_ms: env.u64_with_default("RETRY_DELAY_MS", Some(defaults.retry_delay_ms))?,
			max_payload_bytes: env
				.usize_with_default("MAX_PAYLOAD_BYTES", Some(defaults.max_payload_bytes))?,
			cache_ttl_secs: env.opt_u64("CACHE_TTL_SECS")?,
			nesting_depth_warning: env.usize_with_default(
				"NESTING_DEPTH_WARNING",
				Some(defaults.nesting_depth_warning),
			)?,
			error_display,
			bundle_url_prefix: env
				.str_with_default("BUNDLE_URL_PREFIX", Some(&defaults.bundle_url_prefix))?,
		};
		tracing::debug!(
			ssr_url = %settings.ssr_url,
			batch = settings.batch_rendering,
			tree = settings.tree_rendering,
			"loaded islands settings"
		);
		Ok(settings)
	}

	/// Sets the SSR service URL.
	pub fn with_ssr_url(mut self, url: impl Into<String>) -> Self {
		self.ssr_url = url.into();
		self
	}

	/// Sets the components directory.
	pub fn with_components_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.components_dir = dir.into();
		self
	}

	/// Enables or disables batch rendering.
	pub fn with_batch_rendering(mut self, enabled: bool) -> Self {
		self.batch_rendering = enabled;
		self
	}

	/// Enables or disables tree rendering.
	pub fn with_tree_rendering(mut self, enabled: bool) -> Self {
		self.tree_rendering = enabled;
		self
	}

	/// Sets the per-call timeout.
	pub fn with_request_timeout_ms(mut self, ms: u64) -> Self {
		self.request_timeout_ms = ms;
		self
	}

	/// Sets retry count and initial delay for transport failures.
	pub fn with_retries(mut self, max_retries: u32, delay_ms: u64) -> Self {
		self.max_retries = max_retries;
		self.retry_delay_ms = delay_ms;
		self
	}

	/// Sets the request payload limit.
	pub fn with_max_payload_bytes(mut self, bytes: usize) -> Self {
		self.max_payload_bytes = bytes;
		self
	}

	/// Sets the result cache TTL; `None` disables the result cache.
	pub fn with_cache_ttl_secs(mut self, ttl: Option<u64>) -> Self {
		self.cache_ttl_secs = ttl;
		self
	}

	/// Sets the nesting depth warning threshold.
	pub fn with_nesting_depth_warning(mut self, depth: usize) -> Self {
		self.nesting_depth_warning = depth;
		self
	}

	/// Sets the failure marker style.
	pub fn with_error_display(mut self, display: ErrorDisplay) -> Self {
		self.error_display = display;
		self
	}

	/// Sets the client bundle URL prefix.
	pub fn with_bundle_url_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.bundle_url_prefix = prefix.into();
		self
	}

	/// Per-call timeout.
	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}

	/// Initial retry delay.
	pub fn retry_delay(&self) -> Duration {
		Duration::from_millis(self.retry_delay_ms)
	}

	/// Result cache TTL, `None` when the result cache is disabled.
	pub fn cache_ttl(&self) -> Option<Duration> {
		self.cache_ttl_secs.map(Duration::from_secs)
	}

	/// Whether the result cache is in use.
	pub fn result_cache_enabled(&self) -> bool {
		self.cache_ttl_secs.is_some()
	}
}
