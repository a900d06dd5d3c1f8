//! SSR service settings.

use crate::env::{Env, EnvError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable prefix for [`SsrServerSettings`].
pub const SSR_ENV_PREFIX: &str = "REINHARDT_ISLANDS_SSR_";

/// Execution environment the SSR service compiles for.
///
/// Part of every bundle cache key, so development and production artifacts
/// never share a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SsrEnvironment {
	/// Development builds.
	Development,
	/// Production builds.
	#[default]
	Production,
}

impl SsrEnvironment {
	/// Identifier used in bundle keys.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Development => "development",
			Self::Production => "production",
		}
	}
}

impl FromStr for SsrEnvironment {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"development" | "dev" => Ok(Self::Development),
			"production" | "prod" => Ok(Self::Production),
			other => Err(format!("unknown SSR environment: {other}")),
		}
	}
}

impl fmt::Display for SsrEnvironment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Settings for the SSR execution service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsrServerSettings {
	/// Address the HTTP server binds to.
	pub bind: SocketAddr,
	/// Execution environment.
	pub environment: SsrEnvironment,
	/// Maximum number of compiled bundles kept.
	pub bundle_cache_capacity: usize,
	/// Directory compiled artifacts are written to.
	pub artifact_dir: PathBuf,
	/// Largest accepted request body.
	pub max_payload_bytes: usize,
	/// Per-request render timeout in milliseconds.
	///
	/// Kept below the orchestrator's request timeout so a slow render is
	/// answered with a timeout status the client can still read.
	pub render_timeout_ms: u64,
	/// Directory holding the Preact UMD bundles. The built-in runtime is
	/// used when unset.
	pub ui_runtime_dir: Option<PathBuf>,
}

impl Default for SsrServerSettings {
	fn default() -> Self {
		Self {
			bind: SocketAddr::from(([127, 0, 0, 1], 5175)),
			environment: SsrEnvironment::Production,
			bundle_cache_capacity: 100,
			artifact_dir: std::env::temp_dir().join("reinhardt-islands-ssr"),
			max_payload_bytes: 1024 * 1024,
			render_timeout_ms: 4_000,
			ui_runtime_dir: None,
		}
	}
}

impl SsrServerSettings {
	/// Loads settings from `REINHARDT_ISLANDS_SSR_*` process environment variables.
	pub fn from_env() -> Result<Self, EnvError> {
		Self::from_env_source(&Env::new().with_prefix(SSR_ENV_PREFIX))
	}

	/// Loads settings from an explicit [`Env`], falling back to defaults.
	pub fn from_env_source(env: &Env) -> Result<Self, EnvError> {
		let defaults = Self::default();
		let prefix = env.prefix.as_deref().unwrap_or("");

		let bind = match env.opt_str("BIND")? {
			Some(raw) => raw.parse().map_err(|e: std::net::AddrParseError| {
				EnvError::InvalidValue {
					key: format!("{prefix}BIND"),
					reason: e.to_string(),
				}
			})?,
			None => defaults.bind,
		};
		let environment = match env.opt_str("ENVIRONMENT")? {
			Some(raw) => raw.parse::<SsrEnvironment>().map_err(|reason| EnvError::InvalidValue {
				key: format!("{prefix}ENVIRONMENT"),
				reason,
			})?,
			None => defaults.environment,
		};
		let bundle_cache_capacity = env.usize_with_default(
			"BUNDLE_CACHE_CAPACITY",
			Some(defaults.bundle_cache_capacity),
		)?;
		if bundle_cache_capacity == 0 {
			return Err(EnvError::InvalidValue {
				key: format!("{prefix}BUNDLE_CACHE_CAPACITY"),
				reason: "capacity must be at least 1".to_string(),
			});
		}

		Ok(Self {
			bind,
			environment,
			bundle_cache_capacity,
			artifact_dir: env.path_with_default("ARTIFACT_DIR", Some(defaults.artifact_dir))?,
			max_payload_bytes: env
				.usize_with_default("MAX_PAYLOAD_BYTES", Some(defaults.max_payload_bytes))?,
			render_timeout_ms: env
				.u64_with_default("RENDER_TIMEOUT_MS", Some(defaults.render_timeout_ms))?,
			ui_runtime_dir: env.opt_str("UI_RUNTIME_DIR")?.map(PathBuf::from),
		})
	}

	/// Sets the bind address.
	pub fn with_bind(mut self, bind: SocketAddr) -> Self {
		self.bind = bind;
		self
	}

	/// Sets the execution environment.
	pub fn with_environment(mut self, environment: SsrEnvironment) -> Self {
		self.environment = environment;
		self
	}

	/// Sets the bundle cache capacity.
	pub fn with_bundle_cache_capacity(mut self, capacity: usize) -> Self {
		self.bundle_cache_capacity = capacity;
		self
	}

	/// Sets the artifact directory.
	pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.artifact_dir = dir.into();
		self
	}

	/// Sets the request payload limit.
	pub fn with_max_payload_bytes(mut self, bytes: usize) -> Self {
		self.max_payload_bytes = bytes;
		self
	}

	/// Sets the render timeout.
	pub fn with_render_timeout_ms(mut self, ms: u64) -> Self {
		self.render_timeout_ms = ms;
		self
	}

	/// Loads the UI runtime from `dir`.
	pub fn with_ui_runtime_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.ui_runtime_dir = Some(dir.into());
		self
	}

	/// Per-request render timeout.
	pub fn render_timeout(&self) -> Duration {
		Duration::from_millis(self.render_timeout_ms)
	}
}
