//! Environment variable access with prefix support.

use indexmap::IndexMap;
use std::path::PathBuf;

/// Where [`Env`] reads values from.
#[derive(Debug, Clone, Default)]
enum EnvSource {
	/// The process environment.
	#[default]
	Process,
	/// A fixed set of values, used by tests and embedders.
	Map(IndexMap<String, String>),
}

/// Environment variable manager with prefix support
#[derive(Debug, Clone, Default)]
pub struct Env {
	/// Optional prefix for environment variables (e.g., "REINHARDT_ISLANDS_")
	pub prefix: Option<String>,
	source: EnvSource,
}

impl Env {
	/// Create an `Env` reading the process environment
	pub fn new() -> Self {
		Self::default()
	}

	/// Create an `Env` reading from a fixed set of values instead of the
	/// process environment. Keys are full names, including any prefix.
	pub fn from_map<I, K, V>(vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			prefix: None,
			source: EnvSource::Map(
				vars.into_iter()
					.map(|(k, v)| (k.into(), v.into()))
					.collect(),
			),
		}
	}

	/// Set a prefix for all environment variable lookups
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = Some(prefix.into());
		self
	}

	fn get_key_name(&self, key: &str) -> String {
		match &self.prefix {
			Some(prefix) => format!("{}{}", prefix, key),
			None => key.to_string(),
		}
	}

	fn lookup(&self, key: &str) -> Result<(String, Option<String>), EnvError> {
		let full_key = self.get_key_name(key);
		validate_env_var_name(&full_key)?;
		let value = match &self.source {
			EnvSource::Process => std::env::var(&full_key).ok(),
			EnvSource::Map(vars) => vars.get(&full_key).cloned(),
		};
		Ok((full_key, value))
	}

	/// Read an optional string value. Empty values count as unset.
	pub fn opt_str(&self, key: &str) -> Result<Option<String>, EnvError> {
		let (_, value) = self.lookup(key)?;
		Ok(value.filter(|v| !v.is_empty()))
	}

	/// Read a string value
	pub fn str(&self, key: &str) -> Result<String, EnvError> {
		self.str_with_default(key, None)
	}

	/// Read a string value with a default
	pub fn str_with_default(&self, key: &str, default: Option<&str>) -> Result<String, EnvError> {
		let (full_key, value) = self.lookup(key)?;
		match value {
			Some(val) => Ok(val),
			None => match default {
				Some(d) => Ok(d.to_string()),
				None => Err(EnvError::MissingVariable(full_key)),
			},
		}
	}

	/// Read a boolean value with a default
	pub fn bool_with_default(&self, key: &str, default: Option<bool>) -> Result<bool, EnvError> {
		let (full_key, value) = self.lookup(key)?;
		match value {
			Some(val) => parse_bool(&val).map_err(|e| EnvError::ParseError {
				key: full_key,
				value_len: val.len(),
				error: e,
			}),
			None => default.ok_or(EnvError::MissingVariable(full_key)),
		}
	}

	/// Read an unsigned integer value with a default
	pub fn u64_with_default(&self, key: &str, default: Option<u64>) -> Result<u64, EnvError> {
		match self.opt_u64(key)? {
			Some(val) => Ok(val),
			None => default.ok_or_else(|| EnvError::MissingVariable(self.get_key_name(key))),
		}
	}

	/// Read an optional unsigned integer value. Empty values count as unset.
	pub fn opt_u64(&self, key: &str) -> Result<Option<u64>, EnvError> {
		let (full_key, value) = self.lookup(key)?;
		match value.filter(|v| !v.is_empty()) {
			Some(val) => val
				.trim()
				.parse::<u64>()
				.map(Some)
				.map_err(|e| EnvError::ParseError {
					key: full_key,
					value_len: val.len(),
					error: e.to_string(),
				}),
			None => Ok(None),
		}
	}

	/// Read a size value with a default
	pub fn usize_with_default(&self, key: &str, default: Option<usize>) -> Result<usize, EnvError> {
		let value = self.u64_with_default(key, default.map(|d| d as u64))?;
		usize::try_from(value).map_err(|e| EnvError::ParseError {
			key: self.get_key_name(key),
			value_len: value.to_string().len(),
			error: e.to_string(),
		})
	}

	/// Read a path value with a default
	pub fn path_with_default(
		&self,
		key: &str,
		default: Option<PathBuf>,
	) -> Result<PathBuf, EnvError> {
		let (full_key, value) = self.lookup(key)?;
		match value {
			Some(val) => Ok(PathBuf::from(val)),
			None => default.ok_or(EnvError::MissingVariable(full_key)),
		}
	}
}

/// Parses the boolean spellings accepted in environment variables.
pub fn parse_bool(value: &str) -> Result<bool, String> {
	match value.trim().to_ascii_lowercase().as_str() {
		"true" | "1" | "yes" | "on" => Ok(true),
		"false" | "0" | "no" | "off" | "" => Ok(false),
		other => Err(format!("invalid boolean value: {other}")),
	}
}

/// Validates an environment variable name.
///
/// Rejects names that are empty, contain control characters, or contain
/// the `=` character (which is used as the key-value separator).
pub fn validate_env_var_name(name: &str) -> Result<(), EnvError> {
	if name.is_empty() {
		return Err(EnvError::InvalidVariableName {
			name: name.to_string(),
			reason: "environment variable name must not be empty".to_string(),
		});
	}

	if let Some(pos) = name.find(|c: char| c.is_control()) {
		return Err(EnvError::InvalidVariableName {
			name: name.to_string(),
			reason: format!(
				"environment variable name contains control character at position {}",
				pos
			),
		});
	}

	if name.contains('=') {
		return Err(EnvError::InvalidVariableName {
			name: name.to_string(),
			reason: "environment variable name must not contain '='".to_string(),
		});
	}

	Ok(())
}

/// Environment variable errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EnvError {
	#[error("missing environment variable: {0}")]
	MissingVariable(String),

	#[error("failed to parse environment variable '{key}' (value length: {value_len}): {error}")]
	ParseError {
		key: String,
		/// Length of the original value, stored instead of the raw value
		value_len: usize,
		error: String,
	},

	#[error("invalid value for '{key}': {reason}")]
	InvalidValue { key: String, reason: String },

	#[error("invalid environment variable name '{name}': {reason}")]
	InvalidVariableName { name: String, reason: String },
}
