//! Component references.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Returns `true` when `name` follows the component naming rule.
///
/// A component name starts with an ASCII uppercase letter and may be split
/// into dotted segments (`Admin.UserBadge`). Every segment must be non-empty
/// and consist of ASCII alphanumerics or underscores.
pub fn is_component_name(name: &str) -> bool {
	if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
		return false;
	}
	name.split('.').all(|segment| {
		!segment.is_empty()
			&& segment
				.chars()
				.all(|c| c.is_ascii_alphanumeric() || c == '_')
	})
}

/// Logical name of a component, e.g. `UserBadge` or `Admin.UserBadge`.
///
/// The name is resolved to a source file by a resolver on the rendering side;
/// the reference itself never changes once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentReference(String);

impl ComponentReference {
	/// Creates a reference without validating the name.
	pub fn new(name: impl Into<String>) -> Self {
		Self(name.into())
	}

	/// Creates a reference if `name` satisfies [`is_component_name`].
	pub fn parse(name: &str) -> Option<Self> {
		is_component_name(name).then(|| Self(name.to_string()))
	}

	/// The logical component name.
	pub fn name(&self) -> &str {
		&self.0
	}

	/// Dotted segments of the name.
	pub fn segments(&self) -> impl Iterator<Item = &str> {
		self.0.split('.')
	}
}

impl fmt::Display for ComponentReference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ComponentReference {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}
