//! Render outcomes.

use crate::error::{ErrorKind, IslandError};
use serde::{Deserialize, Serialize};

/// Result of rendering one island, batch entry, or tree.
///
/// Expected per-component failures are values of this type, never panics or
/// `Err` returns, so a single broken component cannot break a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderOutcome {
	/// Rendered HTML.
	Success {
		/// The rendered markup.
		html: String,
		/// Client bundle reference, only present for full-page renders.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		bundle_key: Option<String>,
	},
	/// Rendering failed.
	Error {
		/// Failure class.
		kind: ErrorKind,
		/// Human readable message.
		message: String,
		/// Stack trace, when available.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		stack: Option<String>,
	},
}

impl RenderOutcome {
	/// A successful render without a bundle reference.
	pub fn success(html: impl Into<String>) -> Self {
		Self::Success {
			html: html.into(),
			bundle_key: None,
		}
	}

	/// A failed render.
	pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
		Self::Error {
			kind,
			message: message.into(),
			stack: None,
		}
	}

	/// Whether rendering succeeded.
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success { .. })
	}

	/// Rendered HTML, if successful.
	pub fn html(&self) -> Option<&str> {
		match self {
			Self::Success { html, .. } => Some(html),
			Self::Error { .. } => None,
		}
	}

	/// Failure kind, if failed.
	pub fn error_kind(&self) -> Option<ErrorKind> {
		match self {
			Self::Success { .. } => None,
			Self::Error { kind, .. } => Some(*kind),
		}
	}

	/// Converts a failed outcome into an [`IslandError`] for `component`.
	pub fn into_result(self, component: &str) -> Result<(String, Option<String>), IslandError> {
		match self {
			Self::Success { html, bundle_key } => Ok((html, bundle_key)),
			Self::Error {
				kind,
				message,
				stack,
			} => Err(IslandError::from_parts(kind, component, message, stack)),
		}
	}
}

impl From<IslandError> for RenderOutcome {
	fn from(err: IslandError) -> Self {
		Self::Error {
			kind: err.kind(),
			stack: err.stack().map(str::to_string),
			message: err.detail(),
		}
	}
}
