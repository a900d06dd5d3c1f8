//! Per-island failure taxonomy.
//!
//! None of these errors is allowed to fail a whole page response. The
//! orchestrator turns each one into a failure marker for the affected island.
//! Only full-page renders hand an [`IslandError`] back to the host.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for island operations.
pub type IslandResult<T> = Result<T, IslandError>;

/// Island rendering errors.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum IslandError {
	/// The referenced component could not be located.
	#[error("component not found: {0}")]
	ComponentResolution(String),

	/// The component source failed to compile.
	#[error("failed to compile component '{component}': {message}")]
	Compilation {
		/// Component name or source path.
		component: String,
		/// Compiler message.
		message: String,
	},

	/// The component threw while rendering.
	#[error("component '{component}' failed to render: {message}")]
	RenderExecution {
		/// Component name or source path.
		component: String,
		/// Error message raised by the component.
		message: String,
		/// Stack trace, when the engine provides one.
		stack: Option<String>,
	},

	/// The SSR service could not be reached, timed out, or answered with
	/// something that is neither a success nor an error shape.
	#[error("SSR transport error: {0}")]
	Transport(String),

	/// The request body exceeded the configured size limit.
	#[error("SSR payload of {size} bytes exceeds the limit of {limit} bytes")]
	PayloadTooLarge {
		/// Request body size in bytes.
		size: usize,
		/// Configured limit in bytes.
		limit: usize,
	},

	/// A container tag holds nested components but tree rendering is off.
	#[error("component '{0}' contains nested components but tree rendering is disabled")]
	NestedComponentsUnsupported(String),

	/// Props or responses could not be (de)serialized.
	#[error("serialization error: {0}")]
	Serialization(String),
}

impl IslandError {
	/// Machine readable kind of this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::ComponentResolution(_) => ErrorKind::ComponentResolution,
			Self::Compilation { .. } => ErrorKind::Compilation,
			Self::RenderExecution { .. } => ErrorKind::RenderExecution,
			Self::Transport(_) => ErrorKind::Transport,
			Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
			Self::NestedComponentsUnsupported(_) => ErrorKind::NestedComponentsUnsupported,
			Self::Serialization(_) => ErrorKind::Serialization,
		}
	}

	/// Stack trace carried by the error, if any.
	pub fn stack(&self) -> Option<&str> {
		match self {
			Self::RenderExecution { stack, .. } => stack.as_deref(),
			_ => None,
		}
	}

	/// The message without the variant prefix, as carried on the wire.
	///
	/// [`IslandError::from_parts`] with the same kind and component rebuilds
	/// an error with the same display text.
	pub fn detail(&self) -> String {
		match self {
			Self::ComponentResolution(detail)
			| Self::Transport(detail)
			| Self::NestedComponentsUnsupported(detail)
			| Self::Serialization(detail) => detail.clone(),
			Self::Compilation { message, .. } | Self::RenderExecution { message, .. } => {
				message.clone()
			}
			Self::PayloadTooLarge { .. } => self.to_string(),
		}
	}

	/// Rebuilds an error from its wire representation.
	pub fn from_parts(
		kind: ErrorKind,
		component: &str,
		message: impl Into<String>,
		stack: Option<String>,
	) -> Self {
		let message = message.into();
		match kind {
			ErrorKind::ComponentResolution => Self::ComponentResolution(message),
			ErrorKind::Compilation => Self::Compilation {
				component: component.to_string(),
				message,
			},
			ErrorKind::RenderExecution => Self::RenderExecution {
				component: component.to_string(),
				message,
				stack,
			},
			ErrorKind::Transport => Self::Transport(message),
			ErrorKind::PayloadTooLarge => {
				// The detail is the display text: "... of {size} bytes ... of {limit} bytes".
				let mut numbers = message
					.split_whitespace()
					.filter_map(|word| word.parse::<usize>().ok());
				let size = numbers.next().unwrap_or(0);
				let limit = numbers.next().unwrap_or(0);
				Self::PayloadTooLarge { size, limit }
			}
			ErrorKind::NestedComponentsUnsupported => {
				Self::NestedComponentsUnsupported(component.to_string())
			}
			ErrorKind::Serialization => Self::Serialization(message),
		}
	}
}

impl From<serde_json::Error> for IslandError {
	fn from(err: serde_json::Error) -> Self {
		Self::Serialization(err.to_string())
	}
}

/// Stable identifiers for [`IslandError`] variants.
///
/// These strings appear in failure marker attributes and in the `kind` field
/// of SSR service error bodies, so monitoring can tell failure classes apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// See [`IslandError::ComponentResolution`].
	ComponentResolution,
	/// See [`IslandError::Compilation`].
	Compilation,
	/// See [`IslandError::RenderExecution`].
	RenderExecution,
	/// See [`IslandError::Transport`].
	Transport,
	/// See [`IslandError::PayloadTooLarge`].
	PayloadTooLarge,
	/// See [`IslandError::NestedComponentsUnsupported`].
	NestedComponentsUnsupported,
	/// See [`IslandError::Serialization`].
	Serialization,
}

impl ErrorKind {
	/// The wire/marker identifier.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::ComponentResolution => "component_resolution",
			Self::Compilation => "compilation",
			Self::RenderExecution => "render_execution",
			Self::Transport => "transport",
			Self::PayloadTooLarge => "payload_too_large",
			Self::NestedComponentsUnsupported => "nested_components_unsupported",
			Self::Serialization => "serialization",
		}
	}

	/// Parses a wire identifier.
	pub fn parse(s: &str) -> Option<Self> {
		Some(match s {
			"component_resolution" => Self::ComponentResolution,
			"compilation" => Self::Compilation,
			"render_execution" => Self::RenderExecution,
			"transport" => Self::Transport,
			"payload_too_large" => Self::PayloadTooLarge,
			"nested_components_unsupported" => Self::NestedComponentsUnsupported,
			"serialization" => Self::Serialization,
			_ => return None,
		})
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
