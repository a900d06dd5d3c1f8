//! JSON shapes exchanged with the SSR execution service.
//!
//! | Route | Request | Response |
//! |-------|---------|----------|
//! | `POST /render` | [`RenderSpec`] | [`RenderResponse`] or [`ErrorBody`] |
//! | `POST /render/batch` | [`BatchRequest`] | [`BatchResponse`] |
//! | `POST /render/tree` | [`TreeRequest`] | [`RenderResponse`] or [`ErrorBody`] |
//! | `POST /props/infer` | [`InferPropsRequest`] | [`InferPropsResponse`] |
//! | `GET /health` | - | [`HealthResponse`] |
//! | `POST /cache/clear` | - | `204 No Content` |

use crate::error::{ErrorKind, IslandError};
use crate::outcome::RenderOutcome;
use crate::request::Props;
use serde::{Deserialize, Serialize};

/// Path of the render-one route.
pub const RENDER_PATH: &str = "/render";
/// Path of the render-batch route.
pub const RENDER_BATCH_PATH: &str = "/render/batch";
/// Path of the render-tree route.
pub const RENDER_TREE_PATH: &str = "/render/tree";
/// Path of the props inference route.
pub const INFER_PROPS_PATH: &str = "/props/infer";
/// Path of the health route.
pub const HEALTH_PATH: &str = "/health";
/// Path of the bundle cache clearing route.
pub const CLEAR_CACHE_PATH: &str = "/cache/clear";

/// HTTP status used for component-level failures (resolution, compilation,
/// execution). Any other non-2xx status means the service itself failed.
pub const COMPONENT_ERROR_STATUS: u16 = 422;

/// One component to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSpec {
	/// Resolved source file of the component.
	pub component_path: String,
	/// Props passed to the component.
	#[serde(default)]
	pub props: Props,
	/// Full-page render: the response carries a client bundle reference.
	#[serde(default, skip_serializing_if = "std::ops::Not::not")]
	pub page: bool,
}

impl RenderSpec {
	/// Creates an island render spec.
	pub fn new(component_path: impl Into<String>, props: Props) -> Self {
		Self {
			component_path: component_path.into(),
			props,
			page: false,
		}
	}

	/// Marks this spec as a full-page render.
	pub fn for_page(mut self) -> Self {
		self.page = true;
		self
	}
}

/// Successful render response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
	/// Rendered HTML.
	pub html: String,
	/// Client bundle reference, only for full-page renders.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub bundle_key: Option<String>,
}

/// Error body. Every non-2xx response carries one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
	/// Human readable message.
	pub error: String,
	/// Machine readable kind, see [`ErrorKind::as_str`].
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kind: Option<String>,
	/// Stack trace, when the engine provides one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stack: Option<String>,
}

impl ErrorBody {
	/// Creates an error body with a kind.
	pub fn new(kind: ErrorKind, error: impl Into<String>) -> Self {
		Self {
			error: error.into(),
			kind: Some(kind.as_str().to_string()),
			stack: None,
		}
	}

	/// Parsed kind, defaulting to a render execution failure.
	pub fn error_kind(&self) -> ErrorKind {
		self.kind
			.as_deref()
			.and_then(ErrorKind::parse)
			.unwrap_or(ErrorKind::RenderExecution)
	}
}

impl From<&IslandError> for ErrorBody {
	fn from(err: &IslandError) -> Self {
		Self {
			error: err.detail(),
			kind: Some(err.kind().as_str().to_string()),
			stack: err.stack().map(str::to_string),
		}
	}
}

/// Batch render request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
	/// Components to render; results come back in the same order.
	pub specs: Vec<RenderSpec>,
}

/// One entry of a batch response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchResult {
	/// Rendered HTML.
	Html(RenderResponse),
	/// Failure for this entry only.
	Error(ErrorBody),
}

impl From<BatchResult> for RenderOutcome {
	fn from(result: BatchResult) -> Self {
		match result {
			BatchResult::Html(response) => response.into(),
			BatchResult::Error(body) => body.into(),
		}
	}
}

impl From<RenderOutcome> for BatchResult {
	fn from(outcome: RenderOutcome) -> Self {
		match outcome {
			RenderOutcome::Success { html, bundle_key } => {
				Self::Html(RenderResponse { html, bundle_key })
			}
			RenderOutcome::Error {
				kind,
				message,
				stack,
			} => Self::Error(ErrorBody {
				error: message,
				kind: Some(kind.as_str().to_string()),
				stack,
			}),
		}
	}
}

impl From<RenderResponse> for RenderOutcome {
	fn from(response: RenderResponse) -> Self {
		Self::Success {
			html: response.html,
			bundle_key: response.bundle_key,
		}
	}
}

impl From<ErrorBody> for RenderOutcome {
	fn from(body: ErrorBody) -> Self {
		Self::Error {
			kind: body.error_kind(),
			message: body.error,
			stack: body.stack,
		}
	}
}

/// Batch render response, 1:1 and in order with [`BatchRequest::specs`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
	/// Per-entry results.
	pub results: Vec<BatchResult>,
}

/// A node of a tree render request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
	/// Logical component name, used in error messages.
	pub component: String,
	/// Resolved source file of the component.
	pub component_path: String,
	/// Props passed to the component.
	#[serde(default)]
	pub props: Props,
	/// Nested components, passed to the parent as real child elements.
	#[serde(default)]
	pub children: Vec<TreeNode>,
}

impl TreeNode {
	/// Number of nodes in the tree.
	pub fn len(&self) -> usize {
		1 + self.children.iter().map(TreeNode::len).sum::<usize>()
	}

	/// Always `false`: a tree has at least its root.
	pub fn is_empty(&self) -> bool {
		false
	}
}

/// Tree render request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeRequest {
	/// Root of the tree.
	pub tree: TreeNode,
}

/// Props inference request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferPropsRequest {
	/// Component source text.
	pub source: String,
}

/// Props inference response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferPropsResponse {
	/// Prop names the component destructures.
	pub keys: Vec<String>,
}

/// Health response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
	/// Always `"ok"` when the service answers.
	pub status: String,
	/// Service version.
	pub version: String,
}
