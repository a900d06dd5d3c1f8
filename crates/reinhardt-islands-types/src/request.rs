//! Render requests reconstructed from scanned markup.

use crate::canonical::canonical_props;
use crate::reference::ComponentReference;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Props in source attribute order.
pub type Props = IndexMap<String, serde_json::Value>;

/// A component to render, together with the component tags nested inside it.
///
/// A request with no children is a leaf. Requests are built once per page
/// render by the tree builder and consumed by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
	/// The component to render.
	pub reference: ComponentReference,
	/// Props parsed from the tag's attributes.
	#[serde(default)]
	pub props: Props,
	/// Nested component tags, in source order.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub children: Vec<RenderRequest>,
}

impl RenderRequest {
	/// Creates a leaf request.
	pub fn new(reference: impl Into<ComponentReference>, props: Props) -> Self {
		Self {
			reference: reference.into(),
			props,
			children: Vec::new(),
		}
	}

	/// Adds a nested child request.
	pub fn with_child(mut self, child: RenderRequest) -> Self {
		self.children.push(child);
		self
	}

	/// Component name shortcut.
	pub fn name(&self) -> &str {
		self.reference.name()
	}

	/// Whether this request has no nested components.
	pub fn is_leaf(&self) -> bool {
		self.children.is_empty()
	}

	/// Nesting depth below this request. A leaf has depth 0.
	pub fn depth(&self) -> usize {
		self.children
			.iter()
			.map(|child| child.depth() + 1)
			.max()
			.unwrap_or(0)
	}

	/// Number of components in this tree, including the root.
	pub fn component_count(&self) -> usize {
		1 + self
			.children
			.iter()
			.map(RenderRequest::component_count)
			.sum::<usize>()
	}

	/// Visits every request in the tree, parents before children.
	pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a RenderRequest)) {
		visit(self);
		for child in &self.children {
			child.walk(visit);
		}
	}

	/// Canonical JSON of this request's own props.
	pub fn canonical_props(&self) -> String {
		canonical_props(&self.props)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn leaf(name: &str) -> RenderRequest {
		RenderRequest::new(name, Props::new())
	}

	#[rstest]
	fn test_leaf_depth_is_zero() {
		assert_eq!(leaf("Badge").depth(), 0);
		assert!(leaf("Badge").is_leaf());
	}

	#[rstest]
	fn test_nested_depth_and_count() {
		// Arrange
		let tree = leaf("Layout")
			.with_child(leaf("Sidebar").with_child(leaf("Link")))
			.with_child(leaf("Content"));

		// Act & Assert
		assert_eq!(tree.depth(), 2);
		assert_eq!(tree.component_count(), 4);
	}

	#[rstest]
	fn test_walk_visits_in_source_order() {
		let tree = leaf("A").with_child(leaf("B").with_child(leaf("C"))).with_child(leaf("D"));
		let mut names = Vec::new();
		tree.walk(&mut |request| names.push(request.name().to_string()));
		assert_eq!(names, vec!["A", "B", "C", "D"]);
	}

	#[rstest]
	fn test_serialized_leaf_omits_children() {
		let mut props = Props::new();
		props.insert("count".to_string(), json!(3));
		let value = serde_json::to_value(RenderRequest::new("Counter", props)).unwrap();
		assert_eq!(value, json!({"reference": "Counter", "props": {"count": 3}}));
	}
}
