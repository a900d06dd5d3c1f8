//! Folds component tag tokens into render request trees.

use crate::tokenizer::{TagScanner, TagToken};
use reinhardt_islands_types::{ComponentReference, Props, RenderRequest, is_component_name};
use std::ops::Range;

/// A top-level component found in markup.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedIsland {
	/// The component and its nested components.
	pub request: RenderRequest,
	/// Byte range of the component in the scanned markup, from its open tag
	/// through its close tag.
	pub span: Range<usize>,
	/// Nesting depth of `request`; 0 for a component without nested ones.
	pub depth: usize,
}

/// Everything [`scan_components`] found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResult {
	/// Top-level components in source order.
	pub islands: Vec<ScannedIsland>,
	/// Largest [`ScannedIsland::depth`].
	pub max_depth: usize,
}

impl ScanResult {
	/// Whether no component was found.
	pub fn is_empty(&self) -> bool {
		self.islands.is_empty()
	}

	/// Number of top-level components.
	pub fn len(&self) -> usize {
		self.islands.len()
	}

	/// Number of components including nested ones.
	pub fn component_count(&self) -> usize {
		self.islands.iter().map(|i| i.request.component_count()).sum()
	}
}

struct Node {
	request: RenderRequest,
	span: Range<usize>,
}

struct Frame {
	name: String,
	props: Props,
	open_span: Range<usize>,
	children: Vec<Node>,
}

impl Frame {
	/// An unclosed frame becomes a leaf covering only its open tag; the
	/// components found inside it move up to its parent, after it.
	fn into_unclosed(self) -> Vec<Node> {
		tracing::debug!(component = %self.name, offset = self.open_span.start, "unclosed component tag treated as a leaf");
		let mut nodes = Vec::with_capacity(1 + self.children.len());
		nodes.push(Node {
			request: RenderRequest::new(ComponentReference::new(self.name), self.props),
			span: self.open_span,
		});
		nodes.extend(self.children);
		nodes
	}

	fn into_closed(self, close_end: usize) -> Node {
		let mut request = RenderRequest::new(ComponentReference::new(self.name), self.props);
		request.children = self.children.into_iter().map(|n| n.request).collect();
		Node {
			request,
			span: self.open_span.start..close_end,
		}
	}
}

#[derive(Default)]
struct TreeBuilder {
	stack: Vec<Frame>,
	roots: Vec<Node>,
}

impl TreeBuilder {
	fn attach(&mut self, node: Node) {
		match self.stack.last_mut() {
			Some(parent) => parent.children.push(node),
			None => self.roots.push(node),
		}
	}

	fn flatten_top(&mut self) {
		if let Some(frame) = self.stack.pop() {
			for node in frame.into_unclosed() {
				self.attach(node);
			}
		}
	}

	fn token(&mut self, token: TagToken) {
		match token {
			TagToken::Open {
				name,
				attributes,
				span,
				self_closing,
				malformed,
			} => {
				if !is_component_name(&name) {
					return;
				}
				let mut props = Props::new();
				for attribute in &attributes {
					props.insert(attribute.name.clone(), attribute.to_prop());
				}
				if self_closing || malformed {
					let request = RenderRequest::new(ComponentReference::new(name), props);
					self.attach(Node { request, span });
				} else {
					self.stack.push(Frame {
						name,
						props,
						open_span: span,
						children: Vec::new(),
					});
				}
			}
			TagToken::Close { name, span } => {
				if !is_component_name(&name) {
					return;
				}
				let Some(index) = self.stack.iter().rposition(|f| f.name == name) else {
					tracing::debug!(component = %name, offset = span.start, "ignoring stray close tag");
					return;
				};
				while self.stack.len() > index + 1 {
					self.flatten_top();
				}
				if let Some(frame) = self.stack.pop() {
					let node = frame.into_closed(span.end);
					self.attach(node);
				}
			}
		}
	}

	fn finish(mut self) -> ScanResult {
		while !self.stack.is_empty() {
			self.flatten_top();
		}
		let islands: Vec<ScannedIsland> = self
			.roots
			.into_iter()
			.map(|node| ScannedIsland {
				depth: node.request.depth(),
				request: node.request,
				span: node.span,
			})
			.collect();
		let max_depth = islands.iter().map(|i| i.depth).max().unwrap_or(0);
		ScanResult { islands, max_depth }
	}
}

/// Scans markup for component tags.
///
/// A component tag is any tag whose name starts with an uppercase letter,
/// optionally dotted (`<Forms.Input />`). Component tags enclosed by another
/// component's open and close tags become its children, in source order.
/// Other markup inside a component is not forwarded.
pub fn scan_components(markup: &str) -> ScanResult {
	let mut builder = TreeBuilder::default();
	for token in TagScanner::new(markup) {
		builder.token(token);
	}
	builder.finish()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn names(request: &RenderRequest) -> Vec<&str> {
		request.children.iter().map(|c| c.name()).collect()
	}

	#[rstest]
	fn test_flat_components() {
		// Arrange
		let markup = r#"<p>Hi</p><UserBadge fullName="Ada" /><Counter start={3}></Counter>"#;

		// Act
		let scan = scan_components(markup);

		// Assert
		assert_eq!(scan.len(), 2);
		assert_eq!(scan.max_depth, 0);
		assert_eq!(scan.islands[0].request.props["fullName"], json!("Ada"));
		assert_eq!(scan.islands[1].request.props["start"], json!(3));
		assert_eq!(&markup[scan.islands[1].span.clone()], "<Counter start={3}></Counter>");
	}

	#[rstest]
	fn test_two_nested_children_keep_source_order() {
		// Arrange
		let markup = r#"<Card title="T"><p>intro</p><Avatar size={48} /><Name value="Ada"></Name></Card>"#;

		// Act
		let scan = scan_components(markup);

		// Assert
		assert_eq!(scan.len(), 1);
		let card = &scan.islands[0];
		assert_eq!(card.request.children.len(), 2);
		assert_eq!(names(&card.request), vec!["Avatar", "Name"]);
		assert_eq!(card.request.children[0].props["size"], json!(48));
		assert_eq!(card.depth, 1);
		assert_eq!(card.span, 0..markup.len());
	}

	#[rstest]
	fn test_depth_is_reported() {
		let scan = scan_components("<A><B><C /></B></A><D />");
		assert_eq!(scan.max_depth, 2);
		assert_eq!(scan.islands[0].depth, 2);
		assert_eq!(scan.islands[1].depth, 0);
		assert_eq!(scan.component_count(), 4);
	}

	#[rstest]
	fn test_camel_case_attribute_names_are_verbatim() {
		let scan = scan_components(r#"<Profile userId={7} isAdmin data-x="y" />"#);
		let keys: Vec<&String> = scan.islands[0].request.props.keys().collect();
		assert_eq!(keys, vec!["userId", "isAdmin", "data-x"]);
		assert_eq!(scan.islands[0].request.props["isAdmin"], json!(true));
	}

	#[rstest]
	fn test_unclosed_container_becomes_leaf_and_children_move_up() {
		// Arrange
		let markup = "<Outer><Open a=\"1\"><Child /></Outer>";

		// Act
		let scan = scan_components(markup);

		// Assert
		let outer = &scan.islands[0].request;
		assert_eq!(names(outer), vec!["Open", "Child"]);
		assert!(outer.children[0].is_leaf());
		assert_eq!(outer.children[0].props["a"], json!(1));
	}

	#[rstest]
	fn test_unclosed_at_end_of_input() {
		let markup = "<Wrapper><Inner />";
		let scan = scan_components(markup);
		assert_eq!(scan.len(), 2);
		assert_eq!(&markup[scan.islands[0].span.clone()], "<Wrapper>");
		assert_eq!(&markup[scan.islands[1].span.clone()], "<Inner />");
	}

	#[rstest]
	fn test_malformed_tag_keeps_parsed_attributes() {
		// Arrange
		let markup = r#"<Chart kind="bar" data={[1,2 <Legend />"#;

		// Act
		let scan = scan_components(markup);

		// Assert
		assert_eq!(scan.len(), 2);
		let chart = &scan.islands[0].request;
		assert_eq!(chart.name(), "Chart");
		assert_eq!(chart.props.len(), 1);
		assert_eq!(chart.props["kind"], json!("bar"));
		assert_eq!(scan.islands[1].request.name(), "Legend");
	}

	#[rstest]
	fn test_stray_close_and_html_tags_are_ignored() {
		let scan = scan_components("</Ghost><div><span>x</span></div>");
		assert!(scan.is_empty());
		assert_eq!(scan.max_depth, 0);
	}

	#[rstest]
	fn test_islands_are_in_source_order() {
		let markup = "<A><B></A><C /><D></D>";
		let scan = scan_components(markup);
		let starts: Vec<usize> = scan.islands.iter().map(|i| i.span.start).collect();
		let mut sorted = starts.clone();
		sorted.sort_unstable();
		assert_eq!(starts, sorted);
	}

	#[rstest]
	fn test_dotted_names() {
		let scan = scan_components(r#"<Forms.Input name="q"></Forms.Input>"#);
		assert_eq!(scan.islands[0].request.name(), "Forms.Input");
		assert_eq!(scan.islands[0].request.children.len(), 0);
	}
}
