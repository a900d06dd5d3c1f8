//! Component execution.
//!
//! An engine receives a tree of compiled components with their props and
//! returns the rendered HTML. The service never inspects component code
//! itself; everything it knows about a component is in [`ElementSpec`].

#[cfg(feature = "js-runtime")]
mod script;

#[cfg(feature = "js-runtime")]
pub use script::{PREACT_BUNDLES, ScriptEngine, UiRuntime, default_workers};

use crate::bundle::CompiledArtifact;
use reinhardt_islands_types::{IslandResult, Props};
use serde_json::{Value, json};
use std::sync::Arc;

/// One component to render, with its already-rendered-as-elements children.
#[derive(Debug, Clone)]
pub struct ElementSpec {
	/// Name used in error reports.
	pub component: String,
	/// Compiled module whose export is the component.
	pub artifact: Arc<CompiledArtifact>,
	/// Props passed to the component.
	pub props: Props,
	/// Elements passed as `children`, in order.
	pub children: Vec<ElementSpec>,
}

impl ElementSpec {
	/// Creates a leaf element.
	pub fn new(component: impl Into<String>, artifact: Arc<CompiledArtifact>, props: Props) -> Self {
		Self {
			component: component.into(),
			artifact,
			props,
			children: Vec::new(),
		}
	}

	/// Appends a child element.
	pub fn with_child(mut self, child: ElementSpec) -> Self {
		self.children.push(child);
		self
	}

	/// Visits this element and all descendants, parents first.
	pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ElementSpec)) {
		visit(self);
		for child in &self.children {
			child.walk(visit);
		}
	}

	/// Compact JSON form consumed by the script runtime: module id, name,
	/// props and children.
	pub fn to_script_value(&self) -> Value {
		json!({
			"m": self.artifact.id(),
			"n": self.component,
			"p": self.props,
			"c": self.children.iter().map(Self::to_script_value).collect::<Vec<_>>(),
		})
	}
}

/// Executes compiled components.
pub trait ComponentEngine: Send + Sync {
	/// Renders `element` (and its children) to HTML.
	///
	/// Exceptions thrown by component code are reported as
	/// [`IslandError::RenderExecution`](reinhardt_islands_types::IslandError::RenderExecution);
	/// code that fails to load is reported as
	/// [`IslandError::Compilation`](reinhardt_islands_types::IslandError::Compilation).
	fn render(&self, element: &ElementSpec) -> IslandResult<String>;

	/// Forgets loaded modules. Called when caches are cleared.
	fn reset(&self) {}
}
