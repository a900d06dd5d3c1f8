//! Render strategy selection.

use reinhardt_islands_conf::IslandsSettings;
use reinhardt_islands_scanner::ScanResult;
use std::fmt;

/// How components of a page are sent to the SSR service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderStrategy {
	/// The page has no components.
	NoIslands,
	/// One call per top-level component.
	Individual,
	/// All flat components in one call.
	Batch,
	/// A nested component and its children in one call.
	Tree,
}

impl RenderStrategy {
	/// Lowercase name for logs.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::NoIslands => "no_islands",
			Self::Individual => "individual",
			Self::Batch => "batch",
			Self::Tree => "tree",
		}
	}
}

impl fmt::Display for RenderStrategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Assignment of each top-level component (by index into
/// [`ScanResult::islands`]) to a strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderPlan {
	/// Flat components rendered together.
	pub batch: Vec<usize>,
	/// Nested components, one tree call each.
	pub tree: Vec<usize>,
	/// Flat components rendered one by one.
	pub individual: Vec<usize>,
	/// Nested components that cannot be rendered because tree rendering is
	/// off. Each gets a failure marker.
	pub unsupported: Vec<usize>,
}

impl RenderPlan {
	/// Assigns every island of `scan`.
	///
	/// Flat components go to the batch when batching is enabled, nested ones
	/// to a tree call when tree rendering is enabled; everything else is
	/// rendered individually.
	pub fn for_scan(scan: &ScanResult, settings: &IslandsSettings) -> Self {
		let mut plan = Self::default();
		for (index, island) in scan.islands.iter().enumerate() {
			match (island.depth, settings.batch_rendering, settings.tree_rendering) {
				(0, true, _) => plan.batch.push(index),
				(0, false, _) => plan.individual.push(index),
				(_, _, true) => plan.tree.push(index),
				(_, _, false) => plan.unsupported.push(index),
			}
		}
		plan
	}

	/// The dominant strategy of the page.
	pub fn strategy(&self) -> RenderStrategy {
		if !self.tree.is_empty() {
			RenderStrategy::Tree
		} else if !self.batch.is_empty() {
			RenderStrategy::Batch
		} else if !self.individual.is_empty() || !self.unsupported.is_empty() {
			RenderStrategy::Individual
		} else {
			RenderStrategy::NoIslands
		}
	}

	/// Strategy used for the island at `index`.
	pub fn strategy_for(&self, index: usize) -> RenderStrategy {
		if self.batch.contains(&index) {
			RenderStrategy::Batch
		} else if self.tree.contains(&index) {
			RenderStrategy::Tree
		} else if self.individual.contains(&index) || self.unsupported.contains(&index) {
			RenderStrategy::Individual
		} else {
			RenderStrategy::NoIslands
		}
	}
}
