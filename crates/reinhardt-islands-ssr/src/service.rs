//! Render operations behind the HTTP front end.
//!
//! Every render resolves its component files to bundle keys, compiles
//! them through the [`BundleCache`] and hands the element tree to the
//! [`ComponentEngine`]. Compilation and execution are blocking, so they
//! run on the blocking pool under the configured render timeout.

use crate::bundle::{BundleCache, BundleKey, BundleStatistics, label_for};
use crate::engine::{ComponentEngine, ElementSpec};
use crate::infer::infer_prop_keys;
use futures::future::join_all;
use reinhardt_islands_conf::{SsrEnvironment, SsrServerSettings};
use reinhardt_islands_types::wire::{HealthResponse, RenderSpec, TreeNode};
use reinhardt_islands_types::{IslandError, IslandResult, RenderOutcome};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// The SSR execution service.
#[derive(Clone)]
pub struct SsrService {
	bundles: Arc<BundleCache>,
	engine: Arc<dyn ComponentEngine>,
	environment: SsrEnvironment,
	max_payload_bytes: usize,
	render_timeout: Duration,
}

impl std::fmt::Debug for SsrService {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SsrService")
			.field("bundles", &self.bundles)
			.field("environment", &self.environment)
			.field("max_payload_bytes", &self.max_payload_bytes)
			.field("render_timeout", &self.render_timeout)
			.finish_non_exhaustive()
	}
}

impl SsrService {
	/// Creates a service over an existing bundle cache and engine.
	pub fn new(
		bundles: Arc<BundleCache>,
		engine: Arc<dyn ComponentEngine>,
		settings: &SsrServerSettings,
	) -> Self {
		Self {
			bundles,
			engine,
			environment: settings.environment,
			max_payload_bytes: settings.max_payload_bytes,
			render_timeout: settings.render_timeout(),
		}
	}

	/// The bundle cache.
	pub fn bundles(&self) -> &Arc<BundleCache> {
		&self.bundles
	}

	/// Largest accepted request body, in bytes.
	pub fn max_payload_bytes(&self) -> usize {
		self.max_payload_bytes
	}

	/// Rejects payloads above the configured limit.
	pub fn check_payload(&self, size: usize) -> IslandResult<()> {
		if size > self.max_payload_bytes {
			return Err(IslandError::PayloadTooLarge {
				size,
				limit: self.max_payload_bytes,
			});
		}
		Ok(())
	}

	/// Renders one component.
	///
	/// In page mode the outcome also carries the bundle fingerprint the
	/// client fetches to hydrate the page.
	pub async fn render_one(&self, spec: RenderSpec) -> RenderOutcome {
		let page = spec.page;
		let node = TreeNode {
			component: label_for(Path::new(&spec.component_path)),
			component_path: spec.component_path,
			props: spec.props,
			children: Vec::new(),
		};
		let component = node.component.clone();
		match self.execute(node).await {
			Ok((html, key)) => RenderOutcome::Success {
				html,
				bundle_key: page.then(|| key.fingerprint()),
			},
			Err(err) => failed(&component, err),
		}
	}

	/// Renders each spec independently. Results are in input order.
	pub async fn render_batch(&self, specs: Vec<RenderSpec>) -> Vec<RenderOutcome> {
		tracing::debug!(count = specs.len(), "rendering batch");
		join_all(specs.into_iter().map(|spec| self.render_one(spec))).await
	}

	/// Renders a component tree as one composition.
	pub async fn render_tree(&self, tree: TreeNode) -> RenderOutcome {
		tracing::debug!(component = %tree.component, components = tree.len(), "rendering tree");
		let component = tree.component.clone();
		match self.execute(tree).await {
			Ok((html, _)) => RenderOutcome::success(html),
			Err(err) => failed(&component, err),
		}
	}

	/// Prop names the default-exported component in `source` reads.
	pub fn infer_props(&self, source: &str) -> Vec<String> {
		infer_prop_keys(source)
	}

	/// Liveness report.
	pub fn health(&self) -> HealthResponse {
		HealthResponse {
			status: "ok".to_string(),
			version: env!("CARGO_PKG_VERSION").to_string(),
		}
	}

	/// Drops all compiled bundles and modules loaded into the engine.
	pub fn clear_caches(&self) -> usize {
		let cleared = self.bundles.clear();
		self.engine.reset();
		cleared
	}

	/// Bundle cache counters.
	pub fn statistics(&self) -> BundleStatistics {
		self.bundles.statistics()
	}

	async fn execute(&self, node: TreeNode) -> IslandResult<(String, BundleKey)> {
		let bundles = self.bundles.clone();
		let engine = self.engine.clone();
		let environment = self.environment;
		let component = node.component.clone();

		let task = tokio::task::spawn_blocking(move || {
			let element = build_element(&bundles, &node, environment)?;
			let key = element.artifact.key().clone();
			let html = engine.render(&element)?;
			Ok((html, key))
		});

		match tokio::time::timeout(self.render_timeout, task).await {
			Ok(Ok(result)) => result,
			Ok(Err(join)) => Err(IslandError::RenderExecution {
				component,
				message: format!("render task failed: {join}"),
				stack: None,
			}),
			Err(_) => Err(IslandError::Transport(format!(
				"render of {component} timed out after {} ms",
				self.render_timeout.as_millis()
			))),
		}
	}
}

fn build_element(
	bundles: &BundleCache,
	node: &TreeNode,
	environment: SsrEnvironment,
) -> IslandResult<ElementSpec> {
	let key = BundleKey::for_path(Path::new(&node.component_path), environment)?;
	let artifact = bundles.get_or_compile(&key)?;
	let children = node
		.children
		.iter()
		.map(|child| build_element(bundles, child, environment))
		.collect::<IslandResult<Vec<_>>>()?;
	let component = if node.component.is_empty() {
		label_for(&key.path)
	} else {
		node.component.clone()
	};
	Ok(ElementSpec {
		component,
		artifact,
		props: node.props.clone(),
		children,
	})
}

fn failed(component: &str, err: IslandError) -> RenderOutcome {
	tracing::warn!(component, kind = %err.kind(), error = %err, "render failed");
	err.into()
}
