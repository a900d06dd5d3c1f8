//! The render orchestrator.
//!
//! Turns a page of markup containing component tags into the final
//! response body:
//!
//! 1. scan the markup for component tags and their nesting
//! 2. serve what it can from the result cache
//! 3. plan the SSR calls (batch, tree or individual)
//! 4. run the calls concurrently, falling back to individual calls when a
//!    batch or tree call fails as a whole
//! 5. splice island markers (or failure markers) over the original tags
//!
//! A failing island never fails the page. Only complete renders are
//! cached: a nested island that fell back to its root alone is not.

use crate::client::{HttpSsrClient, SsrClient};
use crate::markup::{MarkerIds, error_markup, island_markup, page_markup};
use crate::resolver::{ComponentResolver, DirectoryResolver};
use crate::rewrite::splice;
use crate::strategy::{RenderPlan, RenderStrategy};
use futures::future::{BoxFuture, join_all};
use reinhardt_islands_cache::{CacheStatistics, ResultCache};
use reinhardt_islands_conf::IslandsSettings;
use reinhardt_islands_scanner::scan_components;
use reinhardt_islands_types::wire::{RenderSpec, TreeNode};
use reinhardt_islands_types::{
	ComponentReference, IslandError, IslandResult, Props, RenderOutcome, RenderRequest,
	canonical_props,
};
use std::fmt;
use std::sync::Arc;

/// Counters for one [`Orchestrator::render_islands`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
	/// Dominant strategy of the page.
	pub strategy: RenderStrategy,
	/// Top-level components found.
	pub islands: usize,
	/// Islands committed with HTML.
	pub rendered: usize,
	/// Islands committed with a failure marker.
	pub failed: usize,
	/// Islands served from the result cache.
	pub cache_hits: usize,
	/// Batch or tree calls that failed as a whole and were retried
	/// individually.
	pub fallbacks: usize,
	/// Deepest nesting found.
	pub max_depth: usize,
}

impl Default for RenderReport {
	fn default() -> Self {
		Self {
			strategy: RenderStrategy::NoIslands,
			islands: 0,
			rendered: 0,
			failed: 0,
			cache_hits: 0,
			fallbacks: 0,
			max_depth: 0,
		}
	}
}

/// Output of [`Orchestrator::render_islands`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRender {
	/// Rewritten markup.
	pub html: String,
	/// What happened.
	pub report: RenderReport,
}

/// A resolved island waiting for its SSR call.
#[derive(Clone)]
struct Job {
	index: usize,
	node: TreeNode,
}

impl Job {
	fn root_spec(&self) -> RenderSpec {
		RenderSpec::new(self.node.component_path.clone(), self.node.props.clone())
	}
}

type Rendered = (usize, IslandResult<String>);

/// Renders the islands of a page through the SSR service.
pub struct Orchestrator {
	settings: IslandsSettings,
	resolver: Arc<dyn ComponentResolver>,
	client: Arc<dyn SsrClient>,
	cache: ResultCache,
}

impl fmt::Debug for Orchestrator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Orchestrator")
			.field("settings", &self.settings)
			.field("cache", &self.cache)
			.finish_non_exhaustive()
	}
}

impl Orchestrator {
	/// Creates an orchestrator from its collaborators.
	pub fn new(
		settings: IslandsSettings,
		resolver: Arc<dyn ComponentResolver>,
		client: Arc<dyn SsrClient>,
		cache: ResultCache,
	) -> Self {
		Self {
			settings,
			resolver,
			client,
			cache,
		}
	}

	/// Creates an orchestrator with a directory resolver, an HTTP client and
	/// an in-memory result cache, all configured from `settings`.
	pub fn from_settings(settings: IslandsSettings) -> IslandResult<Self> {
		let resolver = Arc::new(DirectoryResolver::new(settings.components_dir.clone()));
		let client = Arc::new(HttpSsrClient::from_settings(&settings)?);
		let cache = ResultCache::in_memory(settings.cache_ttl());
		Ok(Self::new(settings, resolver, client, cache))
	}

	/// Current settings.
	pub fn settings(&self) -> &IslandsSettings {
		&self.settings
	}

	/// Empties the result cache.
	pub async fn clear_cache(&self) {
		self.cache.clear().await;
	}

	/// Result cache counters.
	pub async fn cache_statistics(&self) -> CacheStatistics {
		self.cache.statistics().await
	}

	/// Renders every component tag in `markup`.
	///
	/// Never fails: islands that cannot be rendered are replaced by failure
	/// markers and counted in the report.
	pub async fn render_islands(&self, markup: &str) -> PageRender {
		let scan = scan_components(markup);
		let mut report = RenderReport {
			islands: scan.len(),
			max_depth: scan.max_depth,
			..RenderReport::default()
		};
		if scan.is_empty() {
			return PageRender {
				html: markup.to_string(),
				report,
			};
		}
		if scan.max_depth > self.settings.nesting_depth_warning {
			tracing::warn!(
				max_depth = scan.max_depth,
				threshold = self.settings.nesting_depth_warning,
				"component nesting exceeds the warning depth"
			);
		}

		let plan = RenderPlan::for_scan(&scan, &self.settings);
		report.strategy = plan.strategy();
		tracing::debug!(
			strategy = %report.strategy,
			islands = scan.len(),
			components = scan.component_count(),
			"rendering islands"
		);

		let mut results: Vec<Option<IslandResult<String>>> = scan.islands.iter().map(|_| None).collect();
		let mut from_cache = vec![false; scan.len()];
		let mut partial = vec![false; scan.len()];
		for (index, island) in scan.islands.iter().enumerate() {
			if let Some(html) = self.cache.get(&island.request).await {
				results[index] = Some(Ok(html));
				from_cache[index] = true;
				report.cache_hits += 1;
			}
		}

		for &index in &plan.unsupported {
			if results[index].is_none() {
				let name = scan.islands[index].request.name().to_string();
				tracing::warn!(
					component = %name,
					"nested components found but tree rendering is disabled"
				);
				results[index] = Some(Err(IslandError::NestedComponentsUnsupported(name)));
			}
		}

		let mut prepare = |indices: &[usize]| -> Vec<Job> {
			let mut jobs = Vec::new();
			for &index in indices {
				if results[index].is_some() {
					continue;
				}
				match self.to_node(&scan.islands[index].request) {
					Ok(node) => jobs.push(Job { index, node }),
					Err(err) => results[index] = Some(Err(err)),
				}
			}
			jobs
		};
		let batch_jobs = prepare(&plan.batch[..]);
		let tree_jobs = prepare(&plan.tree[..]);
		let individual_jobs = prepare(&plan.individual[..]);

		let mut calls: Vec<BoxFuture<'_, (Vec<Rendered>, bool)>> = Vec::new();
		if !batch_jobs.is_empty() {
			calls.push(Box::pin(self.run_batch(batch_jobs)));
		}
		for job in tree_jobs {
			calls.push(Box::pin(self.run_tree(job)));
		}
		for job in individual_jobs {
			calls.push(Box::pin(async move { (vec![self.run_individual(job).await], false) }));
		}
		for (rendered, fell_back) in join_all(calls).await {
			if fell_back {
				report.fallbacks += 1;
			}
			for (index, result) in rendered {
				if fell_back && !scan.islands[index].request.children.is_empty() {
					partial[index] = true;
				}
				results[index] = Some(result);
			}
		}

		let mut ids = MarkerIds::islands();
		let mut replacements = Vec::with_capacity(scan.len());
		for (index, (island, result)) in scan.islands.iter().zip(results).enumerate() {
			let name = island.request.name();
			let id = ids.next_id();
			let result = result.unwrap_or_else(|| {
				Err(IslandError::Transport(format!("{name} was not rendered")))
			});
			let marker = match result {
				Ok(html) => {
					if partial[index] {
						tracing::debug!(component = name, "not caching render without children");
					} else if !from_cache[index] {
						self.cache.put(&island.request, &html).await;
					}
					report.rendered += 1;
					island_markup(&id, name, &html, &island.request.canonical_props())
				}
				Err(err) => {
					tracing::warn!(component = name, kind = %err.kind(), error = %err, "island failed to render");
					report.failed += 1;
					error_markup(&id, name, &err, self.settings.error_display)
				}
			};
			replacements.push((island.span.clone(), marker));
		}

		PageRender {
			html: splice(markup, replacements),
			report,
		}
	}

	/// Renders `component` as a full page.
	///
	/// Unlike islands, failure is returned to the caller: there is no page
	/// left to degrade into.
	pub async fn render_page(&self, component: &str, props: Props) -> IslandResult<String> {
		let reference = ComponentReference::parse(component)
			.ok_or_else(|| IslandError::ComponentResolution(component.to_string()))?;
		let path = self.resolver.resolve(&reference)?;
		let props_json = canonical_props(&props);
		let spec = RenderSpec::new(path.display().to_string(), props).for_page();

		let (html, bundle_key) = self.client.render(spec).await?.into_result(component)?;
		let id = MarkerIds::pages().next_id();
		Ok(page_markup(
			&id,
			component,
			&html,
			&props_json,
			bundle_key.as_deref(),
			&self.settings.bundle_url_prefix,
		))
	}

	fn to_node(&self, request: &RenderRequest) -> IslandResult<TreeNode> {
		let path = self.resolver.resolve(&request.reference)?;
		let children = request
			.children
			.iter()
			.map(|child| self.to_node(child))
			.collect::<IslandResult<Vec<_>>>()?;
		Ok(TreeNode {
			component: request.name().to_string(),
			component_path: path.display().to_string(),
			props: request.props.clone(),
			children,
		})
	}

	async fn run_batch(&self, jobs: Vec<Job>) -> (Vec<Rendered>, bool) {
		let specs = jobs.iter().map(Job::root_spec).collect();
		match self.client.render_batch(specs).await {
			Ok(outcomes) if outcomes.len() == jobs.len() => {
				let rendered = jobs
					.iter()
					.zip(outcomes)
					.map(|(job, outcome)| (job.index, html_of(outcome, &job.node.component)))
					.collect();
				(rendered, false)
			}
			Ok(outcomes) => {
				tracing::warn!(
					expected = jobs.len(),
					received = outcomes.len(),
					"batch response does not match request, falling back to individual renders"
				);
				(self.run_each(jobs).await, true)
			}
			Err(err) => {
				tracing::warn!(
					components = jobs.len(),
					error = %err,
					"batch render failed, falling back to individual renders"
				);
				(self.run_each(jobs).await, true)
			}
		}
	}

	async fn run_tree(&self, job: Job) -> (Vec<Rendered>, bool) {
		match self.client.render_tree(job.node.clone()).await {
			Ok(outcome) => (vec![(job.index, html_of(outcome, &job.node.component))], false),
			Err(err) => {
				tracing::warn!(
					component = %job.node.component,
					omitted_children = job.node.len().saturating_sub(1),
					error = %err,
					"tree render failed, falling back to rendering the root component alone"
				);
				(vec![self.run_individual(job).await], true)
			}
		}
	}

	async fn run_each(&self, jobs: Vec<Job>) -> Vec<Rendered> {
		join_all(jobs.into_iter().map(|job| self.run_individual(job))).await
	}

	async fn run_individual(&self, job: Job) -> Rendered {
		let result = match self.client.render(job.root_spec()).await {
			Ok(outcome) => html_of(outcome, &job.node.component),
			Err(err) => Err(err),
		};
		(job.index, result)
	}
}

fn html_of(outcome: RenderOutcome, component: &str) -> IslandResult<String> {
	outcome.into_result(component).map(|(html, _)| html)
}
