//! Orchestrator behavior against a scripted SSR client.

use async_trait::async_trait;
use parking_lot::Mutex;
use reinhardt_islands_cache::ResultCache;
use reinhardt_islands_conf::{ErrorDisplay, IslandsSettings};
use reinhardt_islands_render::{ComponentResolver, Orchestrator, RenderStrategy, SsrClient};
use reinhardt_islands_types::wire::{RenderSpec, TreeNode};
use reinhardt_islands_types::{
	ComponentReference, ErrorKind, IslandError, IslandResult, Props, RenderOutcome, canonical_props,
};
use rstest::rstest;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
	One(String),
	Batch(Vec<String>),
	Tree(String),
}

/// Renders `<p>Name:{props}[children]</p>`.
#[derive(Default)]
struct ScriptedClient {
	calls: Mutex<Vec<Call>>,
	fail_batch: bool,
	fail_tree: bool,
	/// Tree calls that fail before the tree endpoint recovers.
	tree_failures: AtomicUsize,
	unreachable: bool,
	failing: Vec<&'static str>,
}

impl ScriptedClient {
	fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	fn count(&self, call: &Call) -> usize {
		self.calls.lock().iter().filter(|c| *c == call).count()
	}

	fn name(path: &str) -> String {
		Path::new(path)
			.file_stem()
			.map(|s| s.to_string_lossy().into_owned())
			.unwrap_or_default()
	}

	fn render_node(&self, name: &str, props: &Props, children: &[TreeNode]) -> RenderOutcome {
		if self.failing.contains(&name) {
			return RenderOutcome::Error {
				kind: ErrorKind::RenderExecution,
				message: format!("{name} exploded"),
				stack: None,
			};
		}
		let mut inner = String::new();
		for child in children {
			match self.render_node(&Self::name(&child.component_path), &child.props, &child.children) {
				RenderOutcome::Success { html, .. } => inner.push_str(&html),
				error => return error,
			}
		}
		let children = if children.is_empty() {
			String::new()
		} else {
			format!("[{inner}]")
		};
		RenderOutcome::success(format!("<p>{name}:{}{children}</p>", canonical_props(props)))
	}

	fn check_reachable(&self) -> IslandResult<()> {
		if self.unreachable {
			return Err(IslandError::Transport("connection refused".into()));
		}
		Ok(())
	}
}

#[async_trait]
impl SsrClient for ScriptedClient {
	async fn render(&self, spec: RenderSpec) -> IslandResult<RenderOutcome> {
		let name = Self::name(&spec.component_path);
		self.calls.lock().push(Call::One(name.clone()));
		self.check_reachable()?;
		let outcome = self.render_node(&name, &spec.props, &[]);
		Ok(match outcome {
			RenderOutcome::Success { html, .. } if spec.page => RenderOutcome::Success {
				html,
				bundle_key: Some("feedbeef".into()),
			},
			other => other,
		})
	}

	async fn render_batch(&self, specs: Vec<RenderSpec>) -> IslandResult<Vec<RenderOutcome>> {
		let names: Vec<String> = specs.iter().map(|s| Self::name(&s.component_path)).collect();
		self.calls.lock().push(Call::Batch(names.clone()));
		self.check_reachable()?;
		if self.fail_batch {
			return Err(IslandError::Transport("batch endpoint returned 500".into()));
		}
		Ok(specs
			.iter()
			.zip(&names)
			.map(|(spec, name)| self.render_node(name, &spec.props, &[]))
			.collect())
	}

	async fn render_tree(&self, tree: TreeNode) -> IslandResult<RenderOutcome> {
		self.calls.lock().push(Call::Tree(tree.component.clone()));
		self.check_reachable()?;
		if self.fail_tree {
			return Err(IslandError::Transport("tree render timed out".into()));
		}
		let remaining = self.tree_failures.load(Ordering::SeqCst);
		if remaining > 0 {
			self.tree_failures.store(remaining - 1, Ordering::SeqCst);
			return Err(IslandError::Transport("SSR service returned 504 Gateway Timeout".into()));
		}
		Ok(self.render_node(&tree.component, &tree.props, &tree.children))
	}
}

/// Maps every name to `/components/<Name>.jsx`; names starting with
/// `Missing` do not resolve.
struct StaticResolver;

impl ComponentResolver for StaticResolver {
	fn resolve(&self, reference: &ComponentReference) -> IslandResult<PathBuf> {
		if reference.name().starts_with("Missing") {
			return Err(IslandError::ComponentResolution(reference.to_string()));
		}
		Ok(PathBuf::from(format!("/components/{}.jsx", reference.name())))
	}
}

fn orchestrator(client: Arc<ScriptedClient>, settings: IslandsSettings) -> Orchestrator {
	let cache = ResultCache::in_memory(settings.cache_ttl());
	Orchestrator::new(settings, Arc::new(StaticResolver), client, cache)
}

fn island(id: usize, name: &str, html: &str, props: &str) -> String {
	format!(
		r#"<div data-rh-island data-rh-id="rh-island-{id}" data-rh-component="{name}">{html}</div><script type="application/json" data-rh-props-for="rh-island-{id}">{props}</script>"#
	)
}

#[rstest]
#[tokio::test]
async fn test_markup_without_components_is_untouched() {
	let client = Arc::new(ScriptedClient::default());
	let orchestrator = orchestrator(client.clone(), IslandsSettings::default());
	let markup = "<main><p>Hello</p><div>static</div></main>";

	let page = orchestrator.render_islands(markup).await;

	assert_eq!(page.html, markup);
	assert_eq!(page.report.strategy, RenderStrategy::NoIslands);
	assert!(client.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_flat_page_renders_in_one_batch() {
	// Arrange
	let client = Arc::new(ScriptedClient::default());
	let orchestrator = orchestrator(client.clone(), IslandsSettings::default());

	// Act
	let page = orchestrator
		.render_islands(r#"<main><A /><hr><B x="1" /></main>"#)
		.await;

	// Assert
	assert_eq!(client.calls(), [Call::Batch(vec!["A".into(), "B".into()])]);
	assert_eq!(
		page.html,
		format!(
			"<main>{}<hr>{}</main>",
			island(1, "A", "<p>A:{}</p>", "{}"),
			island(2, "B", r#"<p>B:{"x":1}</p>"#, r#"{"x":1}"#)
		)
	);
	assert_eq!(page.report.strategy, RenderStrategy::Batch);
	assert_eq!(page.report.rendered, 2);
}

#[rstest]
#[tokio::test]
async fn test_batch_failure_falls_back_to_one_call_per_component() {
	// Arrange
	let client = Arc::new(ScriptedClient {
		fail_batch: true,
		..Default::default()
	});
	let orchestrator = orchestrator(client.clone(), IslandsSettings::default());

	// Act
	let page = orchestrator
		.render_islands("<A /><B /><C />")
		.await;

	// Assert
	let calls = client.calls();
	assert_eq!(calls.len(), 4);
	assert_eq!(calls[0], Call::Batch(vec!["A".into(), "B".into(), "C".into()]));
	for name in ["A", "B", "C"] {
		assert_eq!(client.count(&Call::One(name.into())), 1);
	}
	assert_eq!(page.report.fallbacks, 1);
	assert_eq!(page.report.rendered, 3);
	assert!(page.html.contains("<p>C:{}</p>"));
}

#[rstest]
#[tokio::test]
async fn test_failing_island_does_not_fail_the_page() {
	// Arrange
	let client = Arc::new(ScriptedClient {
		failing: vec!["Broken"],
		..Default::default()
	});
	let settings = IslandsSettings::default().with_error_display(ErrorDisplay::Production);
	let orchestrator = orchestrator(client, settings);

	// Act
	let page = orchestrator.render_islands("<Ok /><Broken />").await;

	// Assert
	assert!(page.html.starts_with(&island(1, "Ok", "<p>Ok:{}</p>", "{}")));
	assert!(page.html.ends_with(
		r#"<div data-rh-island-error="render_execution" data-rh-id="rh-island-2" data-rh-component="Broken" hidden></div>"#
	));
	assert_eq!((page.report.rendered, page.report.failed), (1, 1));
}

#[rstest]
#[tokio::test]
async fn test_development_overlay_shows_message() {
	let client = Arc::new(ScriptedClient {
		failing: vec!["Broken"],
		..Default::default()
	});
	let orchestrator = orchestrator(client, IslandsSettings::default());

	let page = orchestrator.render_islands("<Broken />").await;

	assert!(page.html.contains("Broken exploded"));
	assert!(page.html.contains(r#"data-rh-island-error="render_execution""#));
}

#[rstest]
#[tokio::test]
async fn test_nested_components_render_as_one_tree() {
	// Arrange
	let client = Arc::new(ScriptedClient::default());
	let orchestrator = orchestrator(client.clone(), IslandsSettings::default());
	let markup = r#"<Card title="Team"><Badge n={1} /><span>static</span><Badge n={2} /></Card><Footer />"#;

	// Act
	let page = orchestrator.render_islands(markup).await;

	// Assert
	let calls = client.calls();
	assert_eq!(calls.len(), 2);
	assert!(calls.contains(&Call::Tree("Card".into())));
	assert!(calls.contains(&Call::Batch(vec!["Footer".into()])));
	assert!(page.html.starts_with(&island(
		1,
		"Card",
		r#"<p>Card:{"title":"Team"}[<p>Badge:{"n":1}</p><p>Badge:{"n":2}</p>]</p>"#,
		r#"{"title":"Team"}"#
	)));
	assert_eq!(page.report.strategy, RenderStrategy::Tree);
	assert_eq!(page.report.max_depth, 1);
}

#[rstest]
#[tokio::test]
async fn test_tree_failure_renders_root_alone() {
	let client = Arc::new(ScriptedClient {
		fail_tree: true,
		..Default::default()
	});
	let orchestrator = orchestrator(client.clone(), IslandsSettings::default());

	let page = orchestrator
		.render_islands(r#"<Card title="x"><Badge /></Card>"#)
		.await;

	assert_eq!(
		client.calls(),
		[Call::Tree("Card".into()), Call::One("Card".into())]
	);
	assert!(page.html.contains(r#"<p>Card:{"title":"x"}</p>"#));
	assert_eq!(page.report.fallbacks, 1);
}

#[rstest]
#[tokio::test]
async fn test_tree_fallback_is_not_cached() {
	// Arrange
	let client = Arc::new(ScriptedClient {
		tree_failures: AtomicUsize::new(1),
		..Default::default()
	});
	let settings = IslandsSettings::default().with_cache_ttl_secs(Some(60));
	let orchestrator = orchestrator(client.clone(), settings);
	let markup = "<Card><Badge /></Card>";

	// Act
	let degraded = orchestrator.render_islands(markup).await;
	let recovered = orchestrator.render_islands(markup).await;
	let cached = orchestrator.render_islands(markup).await;

	// Assert
	assert!(degraded.html.contains("<p>Card:{}</p>"));
	assert_eq!(degraded.report.fallbacks, 1);
	assert_eq!(recovered.report.cache_hits, 0);
	assert!(recovered.html.contains("<p>Card:{}[<p>Badge:{}</p>]</p>"));
	assert_eq!(client.count(&Call::Tree("Card".into())), 2);
	assert_eq!(cached.report.cache_hits, 1);
	assert_eq!(cached.html, recovered.html);
}

#[rstest]
#[tokio::test]
async fn test_batch_fallback_results_are_cached() {
	// Arrange
	let client = Arc::new(ScriptedClient {
		fail_batch: true,
		..Default::default()
	});
	let settings = IslandsSettings::default().with_cache_ttl_secs(Some(60));
	let orchestrator = orchestrator(client.clone(), settings);

	// Act
	orchestrator.render_islands("<A /><B />").await;
	let second = orchestrator.render_islands("<A /><B />").await;

	// Assert
	assert_eq!(second.report.cache_hits, 2);
	assert_eq!(client.count(&Call::Batch(vec!["A".into(), "B".into()])), 1);
}

#[rstest]
#[tokio::test]
async fn test_individual_mode_flags_nested_components() {
	// Arrange
	let client = Arc::new(ScriptedClient::default());
	let settings = IslandsSettings::default()
		.with_batch_rendering(false)
		.with_tree_rendering(false);
	let orchestrator = orchestrator(client.clone(), settings);

	// Act
	let page = orchestrator
		.render_islands("<Card><Badge /></Card><A /><B />")
		.await;

	// Assert
	assert_eq!(client.calls(), [Call::One("A".into()), Call::One("B".into())]);
	assert!(page.html.contains(r#"data-rh-island-error="nested_components_unsupported""#));
	assert_eq!(page.report.strategy, RenderStrategy::Individual);
	assert_eq!((page.report.rendered, page.report.failed), (2, 1));
}

#[rstest]
#[tokio::test]
async fn test_unresolvable_component_is_marked_without_a_call() {
	let client = Arc::new(ScriptedClient::default());
	let orchestrator = orchestrator(client.clone(), IslandsSettings::default());

	let page = orchestrator.render_islands("<MissingThing /><A />").await;

	assert_eq!(client.calls(), [Call::Batch(vec!["A".into()])]);
	assert!(page.html.contains(r#"data-rh-island-error="component_resolution""#));
}

#[rstest]
#[tokio::test]
async fn test_unreachable_service_degrades_every_island() {
	let client = Arc::new(ScriptedClient {
		unreachable: true,
		..Default::default()
	});
	let orchestrator = orchestrator(client.clone(), IslandsSettings::default());

	let page = orchestrator.render_islands("<p>before</p><A /><B /><p>after</p>").await;

	assert!(page.html.starts_with("<p>before</p>"));
	assert!(page.html.ends_with("<p>after</p>"));
	assert_eq!(page.html.matches(r#"data-rh-island-error="transport""#).count(), 2);
	assert_eq!(page.report.failed, 2);
}

#[rstest]
#[tokio::test]
async fn test_user_badge_result_cache() {
	// Arrange
	let client = Arc::new(ScriptedClient::default());
	let settings = IslandsSettings::default().with_cache_ttl_secs(Some(60));
	let orchestrator = orchestrator(client.clone(), settings);
	let ada = Call::Batch(vec!["UserBadge".into()]);

	// Act
	let first = orchestrator.render_islands(r#"<UserBadge fullName="Ada" />"#).await;
	let second = orchestrator.render_islands(r#"<UserBadge fullName={"Ada"} />"#).await;
	let calls_after_ada = client.calls().len();
	let grace = orchestrator.render_islands(r#"<UserBadge fullName="Grace" />"#).await;

	// Assert
	assert_eq!(first.html, second.html);
	assert_eq!(second.report.cache_hits, 1);
	assert_eq!(calls_after_ada, 1);
	assert_eq!(client.count(&ada), 2);
	assert_eq!(grace.report.cache_hits, 0);
	assert!(grace.html.contains("Grace"));
	let stats = orchestrator.cache_statistics().await;
	assert_eq!((stats.hits, stats.misses), (1, 2));
}

#[rstest]
#[tokio::test]
async fn test_cache_key_ignores_attribute_order() {
	let client = Arc::new(ScriptedClient::default());
	let settings = IslandsSettings::default().with_cache_ttl_secs(Some(60));
	let orchestrator = orchestrator(client.clone(), settings);

	orchestrator.render_islands(r#"<Chart a="1" b="2" />"#).await;
	let page = orchestrator.render_islands(r#"<Chart b="2" a="1" />"#).await;

	assert_eq!(page.report.cache_hits, 1);
	assert_eq!(client.calls().len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_cache_disabled_without_ttl() {
	let client = Arc::new(ScriptedClient::default());
	let orchestrator = orchestrator(client.clone(), IslandsSettings::default());

	orchestrator.render_islands("<A />").await;
	orchestrator.render_islands("<A />").await;

	assert_eq!(client.calls().len(), 2);
}

#[rstest]
#[tokio::test]
async fn test_clear_cache_forces_rerender() {
	let client = Arc::new(ScriptedClient::default());
	let settings = IslandsSettings::default().with_cache_ttl_secs(Some(60));
	let orchestrator = orchestrator(client.clone(), settings);

	orchestrator.render_islands("<A />").await;
	orchestrator.clear_cache().await;
	orchestrator.render_islands("<A />").await;

	assert_eq!(client.calls().len(), 2);
}

#[rstest]
#[tokio::test]
async fn test_render_page_marks_root_and_bundle() {
	// Arrange
	let client = Arc::new(ScriptedClient::default());
	let orchestrator = orchestrator(client.clone(), IslandsSettings::default());
	let props: Props = serde_json::from_value(json!({"user": "Ada"})).unwrap();

	// Act
	let html = orchestrator.render_page("Dashboard", props).await.unwrap();

	// Assert
	assert_eq!(
		html,
		r#"<div data-rh-page="rh-page-1" data-rh-component="Dashboard" data-rh-bundle="feedbeef"><p>Dashboard:{"user":"Ada"}</p></div><script type="application/json" data-rh-props-for="rh-page-1">{"user":"Ada"}</script><script type="module" src="/islands/bundles/feedbeef.js"></script>"#
	);
	assert_eq!(client.calls(), [Call::One("Dashboard".into())]);
}

#[rstest]
#[case::render_error(vec!["Dashboard"], false, ErrorKind::RenderExecution)]
#[case::transport(vec![], true, ErrorKind::Transport)]
#[tokio::test]
async fn test_render_page_propagates_failure(
	#[case] failing: Vec<&'static str>,
	#[case] unreachable: bool,
	#[case] kind: ErrorKind,
) {
	let client = Arc::new(ScriptedClient {
		failing,
		unreachable,
		..Default::default()
	});
	let orchestrator = orchestrator(client, IslandsSettings::default());

	let err = orchestrator.render_page("Dashboard", Props::new()).await.unwrap_err();

	assert_eq!(err.kind(), kind);
}

#[rstest]
#[tokio::test]
async fn test_render_page_rejects_invalid_name() {
	let orchestrator = orchestrator(Arc::new(ScriptedClient::default()), IslandsSettings::default());

	let err = orchestrator.render_page("not-a-component", Props::new()).await.unwrap_err();

	assert_eq!(err.kind(), ErrorKind::ComponentResolution);
}

#[rstest]
#[tokio::test]
async fn test_concurrent_pages_share_the_cache() {
	let client = Arc::new(ScriptedClient::default());
	let settings = IslandsSettings::default().with_cache_ttl_secs(Some(60));
	let orchestrator = Arc::new(orchestrator(client.clone(), settings));
	orchestrator.render_islands("<A />").await;

	let pages = render_concurrently(orchestrator.clone()).await;

	assert!(pages.iter().all(|p| p.report.cache_hits == 1));
	assert_eq!(client.calls().len(), 1);
}

async fn render_concurrently(orchestrator: Arc<Orchestrator>) -> Vec<reinhardt_islands_render::PageRender> {
	let mut handles = Vec::new();
	for _ in 0..4 {
		let orchestrator = orchestrator.clone();
		handles.push(tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(1)).await;
			orchestrator.render_islands("<A />").await
		}));
	}
	let mut pages = Vec::new();
	for handle in handles {
		pages.push(handle.await.unwrap());
	}
	pages
}
