//! Source file to HTML through the real compiler and script engine.
#![cfg(feature = "js-runtime")]

use reinhardt_islands_conf::SsrServerSettings;
use reinhardt_islands_ssr::{BundleCache, ModuleCompiler, ScriptEngine, SsrService};
use reinhardt_islands_types::wire::{RenderSpec, TreeNode};
use reinhardt_islands_types::{ErrorKind, Props, RenderOutcome};
use rstest::{fixture, rstest};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

struct Pipeline {
	sources: TempDir,
	_artifacts: TempDir,
	service: SsrService,
}

impl Pipeline {
	fn component(&self, name: &str, source: &str) -> String {
		let path = self.sources.path().join(format!("{name}.jsx"));
		std::fs::write(&path, source).unwrap();
		path.display().to_string()
	}
}

#[fixture]
fn pipeline() -> Pipeline {
	let sources = tempfile::tempdir().unwrap();
	let artifacts = tempfile::tempdir().unwrap();
	let settings = SsrServerSettings::default().with_artifact_dir(artifacts.path());
	let bundles = Arc::new(BundleCache::from_settings(Arc::new(ModuleCompiler::new()), &settings));
	let engine = ScriptEngine::with_workers(2).unwrap();
	Pipeline {
		sources,
		_artifacts: artifacts,
		service: SsrService::new(bundles, Arc::new(engine), &settings),
	}
}

fn props(value: serde_json::Value) -> Props {
	serde_json::from_value(value).unwrap()
}

#[rstest]
#[tokio::test]
async fn test_user_badge(pipeline: Pipeline) {
	// Arrange
	let path = pipeline.component(
		"UserBadge",
		r#"import { h } from "preact";

export default function UserBadge({ fullName }) {
	const initials = fullName.split(" ").map((part) => part[0]).join("");
	return (
		<span className="badge" title={fullName}>
			{initials}
		</span>
	);
}
"#,
	);

	// Act
	let outcome = pipeline
		.service
		.render_one(RenderSpec::new(path, props(json!({"fullName": "Ada Lovelace"}))))
		.await;

	// Assert
	assert_eq!(
		outcome,
		RenderOutcome::success(r#"<span class="badge" title="Ada Lovelace">AL</span>"#)
	);
}

#[rstest]
#[tokio::test]
async fn test_tree_children_are_elements(pipeline: Pipeline) {
	let list = pipeline.component(
		"List",
		"export default function List({ title, children }) {\n\treturn <section><h3>{title}</h3><ul>{children}</ul></section>;\n}\n",
	);
	let item = pipeline.component(
		"Item",
		"export default function Item({ label }) {\n\treturn <li>{label}</li>;\n}\n",
	);
	let leaf = |label: &str| TreeNode {
		component: "Item".into(),
		component_path: item.clone(),
		props: props(json!({"label": label})),
		children: Vec::new(),
	};
	let tree = TreeNode {
		component: "List".into(),
		component_path: list,
		props: props(json!({"title": "Todo"})),
		children: vec![leaf("write"), leaf("<test>")],
	};

	let outcome = pipeline.service.render_tree(tree).await;

	assert_eq!(
		outcome.html(),
		Some("<section><h3>Todo</h3><ul><li>write</li><li>&lt;test&gt;</li></ul></section>")
	);
}

#[rstest]
#[tokio::test]
async fn test_unsupported_import_is_compilation_error(pipeline: Pipeline) {
	let path = pipeline.component(
		"Chart",
		"import { plot } from \"./plot\";\nexport default function Chart() { return <div />; }\n",
	);

	let outcome = pipeline.service.render_one(RenderSpec::new(path, Props::new())).await;

	assert_eq!(outcome.error_kind(), Some(ErrorKind::Compilation));
}

#[rstest]
#[tokio::test]
async fn test_recompiles_after_source_change(pipeline: Pipeline) {
	// Arrange
	let path = pipeline.component("Greeting", "export default () => <p>one</p>;\n");
	let first = pipeline.service.render_one(RenderSpec::new(path.clone(), Props::new())).await;
	let original = std::fs::metadata(&path).unwrap().modified().unwrap();

	// Act
	pipeline.component("Greeting", "export default () => <p>two</p>;\n");
	let file = std::fs::File::options().write(true).open(&path).unwrap();
	file.set_modified(original + std::time::Duration::from_secs(5)).unwrap();
	let second = pipeline.service.render_one(RenderSpec::new(path, Props::new())).await;

	// Assert
	assert_eq!(first.html(), Some("<p>one</p>"));
	assert_eq!(second.html(), Some("<p>two</p>"));
}
