use super::{ComponentCompiler, source_type_for};
use crate::bundle::label_for;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
	Declaration, ExportDefaultDeclarationKind, ImportDeclaration, ImportDeclarationSpecifier,
	Program, Statement,
};
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::{GetSpan, SourceType, Span};
use oxc_transformer::{JsxOptions, JsxRuntime, TransformOptions, Transformer};
use reinhardt_islands_types::{IslandError, IslandResult};
use std::path::Path;

/// Modules provided by the rendering runtime instead of being bundled.
///
/// Imports of these resolve through `__islands.require`, so every
/// component uses the same framework instance.
pub const FRAMEWORK_MODULES: &[&str] = &[
	"react",
	"react-dom",
	"react-dom/server",
	"react/jsx-runtime",
	"preact",
	"preact/hooks",
	"preact/compat",
	"preact/jsx-runtime",
	"preact-render-to-string",
];

/// Element factory compiled JSX calls.
pub const JSX_PRAGMA: &str = "__islands.h";

/// Fragment type compiled JSX refers to.
pub const FRAGMENT_PRAGMA: &str = "__islands.Fragment";

const RUNTIME_REQUIRE: &str = "__islands.require";
const DEFAULT_BINDING: &str = "__default";
const STYLESHEET_EXTENSIONS: &[&str] = &[".css", ".scss", ".sass", ".less"];

/// Lowers a component module into a script expression.
///
/// - JSX becomes `__islands.h(...)` calls and TypeScript syntax is removed
/// - framework imports (see [`FRAMEWORK_MODULES`]) bind to the runtime
/// - stylesheet imports are dropped
/// - any other import or re-export is a compilation error, since
///   components are compiled one file at a time
/// - the default export, or else the first capitalized named export, is
///   the component
///
/// Imports and exports are found on the parsed module, so text inside
/// strings, template literals and comments is never rewritten.
#[derive(Debug, Clone)]
pub struct ModuleCompiler {
	externals: Vec<String>,
}

impl Default for ModuleCompiler {
	fn default() -> Self {
		Self {
			externals: FRAMEWORK_MODULES.iter().map(|m| m.to_string()).collect(),
		}
	}
}

impl ModuleCompiler {
	/// Creates a compiler treating [`FRAMEWORK_MODULES`] as external.
	pub fn new() -> Self {
		Self::default()
	}

	/// Treats another module as provided by the runtime.
	pub fn with_external(mut self, module: impl Into<String>) -> Self {
		self.externals.push(module.into());
		self
	}

	fn is_external(&self, module: &str) -> bool {
		self.externals.iter().any(|m| m == module)
	}

	/// Replaces the module's import and export statements, returning the
	/// script body and the binding holding the component.
	fn lower_module(&self, source: &str, program: &Program<'_>) -> Result<(String, String), String> {
		let mut edits: Vec<(Span, String)> = Vec::new();
		let mut exports = Exports::default();

		for statement in &program.body {
			match statement {
				Statement::ImportDeclaration(import) => {
					edits.push((import.span, self.lower_import(import)?));
				}
				Statement::ExportDefaultDeclaration(export) => {
					let declaration = &export.declaration;
					let keyword = Span::new(export.span.start, declaration.span().start);
					let name = match declaration {
						ExportDefaultDeclarationKind::FunctionDeclaration(function) => {
							function.id.as_ref().map(|id| id.name.to_string())
						}
						ExportDefaultDeclarationKind::ClassDeclaration(class) => {
							class.id.as_ref().map(|id| id.name.to_string())
						}
						ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => {
							edits.push((export.span, String::new()));
							continue;
						}
						_ => None,
					};
					match name {
						Some(name) => {
							exports.default = Some(name);
							edits.push((keyword, String::new()));
						}
						None => {
							exports.default = Some(DEFAULT_BINDING.to_string());
							edits.push((keyword, format!("var {DEFAULT_BINDING} = ")));
						}
					}
				}
				Statement::ExportNamedDeclaration(export) => {
					if let Some(from) = &export.source {
						return Err(format!(
							"unsupported re-export from '{}': components are compiled one file at a time",
							from.value
						));
					}
					let values = !export.export_kind.is_type();
					match &export.declaration {
						Some(declaration) => {
							if values {
								for name in declared_names(declaration) {
									exports.named.push((name.clone(), name));
								}
							}
							edits.push((Span::new(export.span.start, declaration.span().start), String::new()));
						}
						None => {
							for specifier in export.specifiers.iter() {
								if !values || specifier.export_kind.is_type() {
									continue;
								}
								let local = specifier.local.name().to_string();
								let exported = specifier.exported.name().to_string();
								if exported == "default" {
									exports.default = Some(local);
								} else {
									exports.named.push((exported, local));
								}
							}
							edits.push((export.span, String::new()));
						}
					}
				}
				Statement::ExportAllDeclaration(export) => {
					return Err(format!(
						"unsupported re-export from '{}': components are compiled one file at a time",
						export.source.value
					));
				}
				_ => {}
			}
		}

		let target = exports
			.component()
			.ok_or_else(|| "module has no default export".to_string())?
			.to_string();
		Ok((apply_edits(source, edits), target))
	}

	fn lower_import(&self, import: &ImportDeclaration<'_>) -> Result<String, String> {
		if import.import_kind.is_type() {
			return Ok(String::new());
		}
		let module = import.source.value.as_str();
		let specifiers: Vec<&ImportDeclarationSpecifier<'_>> =
			import.specifiers.iter().flat_map(|s| s.iter()).collect();

		if !self.is_external(module) {
			if specifiers.is_empty() && is_stylesheet(module) {
				tracing::debug!(module, "dropping stylesheet import");
				return Ok(String::new());
			}
			return Err(format!(
				"unsupported import of '{module}': only framework modules can be imported"
			));
		}

		let target = format!("{RUNTIME_REQUIRE}({})", js_string(module));
		let mut out = String::new();
		for specifier in specifiers {
			let binding = match specifier {
				ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
					format!("var {} = {target}.default;", s.local.name)
				}
				ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
					format!("var {} = {target};", s.local.name)
				}
				ImportDeclarationSpecifier::ImportSpecifier(s) => {
					if s.import_kind.is_type() {
						continue;
					}
					format!("var {} = {target}[{}];", s.local.name, js_string(&s.imported.name()))
				}
			};
			out.push_str(&binding);
			out.push('\n');
		}
		Ok(out)
	}
}

impl ComponentCompiler for ModuleCompiler {
	fn compile(&self, source: &str, path: &Path) -> IslandResult<String> {
		let component = label_for(path);
		let failed = |message: String| IslandError::Compilation {
			component: component.clone(),
			message,
		};
		let source_type = source_type_for(path);

		let allocator = Allocator::default();
		let parsed = Parser::new(&allocator, source, source_type).parse();
		if let Some(error) = parsed.errors.first() {
			return Err(failed(error.to_string()));
		}
		let (body, target) = self.lower_module(source, &parsed.program).map_err(failed)?;

		let script = format!("(function () {{\n{body}\nreturn {target};\n}})()");
		lower_syntax(&script, source_type, path).map_err(failed)
	}
}

/// Runs the JSX and TypeScript transforms and prints the result.
fn lower_syntax(script: &str, source_type: SourceType, path: &Path) -> Result<String, String> {
	let allocator = Allocator::default();
	let parsed = Parser::new(&allocator, script, source_type).parse();
	if let Some(error) = parsed.errors.first() {
		return Err(error.to_string());
	}
	let mut program = parsed.program;

	let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();
	let options = TransformOptions {
		jsx: JsxOptions {
			runtime: JsxRuntime::Classic,
			pragma: Some(JSX_PRAGMA.to_string()),
			pragma_frag: Some(FRAGMENT_PRAGMA.to_string()),
			..JsxOptions::default()
		},
		..TransformOptions::default()
	};
	let transformed =
		Transformer::new(&allocator, path, &options).build_with_scoping(scoping, &mut program);
	if let Some(error) = transformed.errors.first() {
		return Err(error.to_string());
	}

	let code = Codegen::new().build(&program).code;
	Ok(code.trim_end().trim_end_matches(';').to_string())
}

fn declared_names(declaration: &Declaration<'_>) -> Vec<String> {
	match declaration {
		Declaration::FunctionDeclaration(function) => {
			function.id.iter().map(|id| id.name.to_string()).collect()
		}
		Declaration::ClassDeclaration(class) => class.id.iter().map(|id| id.name.to_string()).collect(),
		Declaration::VariableDeclaration(variables) => variables
			.declarations
			.iter()
			.filter_map(|declarator| declarator.id.get_identifier_name())
			.map(|name| name.to_string())
			.collect(),
		_ => Vec::new(),
	}
}

fn apply_edits(source: &str, mut edits: Vec<(Span, String)>) -> String {
	edits.sort_by_key(|(span, _)| span.start);
	let mut out = String::with_capacity(source.len());
	let mut cursor = 0;
	for (span, replacement) in edits {
		let (start, end) = (span.start as usize, span.end as usize);
		if start < cursor || end > source.len() {
			continue;
		}
		out.push_str(&source[cursor..start]);
		out.push_str(&replacement);
		cursor = end;
	}
	out.push_str(&source[cursor..]);
	out
}

fn is_stylesheet(module: &str) -> bool {
	STYLESHEET_EXTENSIONS.iter().any(|ext| module.ends_with(ext))
}

fn js_string(value: &str) -> String {
	serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
}

#[derive(Debug, Default)]
struct Exports {
	default: Option<String>,
	named: Vec<(String, String)>,
}

impl Exports {
	/// Local name of the component binding.
	fn component(&self) -> Option<&str> {
		self.default.as_deref().or_else(|| {
			self.named
				.iter()
				.find(|(exported, _)| exported.starts_with(|c: char| c.is_ascii_uppercase()))
				.map(|(_, local)| local.as_str())
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn compile(source: &str) -> IslandResult<String> {
		ModuleCompiler::new().compile(source, Path::new("/app/components/Badge.jsx"))
	}

	#[rstest]
	fn test_default_function_export() {
		// Arrange
		let source = "import { h } from 'preact';\nexport default function Badge({ name }) {\n  return <b>{name}</b>;\n}\n";

		// Act
		let code = compile(source).unwrap();

		// Assert
		assert!(code.starts_with("(function"), "{code}");
		assert!(code.contains("var h = __islands.require("), "{code}");
		assert!(code.contains("function Badge({ name })"), "{code}");
		assert!(code.contains("__islands.h("), "{code}");
		assert!(code.contains("return Badge;"), "{code}");
		assert!(!code.contains("<b>"), "{code}");
		assert!(!code.contains("export "), "{code}");
		assert!(!code.contains("import "), "{code}");
	}

	#[rstest]
	fn test_module_syntax_inside_strings_is_left_alone() {
		// Arrange
		let source = "const doc = `export default function Doc() {}\nimport x from './x';`;\nexport default function Badge() {\n  return <pre>{doc}</pre>;\n}\n";

		// Act
		let code = compile(source).unwrap();

		// Assert
		assert!(code.contains("import x from './x';"), "{code}");
		assert!(code.contains("export default function Doc() {}"), "{code}");
		assert!(code.contains("return Badge;"), "{code}");
	}

	#[rstest]
	#[case("export default ({ n }) => <i>{n}</i>;", "return __default;")]
	#[case("export default function ({ n }) { return n; }", "return __default;")]
	#[case("const Card = () => null;\nexport { Card as default };", "return Card;")]
	#[case("export const Widget = () => null;", "return Widget;")]
	#[case("export class Panel {}", "return Panel;")]
	#[case("const helper = 1;\nexport { helper, Shown as Panel };\nfunction Shown() {}", "return Shown;")]
	fn test_export_forms(#[case] source: &str, #[case] expected_return: &str) {
		let code = compile(source).unwrap();
		assert!(code.contains(expected_return), "{code}");
	}

	#[rstest]
	#[case("import React from 'react';", "var React = __islands.require(\"react\").default;")]
	#[case("import * as React from 'react';", "var React = __islands.require(\"react\");")]
	#[case(
		"import React, { useState as useLocal } from 'react';",
		"var useLocal = __islands.require(\"react\")[\"useState\"];"
	)]
	#[case(
		"import {\n  useMemo,\n  useRef\n} from 'preact/hooks';",
		"var useRef = __islands.require(\"preact/hooks\")[\"useRef\"];"
	)]
	fn test_framework_imports_bind_to_runtime(#[case] import: &str, #[case] expected: &str) {
		let code = compile(&format!("{import}\nexport default function X() {{ return null; }}")).unwrap();
		assert!(code.contains(expected), "{code}");
	}

	#[rstest]
	fn test_stylesheet_import_is_dropped() {
		let code = compile("import './badge.css';\nexport default function X() {}").unwrap();
		assert!(!code.contains("badge.css"));
	}

	#[rstest]
	#[case("import Other from './Other';\nexport default function X() {}", "./Other")]
	#[case("export { Card } from './Card';\nexport default function X() {}", "./Card")]
	#[case("export * from './all';\nexport default function X() {}", "./all")]
	fn test_other_modules_are_a_compilation_error(#[case] source: &str, #[case] module: &str) {
		let err = compile(source).unwrap_err();
		assert!(matches!(err, IslandError::Compilation { ref component, .. } if component == "Badge"));
		assert!(err.to_string().contains(module), "{err}");
	}

	#[rstest]
	fn test_missing_export_is_a_compilation_error() {
		let err = compile("function helper() {}").unwrap_err();
		assert!(err.to_string().contains("no default export"));
	}

	#[rstest]
	fn test_syntax_error_is_a_compilation_error() {
		let err = compile("export default () => <div>;").unwrap_err();
		assert!(matches!(err, IslandError::Compilation { .. }));
	}

	#[rstest]
	fn test_typescript_component() {
		// Arrange
		let source = "import type { ComponentChildren } from 'preact';\ntype Props = { name: string; children?: ComponentChildren };\nexport default function Badge({ name }: Props): unknown {\n  const label: string = name.toUpperCase();\n  return <b>{label}</b>;\n}\n";

		// Act
		let code = ModuleCompiler::new()
			.compile(source, Path::new("/app/components/Badge.tsx"))
			.unwrap();

		// Assert
		assert!(code.contains("function Badge({ name })"), "{code}");
		assert!(!code.contains("Props"), "{code}");
		assert!(!code.contains("ComponentChildren"), "{code}");
		assert!(code.contains("__islands.h("), "{code}");
	}

	#[rstest]
	fn test_extra_external() {
		let compiler = ModuleCompiler::new().with_external("@acme/ui");
		let code = compiler
			.compile(
				"import { Button } from '@acme/ui';\nexport default function X() {}",
				Path::new("X.jsx"),
			)
			.unwrap();
		assert!(code.contains("var Button = __islands.require(\"@acme/ui\")[\"Button\"];"), "{code}");
	}
}
