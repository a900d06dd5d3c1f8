//! Prop discovery from component source.
//!
//! Finds the component a module exports by default and reads the keys of
//! its destructured first parameter. When the parameter is a plain name
//! (`props`), member accesses and destructurings of it inside the
//! component body are collected instead.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
	ArrowFunctionExpression, BindingPattern, BindingPatternKind, Declaration, Expression,
	ExportDefaultDeclarationKind, FormalParameters, Function, ObjectPattern, Program, Statement,
	StaticMemberExpression, VariableDeclaration, VariableDeclarator,
};
use oxc_ast_visit::{Visit, walk};
use oxc_parser::Parser;
use oxc_span::SourceType;

/// Returns the prop names the default-exported component reads, in source
/// order. Rest elements (`...rest`) are skipped. Unknown shapes and
/// unparseable sources yield an empty list.
pub fn infer_prop_keys(source: &str) -> Vec<String> {
	let allocator = Allocator::default();
	let parsed = Parser::new(&allocator, source, SourceType::tsx()).parse();
	if parsed.panicked {
		return Vec::new();
	}
	match find_component(&parsed.program) {
		Some(component) => prop_keys(component),
		None => Vec::new(),
	}
}

#[derive(Clone, Copy)]
enum Component<'p, 'a> {
	Function(&'p Function<'a>),
	Arrow(&'p ArrowFunctionExpression<'a>),
}

impl<'p, 'a> Component<'p, 'a> {
	fn params(self) -> &'p FormalParameters<'a> {
		match self {
			Self::Function(function) => &function.params,
			Self::Arrow(arrow) => &arrow.params,
		}
	}

	fn visit_body<V: Visit<'a>>(self, visitor: &mut V) {
		match self {
			Self::Function(function) => {
				if let Some(body) = &function.body {
					visitor.visit_function_body(body);
				}
			}
			Self::Arrow(arrow) => visitor.visit_function_body(&arrow.body),
		}
	}
}

/// A top-level function or function-valued variable.
struct Binding<'p, 'a> {
	name: String,
	exported: bool,
	component: Component<'p, 'a>,
}

fn find_component<'p, 'a>(program: &'p Program<'a>) -> Option<Component<'p, 'a>> {
	let bindings = top_level_bindings(program);
	let lookup = |name: &str| {
		bindings
			.iter()
			.find(|binding| binding.name == name)
			.map(|binding| binding.component)
	};

	let mut default_name: Option<String> = None;
	let mut exported_names: Vec<(String, String)> = Vec::new();
	for statement in &program.body {
		match statement {
			Statement::ExportDefaultDeclaration(export) => match &export.declaration {
				ExportDefaultDeclarationKind::FunctionDeclaration(function) => {
					return Some(Component::Function(function));
				}
				kind => {
					let Some(expression) = kind.as_expression() else {
						continue;
					};
					if let Expression::Identifier(ident) = expression.without_parentheses() {
						default_name = Some(ident.name.to_string());
					} else if let Some(component) = function_like(expression) {
						return Some(component);
					}
				}
			},
			Statement::ExportNamedDeclaration(export) if export.source.is_none() => {
				for specifier in export.specifiers.iter() {
					let local = specifier.local.name().to_string();
					let exported = specifier.exported.name().to_string();
					if exported == "default" {
						default_name = Some(local);
					} else {
						exported_names.push((exported, local));
					}
				}
			}
			_ => {}
		}
	}

	if let Some(name) = default_name {
		return lookup(&name);
	}
	if let Some(binding) = bindings
		.iter()
		.find(|binding| binding.exported && is_capitalized(&binding.name))
	{
		return Some(binding.component);
	}
	exported_names
		.iter()
		.filter(|(exported, _)| is_capitalized(exported))
		.find_map(|(_, local)| lookup(local))
}

fn top_level_bindings<'p, 'a>(program: &'p Program<'a>) -> Vec<Binding<'p, 'a>> {
	let mut bindings = Vec::new();
	for statement in &program.body {
		match statement {
			Statement::FunctionDeclaration(function) => push_function(&mut bindings, function, false),
			Statement::VariableDeclaration(variables) => push_variables(&mut bindings, variables, false),
			Statement::ExportNamedDeclaration(export) => match &export.declaration {
				Some(Declaration::FunctionDeclaration(function)) => {
					push_function(&mut bindings, function, true)
				}
				Some(Declaration::VariableDeclaration(variables)) => {
					push_variables(&mut bindings, variables, true)
				}
				_ => {}
			},
			_ => {}
		}
	}
	bindings
}

fn push_function<'p, 'a>(bindings: &mut Vec<Binding<'p, 'a>>, function: &'p Function<'a>, exported: bool) {
	if let Some(id) = &function.id {
		bindings.push(Binding {
			name: id.name.to_string(),
			exported,
			component: Component::Function(function),
		});
	}
}

fn push_variables<'p, 'a>(
	bindings: &mut Vec<Binding<'p, 'a>>,
	variables: &'p VariableDeclaration<'a>,
	exported: bool,
) {
	for declarator in variables.declarations.iter() {
		let (Some(name), Some(init)) = (declarator.id.get_identifier_name(), &declarator.init) else {
			continue;
		};
		if let Some(component) = function_like(init) {
			bindings.push(Binding {
				name: name.to_string(),
				exported,
				component,
			});
		}
	}
}

/// A function expression, possibly wrapped in a call such as `memo(...)`.
fn function_like<'p, 'a>(expression: &'p Expression<'a>) -> Option<Component<'p, 'a>> {
	match expression.without_parentheses() {
		Expression::ArrowFunctionExpression(arrow) => Some(Component::Arrow(arrow)),
		Expression::FunctionExpression(function) => Some(Component::Function(function)),
		Expression::CallExpression(call) => call
			.arguments
			.first()
			.and_then(|argument| argument.as_expression())
			.and_then(function_like),
		_ => None,
	}
}

fn prop_keys(component: Component<'_, '_>) -> Vec<String> {
	let Some(first) = component.params().items.first() else {
		return Vec::new();
	};
	let mut keys = Vec::new();
	match &unwrap_default(&first.pattern).kind {
		BindingPatternKind::ObjectPattern(object) => object_keys(object, &mut keys),
		BindingPatternKind::BindingIdentifier(ident) => {
			let mut accesses = PropAccesses {
				object: ident.name.to_string(),
				keys: &mut keys,
			};
			component.visit_body(&mut accesses);
		}
		_ => {}
	}
	keys
}

/// `props = {}` reads like `props`.
fn unwrap_default<'p, 'a>(pattern: &'p BindingPattern<'a>) -> &'p BindingPattern<'a> {
	match &pattern.kind {
		BindingPatternKind::AssignmentPattern(assignment) => unwrap_default(&assignment.left),
		_ => pattern,
	}
}

fn object_keys(object: &ObjectPattern<'_>, keys: &mut Vec<String>) {
	for property in object.properties.iter() {
		if let Some(key) = property.key.static_name() {
			push_unique(keys, &key);
		}
	}
}

fn push_unique(keys: &mut Vec<String>, key: &str) {
	if !keys.iter().any(|k| k == key) {
		keys.push(key.to_string());
	}
}

fn is_capitalized(name: &str) -> bool {
	name.starts_with(|c: char| c.is_ascii_uppercase())
}

/// Collects `props.key` reads and `const { key } = props` destructurings.
struct PropAccesses<'k> {
	object: String,
	keys: &'k mut Vec<String>,
}

impl<'a> Visit<'a> for PropAccesses<'_> {
	fn visit_static_member_expression(&mut self, member: &StaticMemberExpression<'a>) {
		if let Expression::Identifier(ident) = &member.object {
			if ident.name.as_str() == self.object {
				push_unique(self.keys, member.property.name.as_str());
			}
		}
		walk::walk_static_member_expression(self, member);
	}

	fn visit_variable_declarator(&mut self, declarator: &VariableDeclarator<'a>) {
		if let (Some(Expression::Identifier(ident)), BindingPatternKind::ObjectPattern(object)) =
			(&declarator.init, &declarator.id.kind)
		{
			if ident.name.as_str() == self.object {
				object_keys(object, self.keys);
			}
		}
		walk::walk_variable_declarator(self, declarator);
	}
}
