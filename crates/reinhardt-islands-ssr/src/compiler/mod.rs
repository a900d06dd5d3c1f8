//! Component compilation.
//!
//! A [`ComponentCompiler`] turns component source into a script expression
//! that evaluates to the component function. The bundle cache calls it on
//! every miss.

mod module;

pub use module::{FRAGMENT_PRAGMA, FRAMEWORK_MODULES, JSX_PRAGMA, ModuleCompiler};

use oxc_span::SourceType;
use reinhardt_islands_types::IslandResult;
use std::path::Path;

/// Compiles component source.
pub trait ComponentCompiler: Send + Sync {
	/// Compiles `source`, read from `path`, into a self-contained script
	/// expression evaluating to the component function.
	///
	/// Failures are [`IslandError::Compilation`](reinhardt_islands_types::IslandError::Compilation).
	fn compile(&self, source: &str, path: &Path) -> IslandResult<String>;
}

/// Source type of a component file: an ES module, with JSX enabled for
/// every JavaScript extension and TypeScript for `.ts`/`.tsx`.
pub(crate) fn source_type_for(path: &Path) -> SourceType {
	match SourceType::from_path(path) {
		Ok(source_type) if source_type.is_typescript() => source_type.with_module(true),
		Ok(source_type) => source_type.with_module(true).with_jsx(true),
		Err(_) => SourceType::jsx(),
	}
}
