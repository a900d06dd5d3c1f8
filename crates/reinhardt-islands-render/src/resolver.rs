//! Component reference resolution.
//!
//! `Admin.UserBadge` resolves to `<root>/Admin/UserBadge.jsx` (or `.tsx`,
//! `.js`, `.mjs`, `.ts`), falling back to `<root>/Admin/UserBadge/index.<ext>`.

use parking_lot::Mutex;
use reinhardt_islands_types::{ComponentReference, IslandError, IslandResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Extensions tried in order.
pub const COMPONENT_EXTENSIONS: &[&str] = &["jsx", "tsx", "js", "mjs", "ts"];

/// Maps component references to source files.
pub trait ComponentResolver: Send + Sync {
	/// Resolves `reference` to an existing source file.
	fn resolve(&self, reference: &ComponentReference) -> IslandResult<PathBuf>;
}

#[derive(Debug, Clone)]
struct Resolved {
	path: PathBuf,
	dir_modified: Option<SystemTime>,
}

/// Resolves references against a components directory.
///
/// Results are cached per reference and reused while the containing
/// directory's modification time is unchanged, so adding or removing a
/// component file is picked up on the next lookup.
#[derive(Debug)]
pub struct DirectoryResolver {
	root: PathBuf,
	cache: Mutex<HashMap<String, Resolved>>,
}

impl DirectoryResolver {
	/// Creates a resolver rooted at `root`.
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			cache: Mutex::new(HashMap::new()),
		}
	}

	/// The components directory.
	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Forgets cached resolutions.
	pub fn clear(&self) {
		self.cache.lock().clear();
	}

	fn candidates(&self, reference: &ComponentReference) -> Vec<PathBuf> {
		let mut base = self.root.clone();
		for segment in reference.segments() {
			base.push(segment);
		}
		let mut candidates: Vec<PathBuf> = COMPONENT_EXTENSIONS
			.iter()
			.map(|ext| base.with_extension(ext))
			.collect();
		candidates.extend(
			COMPONENT_EXTENSIONS
				.iter()
				.map(|ext| base.join(format!("index.{ext}"))),
		);
		candidates
	}
}

fn dir_modified(path: &Path) -> Option<SystemTime> {
	path.parent()
		.and_then(|dir| std::fs::metadata(dir).ok())
		.and_then(|meta| meta.modified().ok())
}

impl ComponentResolver for DirectoryResolver {
	fn resolve(&self, reference: &ComponentReference) -> IslandResult<PathBuf> {
		if !reference.segments().all(|s| !s.is_empty() && s != "." && s != "..") {
			return Err(IslandError::ComponentResolution(reference.to_string()));
		}

		if let Some(cached) = self.cache.lock().get(reference.name()).cloned() {
			if cached.dir_modified.is_some()
				&& dir_modified(&cached.path) == cached.dir_modified
				&& cached.path.is_file()
			{
				return Ok(cached.path);
			}
		}

		let path = self
			.candidates(reference)
			.into_iter()
			.find(|candidate| candidate.is_file())
			.ok_or_else(|| {
				IslandError::ComponentResolution(format!(
					"{} (searched {})",
					reference,
					self.root.display()
				))
			})?;
		tracing::debug!(component = %reference, path = %path.display(), "resolved component");

		self.cache.lock().insert(
			reference.name().to_string(),
			Resolved {
				path: path.clone(),
				dir_modified: dir_modified(&path),
			},
		);
		Ok(path)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use tempfile::TempDir;

	#[fixture]
	fn components() -> TempDir {
		let dir = tempfile::tempdir().unwrap();
		std::fs::create_dir_all(dir.path().join("Admin/Chart")).unwrap();
		std::fs::write(dir.path().join("UserBadge.jsx"), "").unwrap();
		std::fs::write(dir.path().join("Plain.js"), "").unwrap();
		std::fs::write(dir.path().join("Admin/Table.mjs"), "").unwrap();
		std::fs::write(dir.path().join("Admin/Chart/index.jsx"), "").unwrap();
		std::fs::write(dir.path().join("Typed.tsx"), "").unwrap();
		dir
	}

	#[rstest]
	#[case("UserBadge", "UserBadge.jsx")]
	#[case("Plain", "Plain.js")]
	#[case("Admin.Table", "Admin/Table.mjs")]
	#[case("Admin.Chart", "Admin/Chart/index.jsx")]
	#[case("Typed", "Typed.tsx")]
	fn test_resolves_dotted_names(components: TempDir, #[case] name: &str, #[case] expected: &str) {
		// Arrange
		let resolver = DirectoryResolver::new(components.path());

		// Act
		let path = resolver.resolve(&ComponentReference::new(name)).unwrap();

		// Assert
		assert_eq!(path, components.path().join(expected));
	}

	#[rstest]
	fn test_missing_component_is_resolution_error(components: TempDir) {
		let resolver = DirectoryResolver::new(components.path());

		let err = resolver.resolve(&ComponentReference::new("Nowhere")).unwrap_err();

		assert!(matches!(err, IslandError::ComponentResolution(_)));
	}

	#[rstest]
	fn test_parent_segments_are_rejected(components: TempDir) {
		let resolver = DirectoryResolver::new(components.path().join("Admin"));

		let err = resolver.resolve(&ComponentReference::new("..")).unwrap_err();

		assert!(matches!(err, IslandError::ComponentResolution(_)));
	}

	#[rstest]
	fn test_removed_file_is_not_served_from_cache(components: TempDir) {
		// Arrange
		let resolver = DirectoryResolver::new(components.path());
		let reference = ComponentReference::new("Plain");
		resolver.resolve(&reference).unwrap();

		// Act
		std::fs::remove_file(components.path().join("Plain.js")).unwrap();
		std::fs::write(components.path().join("Plain.mjs"), "").unwrap();
		let dir = std::fs::File::open(components.path()).unwrap();
		let bumped = SystemTime::now() + std::time::Duration::from_secs(5);
		// Directory mtimes can be coarse; force a visible change.
		let _ = dir.set_modified(bumped);
		let path = resolver.resolve(&reference).unwrap();

		// Assert
		assert_eq!(path, components.path().join("Plain.mjs"));
	}
}
