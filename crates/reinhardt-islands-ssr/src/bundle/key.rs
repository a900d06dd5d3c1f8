use reinhardt_islands_conf::SsrEnvironment;
use reinhardt_islands_types::{IslandError, IslandResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Identity of a compiled bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BundleKey {
	/// Resolved source file.
	pub path: PathBuf,
	/// Source modification time, milliseconds since the Unix epoch.
	pub mtime_millis: u64,
	/// Environment the bundle is compiled for.
	pub environment: SsrEnvironment,
}

impl BundleKey {
	/// Creates a key from its parts.
	pub fn new(path: impl Into<PathBuf>, mtime_millis: u64, environment: SsrEnvironment) -> Self {
		Self {
			path: path.into(),
			mtime_millis,
			environment,
		}
	}

	/// Builds the key for the current state of the file at `path`.
	///
	/// A missing file is a component resolution failure.
	pub fn for_path(path: &Path, environment: SsrEnvironment) -> IslandResult<Self> {
		let metadata = std::fs::metadata(path).map_err(|e| {
			IslandError::ComponentResolution(format!("{} ({e})", path.display()))
		})?;
		if !metadata.is_file() {
			return Err(IslandError::ComponentResolution(format!(
				"{} is not a file",
				path.display()
			)));
		}
		let mtime_millis = metadata
			.modified()
			.ok()
			.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
			.map(|d| d.as_millis() as u64)
			.unwrap_or(0);
		Ok(Self::new(path, mtime_millis, environment))
	}

	/// Stable hex digest of the key, used for artifact names and client
	/// bundle references.
	pub fn fingerprint(&self) -> String {
		let mut hasher = Sha256::new();
		hasher.update(self.path.to_string_lossy().as_bytes());
		hasher.update([0]);
		hasher.update(self.mtime_millis.to_be_bytes());
		hasher.update([0]);
		hasher.update(self.environment.as_str().as_bytes());
		hex::encode(hasher.finalize())
	}

	/// Component label for error messages: the file stem.
	pub fn component_label(&self) -> String {
		label_for(&self.path)
	}
}

pub(crate) fn label_for(path: &Path) -> String {
	path.file_stem()
		.map(|s| s.to_string_lossy().into_owned())
		.unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_fingerprint_changes_with_each_part() {
		let base = BundleKey::new("/app/A.jsx", 1, SsrEnvironment::Production);
		let variants = [
			BundleKey::new("/app/B.jsx", 1, SsrEnvironment::Production),
			BundleKey::new("/app/A.jsx", 2, SsrEnvironment::Production),
			BundleKey::new("/app/A.jsx", 1, SsrEnvironment::Development),
		];
		for other in variants {
			assert_ne!(base.fingerprint(), other.fingerprint());
		}
		assert_eq!(base.fingerprint().len(), 64);
	}

	#[rstest]
	fn test_missing_file_is_resolution_error() {
		let err = BundleKey::for_path(Path::new("/definitely/missing/X.jsx"), SsrEnvironment::Production)
			.unwrap_err();
		assert!(matches!(err, IslandError::ComponentResolution(_)));
	}

	#[rstest]
	fn test_for_path_reads_mtime() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("Badge.jsx");
		std::fs::write(&path, "export default function Badge() {}").unwrap();

		let key = BundleKey::for_path(&path, SsrEnvironment::Development).unwrap();

		assert!(key.mtime_millis > 0);
		assert_eq!(key.component_label(), "Badge");
	}
}
