use super::key::BundleKey;
use std::path::{Path, PathBuf};

/// A compiled component.
///
/// The artifact owns its on-disk copy: the file is removed when the last
/// reference is dropped. The bundle cache hands out `Arc`s, so an evicted
/// artifact stays on disk until every in-flight render using it finishes.
#[derive(Debug)]
pub struct CompiledArtifact {
	key: BundleKey,
	id: String,
	code: String,
	file: PathBuf,
}

impl CompiledArtifact {
	/// Writes `code` to `dir` and wraps it. The file name carries the
	/// process id and `generation`, so neither concurrent compiles of one
	/// key nor other services sharing `dir` reuse a file.
	pub(crate) fn write(
		key: BundleKey,
		code: String,
		dir: &Path,
		generation: u64,
	) -> std::io::Result<Self> {
		let id = format!(
			"{}-{}-{}",
			&key.fingerprint()[..16],
			std::process::id(),
			generation
		);
		std::fs::create_dir_all(dir)?;
		let file = dir.join(format!("{id}.js"));
		std::fs::write(&file, &code)?;
		Ok(Self {
			key,
			id,
			code,
			file,
		})
	}

	/// The bundle key this artifact was compiled for.
	pub fn key(&self) -> &BundleKey {
		&self.key
	}

	/// Unique id of this compilation.
	pub fn id(&self) -> &str {
		&self.id
	}

	/// Script expression evaluating to the component function.
	pub fn code(&self) -> &str {
		&self.code
	}

	/// On-disk copy of [`code`](Self::code).
	pub fn file(&self) -> &Path {
		&self.file
	}
}

impl Drop for CompiledArtifact {
	fn drop(&mut self) {
		match std::fs::remove_file(&self.file) {
			Ok(()) => tracing::debug!(artifact = %self.file.display(), "removed compiled artifact"),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
			Err(e) => {
				tracing::warn!(artifact = %self.file.display(), error = %e, "failed to remove compiled artifact")
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use reinhardt_islands_conf::SsrEnvironment;
	use rstest::rstest;

	#[rstest]
	fn test_file_name_is_unique_per_process_and_generation() {
		// Arrange
		let dir = tempfile::tempdir().unwrap();
		let key = BundleKey::new(dir.path().join("Card.jsx"), 1, SsrEnvironment::Production);

		// Act
		let first = CompiledArtifact::write(key.clone(), "1".into(), dir.path(), 0).unwrap();
		let second = CompiledArtifact::write(key.clone(), "2".into(), dir.path(), 1).unwrap();

		// Assert
		let pid = std::process::id().to_string();
		assert_eq!(first.id().split('-').nth(1), Some(pid.as_str()));
		assert_ne!(first.file(), second.file());
		assert_eq!(std::fs::read_to_string(first.file()).unwrap(), "1");
		assert!(first.file().starts_with(dir.path()));
		assert!(first.id().starts_with(&key.fingerprint()[..16]));
	}
}
