//! Compiled component bundles.
//!
//! A bundle is identified by `(path, modification time, environment)`.
//! Editing a component changes its modification time and therefore its
//! key, so normal edit/reload cycles never need explicit invalidation; the
//! stale entry simply ages out of the LRU.

mod artifact;
mod cache;
mod key;

pub use artifact::CompiledArtifact;
pub use cache::{BundleCache, BundleStatistics};
pub use key::BundleKey;
pub(crate) use key::label_for;
