//! Shared types for Reinhardt islands rendering.
//!
//! This crate holds the data model that flows between the tag scanner, the
//! render orchestrator, and the out-of-process SSR execution service:
//!
//! - [`ComponentReference`] and [`RenderRequest`]: what the scanner found
//! - [`RenderOutcome`]: the tagged result of every render path
//! - [`wire`]: JSON request/response shapes exchanged with the SSR service
//! - [`IslandError`]: the per-island failure taxonomy
//! - [`canonical`]: deterministic JSON used for cache keys and hydration payloads

pub mod canonical;
pub mod error;
pub mod outcome;
pub mod reference;
pub mod request;
pub mod wire;

pub use canonical::{canonical_json, canonical_props};
pub use error::{ErrorKind, IslandError, IslandResult};
pub use outcome::RenderOutcome;
pub use reference::{ComponentReference, is_component_name};
pub use request::{Props, RenderRequest};
