//! SSR execution service for Reinhardt islands.
//!
//! The service turns component source files into HTML. It runs as its own
//! long-lived process and is reached over HTTP (see [`server`]), so any
//! number of web workers can share one warm set of compiled components.
//!
//! ```text
//! HTTP request ──► SsrServer ──► SsrService ──► BundleCache ──► ComponentCompiler
//!                                    │
//!                                    └────────► ComponentEngine (ScriptEngine)
//! ```
//!
//! - [`bundle`]: compiled artifacts keyed by path, modification time and
//!   environment, with LRU eviction
//! - [`compiler`]: lowers JSX/ES module sources to a self-contained script
//! - [`engine`]: executes compiled components to HTML
//! - [`service`]: render-one, render-batch and render-tree operations
//! - [`server`]: the hyper HTTP front end

pub mod bundle;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod infer;
pub mod server;
pub mod service;

pub use bundle::{BundleCache, BundleKey, BundleStatistics, CompiledArtifact};
pub use compiler::{ComponentCompiler, ModuleCompiler};
#[cfg(feature = "js-runtime")]
pub use engine::{ScriptEngine, UiRuntime};
pub use engine::{ComponentEngine, ElementSpec};
pub use error::{ServerError, ServerResult};
pub use infer::infer_prop_keys;
pub use server::SsrServer;
pub use service::SsrService;
