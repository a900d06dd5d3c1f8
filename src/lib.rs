//! # Reinhardt Islands
//!
//! Server-side rendering of component islands embedded in server-rendered
//! HTML.
//!
//! A page's markup may contain capitalized component tags such as
//! `<UserBadge fullName="Ada Lovelace" />`. The [`render::Orchestrator`]
//! finds them, sends them to an SSR execution service, and splices the
//! rendered HTML back into the page with hydration markers and a props
//! payload. Failures degrade per island; the page always renders.
//!
//! ## Crates
//!
//! - [`types`] - Render requests, outcomes, errors and the SSR wire format
//! - [`conf`] - Settings for both sides, loaded from the environment
//! - [`scanner`] - Component discovery in HTML
//! - [`cache`] - Render result cache keyed by component and props
//! - [`render`] - Strategy selection, SSR client, fallback and rewriting
//! - [`ssr`] - The SSR execution service: bundle cache, engine and HTTP server
//!
//! ## Feature Flags
//!
//! - `js-runtime` (default) - Embedded JavaScript engine for [`ssr`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use reinhardt_islands::prelude::*;
//!
//! # async fn example() -> IslandResult<()> {
//! let settings = IslandsSettings::from_env().unwrap_or_default();
//! let orchestrator = Orchestrator::from_settings(settings)?;
//!
//! let page = orchestrator
//! 	.render_islands(r#"<main><UserBadge fullName="Ada Lovelace" /></main>"#)
//! 	.await;
//! println!("{} ({} islands)", page.html, page.report.islands);
//! # Ok(())
//! # }
//! ```

pub use reinhardt_islands_cache as cache;
pub use reinhardt_islands_conf as conf;
pub use reinhardt_islands_render as render;
pub use reinhardt_islands_scanner as scanner;
pub use reinhardt_islands_ssr as ssr;
pub use reinhardt_islands_types as types;

pub use reinhardt_islands_conf::{ErrorDisplay, IslandsSettings, SsrEnvironment, SsrServerSettings};
pub use reinhardt_islands_render::{Orchestrator, PageRender, RenderReport, RenderStrategy};
pub use reinhardt_islands_scanner::scan_components;
pub use reinhardt_islands_types::{
	ComponentReference, ErrorKind, IslandError, IslandResult, Props, RenderOutcome, RenderRequest,
};

/// Commonly used types for rendering pages with islands.
pub mod prelude {
	pub use crate::cache::ResultCache;
	pub use crate::conf::{ErrorDisplay, IslandsSettings};
	pub use crate::render::{
		ComponentResolver, DirectoryResolver, HttpSsrClient, Orchestrator, PageRender, RenderReport,
		RenderStrategy, SsrClient,
	};
	pub use crate::types::{ErrorKind, IslandError, IslandResult, Props};
}
